//! Gameplay tuning
//!
//! Every knob that shapes how the game plays. Persisted as JSON; missing
//! fields fall back to the shipped defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// One background layer scrolled at a fraction of the camera's motion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParallaxSpec {
    /// Fraction of camera motion the layer follows (0 = fixed to world, 1 = fixed to camera)
    pub factor: f32,
    /// Distance after which the layer's art repeats
    pub repeat: f32,
}

/// Game tuning values
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Flight ===
    /// Normal downward acceleration
    pub gravity: f32,
    /// Rate at which gravity re-approaches normal after a jump
    pub gravity_approach: f32,
    /// Gravity right after a jump (ramps back up to `gravity`)
    pub jump_gravity: f32,
    /// Upward speed set by a jump
    pub jump_velocity: f32,
    /// Most negative vertical speed (negative number)
    pub terminal_velocity: f32,
    /// Horizontal scroll rate
    pub scroll_speed: f32,

    // === Damage ===
    /// Impacts that kill the bird
    pub damage_to_die: u32,

    // === Obstacles ===
    /// Vertical opening between pipe mouths for the first sequence
    pub gap_height: f32,
    /// Smallest opening later sequences tighten down to
    pub gap_height_min: f32,
    /// Opening reduction per sequence level
    pub gap_tighten: f32,
    /// Range for the random gap centre
    pub gap_center_min: f32,
    pub gap_center_max: f32,
    /// Chance a bottom pipe can be flown into
    pub warp_chance: f32,

    // === Time dilation ===
    /// Time scale at the start of the post-recovery slow motion
    pub slowmo_factor: f32,
    /// Seconds to ease from `slowmo_factor` back to real time
    pub slowmo_grace: f32,

    // === Teleport ===
    /// Vertical speed when popping out of a pipe
    pub teleport_exit_velocity: f32,

    // === Background ===
    pub parallax: Vec<ParallaxSpec>,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            gravity: 28.0,
            gravity_approach: 6.0,
            jump_gravity: 12.0,
            jump_velocity: 9.0,
            terminal_velocity: -14.0,
            scroll_speed: 4.0,

            damage_to_die: 3,

            gap_height: 4.4,
            gap_height_min: 3.2,
            gap_tighten: 0.2,
            gap_center_min: 3.5,
            gap_center_max: 9.0,
            warp_chance: 0.2,

            slowmo_factor: 0.35,
            slowmo_grace: 0.8,

            teleport_exit_velocity: 8.0,

            parallax: vec![
                ParallaxSpec { factor: 0.9, repeat: 80.0 },
                ParallaxSpec { factor: 0.6, repeat: 40.0 },
                ParallaxSpec { factor: 0.3, repeat: 24.0 },
            ],
        }
    }
}

impl Tuning {
    /// Load tuning from a JSON file and validate it
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let tuning = Self::from_json(&json)?;
        log::info!("Loaded tuning from {}", path.as_ref().display());
        Ok(tuning)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let tuning: Self = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Gap opening for a sequence at the given difficulty level
    pub fn gap_for_level(&self, level: u32) -> f32 {
        (self.gap_height - self.gap_tighten * level as f32).max(self.gap_height_min)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("gravity", self.gravity),
            ("gravity_approach", self.gravity_approach),
            ("jump_velocity", self.jump_velocity),
            ("scroll_speed", self.scroll_speed),
            ("gap_height", self.gap_height),
            ("gap_height_min", self.gap_height_min),
            ("slowmo_grace", self.slowmo_grace),
        ];
        for (name, value) in positive {
            if !(value > 0.0) {
                return Err(ConfigError::Invalid(format!("{name} must be > 0, got {value}")));
            }
        }
        if self.terminal_velocity >= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "terminal_velocity must be negative, got {}",
                self.terminal_velocity
            )));
        }
        if self.damage_to_die == 0 {
            return Err(ConfigError::Invalid("damage_to_die must be at least 1".into()));
        }
        if self.gap_center_min > self.gap_center_max {
            return Err(ConfigError::Invalid(format!(
                "gap_center_min {} exceeds gap_center_max {}",
                self.gap_center_min, self.gap_center_max
            )));
        }
        if !(0.0..=1.0).contains(&self.warp_chance) {
            return Err(ConfigError::Invalid(format!("warp_chance {} not in [0, 1]", self.warp_chance)));
        }
        if !(self.slowmo_factor > 0.0 && self.slowmo_factor <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "slowmo_factor {} not in (0, 1]",
                self.slowmo_factor
            )));
        }
        for layer in &self.parallax {
            if !(layer.repeat > 0.0) {
                return Err(ConfigError::Invalid(format!("parallax repeat {} must be > 0", layer.repeat)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(Tuning::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let tuning = Tuning::from_json(r#"{ "gravity": 30.0 }"#).unwrap();
        assert_eq!(tuning.gravity, 30.0);
        assert_eq!(tuning.jump_velocity, Tuning::default().jump_velocity);
        assert_eq!(tuning.parallax.len(), 3);
    }

    #[test]
    fn test_rejects_positive_terminal_velocity() {
        let err = Tuning::from_json(r#"{ "terminal_velocity": 3.0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_gap_tightens_to_minimum() {
        let tuning = Tuning::default();
        assert_eq!(tuning.gap_for_level(0), tuning.gap_height);
        assert!(tuning.gap_for_level(1) < tuning.gap_height);
        assert_eq!(tuning.gap_for_level(100), tuning.gap_height_min);
    }
}
