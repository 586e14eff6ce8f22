//! Flapsim - gameplay core of a side-scrolling pipe-dodging bird game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (modes, collisions, playfield, camera)
//! - `session`: Fixed-step scheduler that drives the simulation
//! - `assets`: Read-only skeleton/pose/fall tables loaded once at startup
//! - `settings`: Data-driven gameplay tuning
//! - `audio`: Sound cue identifiers emitted by the simulation

pub mod assets;
pub mod audio;
pub mod error;
pub mod highscores;
pub mod session;
pub mod settings;
pub mod sim;

pub use assets::AssetTable;
pub use error::{AssetError, ConfigError};
pub use highscores::HighScores;
pub use session::Session;
pub use settings::Tuning;

use glam::Vec3;

/// Game configuration constants
pub mod consts {
    use glam::{Vec2, Vec3};

    /// Fixed simulation timestep (120 Hz)
    pub const SIM_DT: f32 = 1.0 / 120.0;
    /// Longest wall-clock frame the scheduler will account for
    pub const MAX_FRAME_DT: f32 = 0.1;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 12;

    /// World x past which every position is shifted back
    pub const WORLD_WRAP_X: f32 = 256.0;
    /// Amount subtracted from every position-like value on a world shift
    pub const WORLD_WRAP_AMOUNT: f32 = 256.0;

    /// Ground plane height
    pub const FLOOR_Z: f32 = 0.0;
    /// Bird collision sphere
    pub const BIRD_RADIUS: f32 = 0.45;
    /// Hover height on the title screen
    pub const TITLE_BIRD_Z: f32 = 6.0;
    pub const TITLE_BOB_SPEED: f32 = 2.5;
    pub const TITLE_BOB_HEIGHT: f32 = 0.25;

    /// Visible window relative to the aim target
    pub const VIEW_AHEAD: f32 = 32.0;
    pub const VIEW_BEHIND: f32 = 12.0;
    /// Extra distance behind the visible window before obstacles are freed
    pub const REMOVE_MARGIN: f32 = 4.0;
    /// Distance from the bird to the first obstacle slot of a new game
    pub const FIRST_SEQUENCE_OFFSET: f32 = 18.0;
    /// Slots produced by one obstacle sequence
    pub const SEQUENCE_RUN_LENGTH: u32 = 10;

    /// Collision tolerance near the cylinder axis and cap plane
    pub const COLLISION_EPSILON: f32 = 0.01;

    /// Impact freeze runs this many times faster than real time
    pub const IMPACT_TIME_SCALE: f32 = 5.0;

    /// Teleport cinematic
    pub const TELEPORT_TIME: f32 = 1.5;
    pub const TELEPORT_LEAD: f32 = 0.35;
    pub const TELEPORT_LAG: f32 = 0.35;
    pub const TELEPORT_DIP: f32 = 1.4;
    pub const TELEPORT_SPIRAL_RADIUS: f32 = 0.35;
    pub const TELEPORT_POP_LEAD: f32 = 0.08;
    pub const TELEPORT_EJECT_CLEARANCE: f32 = BIRD_RADIUS + 0.3;
    /// Mouth must be entered at least this far inside the rim
    pub const TELEPORT_RIM_MARGIN: f32 = 0.2;

    /// Recovery arc after a survivable impact
    pub const RECOVER_TIME: f32 = 0.9;
    pub const RECOVER_PUSH: f32 = 1.4;
    pub const RECOVER_FORWARD: f32 = 4.0;
    pub const RECOVER_RISE: f32 = 1.5;
    pub const RECOVER_WOBBLE_DELAY: f32 = 0.15;
    /// Slope of the eased recovery parameter at its start (slow motion) and end
    pub const RECOVER_START_SLOPE: f32 = 0.3;
    pub const RECOVER_END_SLOPE: f32 = 1.5;
    pub const FLIP_TIME: f32 = 0.8;
    pub const UNFLIP_TIME: f32 = 0.25;
    pub const BLEND_TIME: f32 = 1.0 / 3.0;

    /// Bounce response
    pub const BOUNCE_ROLL_SPEED: f32 = -5.0;
    pub const BOUNCE_RESTITUTION: f32 = 0.45;
    pub const BOUNCE_MAX_X: f32 = 3.0;
    pub const BOUNCE_CONE: f32 = 0.3;
    pub const BOUNCE_ANIMATE_DIST_SQ: f32 = 4.0;
    pub const BOUNCE_PUFF_SPEED: f32 = 8.0;
    pub const ROLL_FACTOR: f32 = 0.5;

    /// Death fall
    pub const FALL_GRAVITY: f32 = 30.0;
    pub const FALL_DRAG: f32 = 0.6;
    pub const FALL_CUE_MIN_Z: f32 = 1.5;
    pub const FALL_ANIM_FPS: f32 = 60.0;
    pub const SPIN_DAMPING: f32 = 1.5;

    /// Pitch response to vertical velocity
    pub const PITCH_PER_VEL: f32 = 0.08;
    pub const PITCH_MIN: f32 = -1.2;
    pub const PITCH_MAX: f32 = 0.5;
    pub const PITCH_KICK_VEL: f32 = -8.0;
    pub const PITCH_KICK: f32 = 0.05;
    pub const PITCH_EASE: f32 = 10.0;
    pub const PITCH_MAX_RATE: f32 = 6.0;

    /// Cosmetic phases (cycles per second)
    pub const FLAP_RATE_IDLE: f32 = 1.5;
    pub const FLAP_RATE_BURST: f32 = 6.0;
    pub const FLAP_BURST_TIME: f32 = 0.3;
    pub const EYE_RATE: f32 = 0.25;
    pub const WOBBLE_FREQ: f32 = 14.0;
    pub const WOBBLE_ANGLE: f32 = 0.35;
    pub const WOBBLE_DECAY: f32 = 1.6;
    pub const SWEAT_TIME: f32 = 1.2;
    pub const SCORE_POPUP_DECAY: f32 = 2.0;
    pub const SCORE_NOTE_COUNT: u32 = 8;

    /// Camera
    pub const FOLLOW_LOOK_FROM: Vec3 = Vec3::new(0.0, -14.0, 1.5);
    pub const FOLLOW_SHIFT: Vec3 = Vec3::new(3.0, 0.0, 0.5);
    pub const ORBIT_DISTANCE: f32 = 9.0;
    pub const ORBIT_HEIGHT: f32 = 1.0;
    pub const ORBIT_RISE_HEIGHT: f32 = 4.0;
    pub const ORBIT_SPEED: f32 = 0.35;
    pub const ORBIT_RISE_TIME: f32 = 4.0;
    pub const TRANSITION_TIME: f32 = 1.2;
    pub const TRANSITION_CUBIC_WEIGHT: f32 = 0.2;

    /// Dead-state UI
    pub const DEAD_SIGN_DELAY: f32 = 0.6;
    pub const DEAD_PROMPT_DELAY: f32 = 0.8;
    pub const BUTTON_PRESS_TIME: f32 = 0.15;
    /// Back button rectangle in normalized screen coordinates (y down)
    pub const BACK_BUTTON_MIN: Vec2 = Vec2::new(0.02, 0.02);
    pub const BACK_BUTTON_MAX: Vec2 = Vec2::new(0.14, 0.12);
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Cubic ease-in-out on [0, 1]
#[inline]
pub fn ease_in_out_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        let f = -2.0 * t + 2.0;
        1.0 - f * f * f / 2.0
    }
}

/// Cubic Hermite remap of [0, 1] with the given start and end slopes
#[inline]
pub fn hermite_remap(t: f32, start_slope: f32, end_slope: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    let b = 3.0 - 2.0 * start_slope - end_slope;
    let c = start_slope + end_slope - 2.0;
    start_slope * t + b * t * t + c * t * t * t
}

/// Critically damped approach of `value` toward `target`.
///
/// `rate` is the approach speed; `velocity` carries the spring state between calls.
#[inline]
pub fn critically_damp(value: &mut f32, velocity: &mut f32, target: f32, rate: f32, dt: f32) {
    let offset = *value - target;
    let decay = (-rate * dt).exp();
    let temp = (*velocity + rate * offset) * dt;
    *velocity = (*velocity - rate * temp) * decay;
    *value = target + (offset + temp) * decay;
}

/// Point on a cubic Bézier curve
pub fn cubic_bezier(cps: &[Vec3; 4], t: f32) -> Vec3 {
    let u = 1.0 - t;
    cps[0] * (u * u * u) + cps[1] * (3.0 * u * u * t) + cps[2] * (3.0 * u * t * t) + cps[3] * (t * t * t)
}

/// Derivative of a cubic Bézier curve with respect to its parameter
pub fn cubic_bezier_tangent(cps: &[Vec3; 4], t: f32) -> Vec3 {
    let u = 1.0 - t;
    (cps[1] - cps[0]) * (3.0 * u * u) + (cps[2] - cps[1]) * (6.0 * u * t) + (cps[3] - cps[2]) * (3.0 * t * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hermite_remap_endpoints() {
        assert!(hermite_remap(0.0, 0.3, 1.5).abs() < 1e-6);
        assert!((hermite_remap(1.0, 0.3, 1.5) - 1.0).abs() < 1e-6);
        // Slow start: early progress lags linear time
        assert!(hermite_remap(0.1, 0.3, 1.5) < 0.1);
    }

    #[test]
    fn test_critically_damp_at_rest_stays_put() {
        let mut value = 28.0;
        let mut vel = 0.0;
        critically_damp(&mut value, &mut vel, 28.0, 6.0, 1.0 / 120.0);
        assert_eq!(value, 28.0);
        assert_eq!(vel, 0.0);
    }

    #[test]
    fn test_critically_damp_converges() {
        let mut value = 10.0;
        let mut vel = 0.0;
        for _ in 0..600 {
            critically_damp(&mut value, &mut vel, 28.0, 6.0, 1.0 / 120.0);
            assert!(value <= 28.0 + 1e-3, "critically damped must not overshoot");
        }
        assert!((value - 28.0).abs() < 0.01);
    }

    #[test]
    fn test_bezier_endpoints() {
        let cps = [Vec3::ZERO, Vec3::X, Vec3::new(2.0, 1.0, 0.0), Vec3::new(3.0, 0.0, 0.0)];
        assert!(cubic_bezier(&cps, 0.0).distance(cps[0]) < 1e-6);
        assert!(cubic_bezier(&cps, 1.0).distance(cps[3]) < 1e-6);
        assert!(cubic_bezier_tangent(&cps, 1.0).distance((cps[3] - cps[2]) * 3.0) < 1e-6);
    }
}
