//! Fixed-step scheduler
//!
//! The host calls `update` once per rendered frame with the elapsed wall
//! time. Whole simulation steps are run out of an accumulator and the
//! remainder is exposed as `interval_frac` for render sampling. Presses are
//! latched between frames and consumed by the next step.

use glam::{Quat, Vec2, Vec3};

use crate::assets::AssetTable;
use crate::consts::{MAX_FRAME_DT, MAX_SUBSTEPS, SIM_DT};
use crate::highscores::HighScores;
use crate::settings::Tuning;
use crate::sim::{BirdPose, GameEvent, ResetRequest, SimulationState, StepContext, TickInput, tick};

pub struct Session {
    state: SimulationState,
    assets: AssetTable,
    tuning: Tuning,
    accumulator: f32,
    interval_frac: f32,
    /// Latched until the next step
    input: TickInput,
    idle_mode: bool,
    events: Vec<GameEvent>,
    pub high_scores: HighScores,
}

impl Session {
    pub fn new(seed: u64, assets: AssetTable, tuning: Tuning) -> Self {
        log::info!("Session created with seed {}", seed);
        Self {
            state: SimulationState::new(seed, &assets, &tuning),
            assets,
            tuning,
            accumulator: 0.0,
            interval_frac: 0.0,
            input: TickInput::default(),
            idle_mode: false,
            events: Vec::new(),
            high_scores: HighScores::new(),
        }
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn assets(&self) -> &AssetTable {
        &self.assets
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    /// Let the built-in autopilot play
    pub fn set_idle_mode(&mut self, idle: bool) {
        self.idle_mode = idle;
    }

    /// Latch a press; `pointer` is in normalized screen coordinates (y down)
    pub fn press(&mut self, pointer: Option<Vec2>) {
        self.input.activate = true;
        self.input.pointer = pointer;
    }

    /// Advance by `dt` seconds of wall time. Returns the number of steps run.
    pub fn update(&mut self, dt: f32) -> u32 {
        if dt > MAX_FRAME_DT {
            log::warn!("Frame took {:.3}s, clamping to {:.3}s", dt, MAX_FRAME_DT);
        }
        self.accumulator += dt.clamp(0.0, MAX_FRAME_DT);

        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            let mut input = std::mem::take(&mut self.input);
            input.idle_mode = self.idle_mode;
            let ctx = StepContext {
                dt: SIM_DT,
                assets: &self.assets,
                tuning: &self.tuning,
            };
            tick(&mut self.state, &input, &ctx);
            self.accumulator -= SIM_DT;
            substeps += 1;

            self.collect_events();
            if let Some(request) = self.state.reset_request.take() {
                self.reset(request);
            }
        }

        if self.accumulator >= SIM_DT {
            // Behind by more than the substep budget: drop the backlog
            let dropped = (self.accumulator / SIM_DT).floor();
            log::debug!("Dropping {} simulation steps", dropped);
            self.accumulator -= dropped * SIM_DT;
        }
        self.interval_frac = (self.accumulator / SIM_DT).clamp(0.0, 1.0);
        substeps
    }

    /// Fraction of a step elapsed since the last one, for render sampling
    pub fn interval_frac(&self) -> f32 {
        self.interval_frac
    }

    /// Events produced since the last drain
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn bird_pose(&self) -> BirdPose {
        self.state.bird_pose(self.interval_frac, &self.assets)
    }

    pub fn camera_pose(&self) -> (Vec3, Quat) {
        self.state.camera.pose(self.interval_frac)
    }

    fn collect_events(&mut self) {
        for event in self.state.drain_events() {
            if let GameEvent::Died { score } = event {
                let level = self.state.playfield.frontier_level();
                if let Some(rank) = self.high_scores.add_score(score, level, self.state.seed) {
                    log::info!("New high score #{}: {}", rank, score);
                }
            }
            self.events.push(event);
        }
    }

    /// Replace the whole simulation state
    fn reset(&mut self, request: ResetRequest) {
        let seed = self.state.rng.next_seed();
        self.state = match request {
            ResetRequest::NewGame => SimulationState::new_game(seed, &self.assets, &self.tuning),
            ResetRequest::BackToTitle => SimulationState::new(seed, &self.assets, &self.tuning),
        };
        self.accumulator = 0.0;
        log::info!("Session reset ({:?}) with seed {}", request, seed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{LifeState, Mode};

    fn session(seed: u64) -> Session {
        Session::new(seed, AssetTable::builtin().unwrap(), Tuning::default())
    }

    #[test]
    fn test_steps_run_per_accumulated_time() {
        let mut s = session(1);
        assert_eq!(s.update(SIM_DT * 0.5), 0);
        assert!((s.interval_frac() - 0.5).abs() < 1e-3);
        assert_eq!(s.update(SIM_DT * 0.75), 1);
        assert!((s.interval_frac() - 0.25).abs() < 1e-3);
        assert_eq!(s.state().time_ticks, 1);
    }

    #[test]
    fn test_long_frame_is_clamped() {
        let mut s = session(1);
        let steps = s.update(5.0);
        assert!(steps <= MAX_SUBSTEPS);
        assert!(s.interval_frac() < 1.0);
    }

    #[test]
    fn test_press_is_consumed_by_one_step() {
        let mut s = session(1);
        s.update(SIM_DT);
        s.press(None);
        s.update(SIM_DT * 3.0);
        assert!(matches!(s.state().mode, Mode::Playing { .. }));
        let flaps = s
            .drain_events()
            .iter()
            .filter(|e| matches!(e, GameEvent::Sound(r) if r.cue == crate::audio::SoundCue::Flap))
            .count();
        assert_eq!(flaps, 1);
    }

    #[test]
    fn test_restart_replaces_state() {
        let mut s = session(9);
        s.state.life = LifeState::Dead {
            time: 5.0,
            sign_shown: true,
            prompt_shown: true,
            back_button: None,
        };
        let old_seed = s.state().seed;
        s.press(None);
        s.update(SIM_DT);
        assert_eq!(s.state().life, LifeState::Alive);
        assert!(s.state().is_playing());
        assert_ne!(s.state().seed, old_seed);
        assert!(s.state().reset_request.is_none());
    }
}
