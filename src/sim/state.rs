//! Simulation state and mode types
//!
//! Everything that determines future steps lives here, so two states that
//! serialize identically will evolve identically under the same inputs.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::bird::{Bird, BirdPose};
use super::buffered::Buffered;
use super::camera::Camera;
use super::collision::{CollisionResult, ContactZone};
use super::playfield::Playfield;
use super::rng::GameRng;
use crate::assets::AssetTable;
use crate::audio::SoundRequest;
use crate::consts::*;
use crate::settings::Tuning;

/// Post-recovery slow motion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TimeDilation {
    None,
    /// Easing back to real time; `time` counts up to the grace period
    Resume { time: f32 },
}

impl TimeDilation {
    /// Current time scale
    pub fn factor(&self, tuning: &Tuning) -> f32 {
        match *self {
            TimeDilation::None => 1.0,
            TimeDilation::Resume { time } => {
                let k = (time / tuning.slowmo_grace).clamp(0.0, 1.0).powf(1.5);
                tuning.slowmo_factor + (1.0 - tuning.slowmo_factor) * k
            }
        }
    }

    /// Advance by real time, dropping back to `None` once fully resumed
    pub fn advance(&mut self, dt: f32, tuning: &Tuning) {
        if let TimeDilation::Resume { time } = self {
            *time += dt;
            if *time >= tuning.slowmo_grace {
                *self = TimeDilation::None;
            }
        }
    }
}

/// A contact that ended normal flight
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    pub point: Vec3,
    pub normal: Vec3,
    pub penetration: f32,
    pub zone: ContactZone,
    /// Obstacle id, `None` for the floor
    pub obstacle: Option<u32>,
}

impl Hit {
    pub fn new(contact: &CollisionResult, obstacle: Option<u32>) -> Self {
        Self {
            point: contact.point,
            normal: contact.normal,
            penetration: contact.penetration,
            zone: contact.zone,
            obstacle,
        }
    }

    pub fn contact(&self) -> CollisionResult {
        CollisionResult {
            zone: self.zone,
            point: self.point,
            normal: self.normal,
            penetration: self.penetration,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FallMode {
    /// Scripted drop from the fall table
    Animated {
        /// Horizontal recoil direction (unit)
        recoil_dir: Vec3,
        start_pos: Vec3,
        /// Fractional index into the fall table
        frame: f32,
        start_rot: Quat,
        rot_axis: Vec3,
    },
    /// Ballistic tumble
    Free { vel: Vec3 },
}

/// Gameplay modes; each carries only its own data
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Mode {
    /// Hovering on the title screen
    Title { time: f32 },
    Playing {
        gravity: f32,
        /// Spring state of the gravity ramp
        gravity_vel: f32,
        z_vel: Buffered<f32>,
        dilation: TimeDilation,
    },
    /// Flying through a warp pipe
    Teleport {
        time: f32,
        start_pos: Vec3,
        entry: Vec3,
        exit: Vec3,
        did_enter: bool,
        did_pop: bool,
        did_puff: bool,
    },
    /// Frozen moment after a hit
    Impact {
        prev_vel: Vec3,
        hit: Hit,
        time: f32,
        /// Recover upward (hit from below the gap) or downward
        rise_up: bool,
    },
    /// Dazed arc back into the gap
    Recovering {
        time: f32,
        total_time: f32,
        cps: [Vec3; 4],
        played_sound: bool,
    },
    /// Ease from the recovery exit velocity back to cruise
    Blending { from_vel: Vec3, time: f32 },
    Falling {
        bounce_count: u32,
        prev_bounce_pos: Option<Vec3>,
        sub: FallMode,
    },
}

impl Mode {
    pub fn name(&self) -> &'static str {
        match self {
            Mode::Title { .. } => "title",
            Mode::Playing { .. } => "playing",
            Mode::Teleport { .. } => "teleport",
            Mode::Impact { .. } => "impact",
            Mode::Recovering { .. } => "recovering",
            Mode::Blending { .. } => "blending",
            Mode::Falling {
                sub: FallMode::Animated { .. },
                ..
            } => "falling/animated",
            Mode::Falling {
                sub: FallMode::Free { .. },
                ..
            } => "falling/free",
        }
    }

    /// Fresh flight with the given vertical speed
    pub fn playing(z_vel: f32, gravity: f32, dilation: TimeDilation) -> Self {
        Mode::Playing {
            gravity,
            gravity_vel: 0.0,
            z_vel: Buffered::new(z_vel),
            dilation,
        }
    }

    fn shift_x(&mut self, dx: f32) {
        let shift = Vec3::new(dx, 0.0, 0.0);
        match self {
            Mode::Title { .. } | Mode::Playing { .. } | Mode::Blending { .. } => {}
            Mode::Teleport {
                start_pos, entry, exit, ..
            } => {
                *start_pos += shift;
                *entry += shift;
                *exit += shift;
            }
            Mode::Impact { hit, .. } => hit.point += shift,
            Mode::Recovering { cps, .. } => {
                for cp in cps.iter_mut() {
                    *cp += shift;
                }
            }
            Mode::Falling {
                prev_bounce_pos, sub, ..
            } => {
                if let Some(prev) = prev_bounce_pos {
                    *prev += shift;
                }
                if let FallMode::Animated { start_pos, .. } = sub {
                    *start_pos += shift;
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LifeState {
    Alive,
    Dead {
        time: f32,
        sign_shown: bool,
        prompt_shown: bool,
        /// Seconds the back button has been held down
        back_button: Option<f32>,
    },
}

impl LifeState {
    pub fn dead() -> Self {
        LifeState::Dead {
            time: 0.0,
            sign_shown: false,
            prompt_shown: false,
            back_button: None,
        }
    }

    pub fn is_dead(&self) -> bool {
        matches!(self, LifeState::Dead { .. })
    }
}

/// Extra rotation layered over the mode's own orientation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Rotator {
    FromMode,
    /// Eased spin about the lateral axis
    Angle {
        angle: f32,
        start_angle: f32,
        end_angle: f32,
        time: f32,
        total_time: f32,
    },
}

impl Rotator {
    pub fn spin(start_angle: f32, end_angle: f32, total_time: f32) -> Self {
        Rotator::Angle {
            angle: start_angle,
            start_angle,
            end_angle,
            time: 0.0,
            total_time,
        }
    }

    pub fn is_flipping(&self) -> bool {
        matches!(self, Rotator::Angle { .. })
    }

    pub fn rotation(&self) -> Quat {
        match *self {
            Rotator::FromMode => Quat::IDENTITY,
            Rotator::Angle { angle, .. } => Quat::from_rotation_y(-angle),
        }
    }
}

/// Particle burst request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PuffRequest {
    pub pos: Vec3,
    pub seed: u32,
    pub dir: Vec3,
    pub big: bool,
}

/// Side effects emitted by a step for the host to act on
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GameEvent {
    Sound(SoundRequest),
    Puff(PuffRequest),
    /// Camera reached the follow framing; title overlay can go
    TitleDismissed,
    Scored { score: u32 },
    Died { score: u32 },
}

/// Whole-state replacement the session should perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResetRequest {
    NewGame,
    BackToTitle,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationState {
    pub seed: u64,
    pub rng: GameRng,
    pub mode: Mode,
    pub life: LifeState,
    pub rotator: Rotator,
    pub camera: Camera,
    pub playfield: Playfield,
    pub bird: Bird,
    pub score: u32,
    pub damage: u32,
    pub time_ticks: u64,
    /// Jump pressed while it could not be acted on
    pub jump_buffered: bool,
    /// Score popup brightness, decays to zero
    pub score_popup: f32,
    /// Seconds of sweat effect left
    pub sweat: f32,
    /// Produced this step; drained by the host
    #[serde(skip)]
    pub events: Vec<GameEvent>,
    pub reset_request: Option<ResetRequest>,
}

impl SimulationState {
    pub fn new(seed: u64, assets: &AssetTable, tuning: &Tuning) -> Self {
        let start = Vec3::new(0.0, 0.0, TITLE_BIRD_Z);
        Self {
            seed,
            rng: GameRng::new(seed),
            mode: Mode::Title { time: 0.0 },
            life: LifeState::Alive,
            rotator: Rotator::FromMode,
            camera: Camera::new(start, &tuning.parallax),
            playfield: Playfield::new(),
            bird: Bird::new(start, assets),
            score: 0,
            damage: 0,
            time_ticks: 0,
            jump_buffered: false,
            score_popup: 0.0,
            sweat: 0.0,
            events: Vec::new(),
            reset_request: None,
        }
    }

    /// Start a new game right away, skipping the title screen
    pub fn new_game(seed: u64, assets: &AssetTable, tuning: &Tuning) -> Self {
        let mut state = Self::new(seed, assets, tuning);
        state.camera.begin_transition();
        state.playfield.start(state.bird.pos.end.x, &assets.pipe);
        state.mode = Mode::playing(0.0, tuning.gravity, TimeDilation::None);
        state
    }

    pub fn push_sound(&mut self, sound: SoundRequest) {
        self.events.push(GameEvent::Sound(sound));
    }

    pub fn push_puff(&mut self, pos: Vec3, dir: Vec3, big: bool) {
        let seed = self.rng.next_u32();
        self.events.push(GameEvent::Puff(PuffRequest { pos, seed, dir, big }));
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Move every position-like value by `dx` along x
    pub fn shift_world(&mut self, dx: f32) {
        self.bird.shift_x(dx);
        self.camera.shift_x(dx);
        self.playfield.shift_x(dx);
        self.mode.shift_x(dx);
    }

    /// Bird pose at `frac` of the current step interval
    pub fn bird_pose(&self, frac: f32, assets: &AssetTable) -> BirdPose {
        self.bird.pose(frac, assets)
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.mode, Mode::Playing { .. })
    }
}
