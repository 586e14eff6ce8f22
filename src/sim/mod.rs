//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (append order of obstacles and checkpoints)
//! - No rendering, audio or platform dependencies

pub mod bird;
pub mod bounce;
pub mod buffered;
pub mod camera;
pub mod collision;
pub mod obstacle;
pub mod playfield;
pub mod rng;
pub mod state;
pub mod tick;

pub use bird::{Bird, BirdPose, Tongue};
pub use bounce::{BounceHistory, BounceOutcome, bounce_response};
pub use buffered::{Buffered, Interpolate};
pub use camera::{Camera, CameraMode, CameraParams, ParallaxLayer, pose_from};
pub use collision::{CollisionResult, ContactZone, sphere_cylinder, sphere_cylinder_local, sphere_floor};
pub use obstacle::{Obstacle, ObstacleKind, Pipe};
pub use playfield::{Gap, ObstacleSequence, Playfield};
pub use rng::GameRng;
pub use state::{
    FallMode, GameEvent, Hit, LifeState, Mode, PuffRequest, ResetRequest, Rotator, SimulationState, TimeDilation,
};
pub use tick::{StepContext, TickInput, tick};
