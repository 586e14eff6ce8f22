//! The bird: position, aim point, orientation and cosmetic phases

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::buffered::Buffered;
use crate::assets::{AssetTable, BonePose, TongueRig};
use crate::consts::*;

const TONGUE_DAMPING: f32 = 0.85;
const TONGUE_GRAVITY: f32 = 9.0;
const TONGUE_CONSTRAINT_PASSES: usize = 2;

/// Small verlet chain hanging from the beak, in bird-relative coordinates.
///
/// Purely cosmetic: it reacts to the bird's motion but never feeds back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tongue {
    pub points: Vec<Buffered<Vec3>>,
    prev: Vec<Vec3>,
    lengths: Vec<f32>,
}

impl Tongue {
    pub fn new(rig: &TongueRig) -> Self {
        let mut along = 0.0;
        let rest: Vec<Vec3> = rig
            .lengths
            .iter()
            .map(|len| {
                along += len;
                Vec3::X * along
            })
            .collect();
        Self {
            points: rest.iter().map(|&p| Buffered::new(p)).collect(),
            prev: rest,
            lengths: rig.lengths.clone(),
        }
    }

    pub fn age(&mut self) {
        for point in &mut self.points {
            point.age();
        }
    }

    /// Let the chain trail behind `bird_delta`, the bird's motion this step
    pub fn update(&mut self, bird_delta: Vec3, dt: f32) {
        let gravity = Vec3::new(0.0, 0.0, -TONGUE_GRAVITY * dt * dt);
        for (point, prev) in self.points.iter_mut().zip(self.prev.iter_mut()) {
            let p = point.end;
            let inertia = (p - *prev) * TONGUE_DAMPING;
            *prev = p;
            point.end = p + inertia - bird_delta + gravity;
        }
        for _ in 0..TONGUE_CONSTRAINT_PASSES {
            let mut parent = Vec3::ZERO;
            for (point, &len) in self.points.iter_mut().zip(&self.lengths) {
                let dir = (point.end - parent).normalize_or(Vec3::X);
                point.end = parent + dir * len;
                parent = point.end;
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bird {
    pub pos: Buffered<Vec3>,
    /// Camera focus; differs from `pos` only during a teleport
    pub aim: Buffered<Vec3>,
    /// Nose pitch in radians, positive nose-up
    pub pitch: Buffered<f32>,
    /// Orientation from mode and rotator
    pub rot: Buffered<Quat>,
    /// Orientation after camera-transition damping and wobble
    pub final_rot: Buffered<Quat>,
    /// Angular velocity while tumbling (axis scaled by rad/s)
    pub spin: Vec3,
    pub wobble_phase: f32,
    pub wobble_amount: f32,
    /// Wing flap loop phase (cycles)
    pub flap_phase: Buffered<f32>,
    /// Seconds of fast flapping left after a jump
    pub flap_burst: f32,
    pub eye_phase: Buffered<f32>,
    pub tongue: Tongue,
}

/// Everything a renderer needs to draw the bird at one instant
#[derive(Debug, Clone)]
pub struct BirdPose {
    pub pos: Vec3,
    pub aim: Vec3,
    pub rot: Quat,
    pub wings: Vec<BonePose>,
    pub eyes: Vec<BonePose>,
    pub tongue: Vec<Vec3>,
}

/// Nose-up pitch about the lateral axis (bird faces +X)
#[inline]
pub fn pitch_rotation(pitch: f32) -> Quat {
    Quat::from_rotation_y(-pitch)
}

impl Bird {
    pub fn new(pos: Vec3, assets: &AssetTable) -> Self {
        Self {
            pos: Buffered::new(pos),
            aim: Buffered::new(pos),
            pitch: Buffered::new(0.0),
            rot: Buffered::new(Quat::IDENTITY),
            final_rot: Buffered::new(Quat::IDENTITY),
            spin: Vec3::ZERO,
            wobble_phase: 0.0,
            wobble_amount: 0.0,
            flap_phase: Buffered::new(0.0),
            flap_burst: 0.0,
            eye_phase: Buffered::new(0.0),
            tongue: Tongue::new(&assets.tongue),
        }
    }

    pub fn age(&mut self) {
        self.pos.age();
        self.aim.age();
        self.pitch.age();
        self.rot.age();
        self.final_rot.age();
        self.flap_phase.age();
        self.eye_phase.age();
        self.tongue.age();
    }

    /// Ease pitch toward `target` at a capped angular rate
    pub fn ease_pitch(&mut self, target: f32, dt: f32) {
        let current = self.pitch.end;
        let step = ((target - current) * (PITCH_EASE * dt).min(1.0))
            .clamp(-PITCH_MAX_RATE * dt, PITCH_MAX_RATE * dt);
        self.pitch.end = current + step;
    }

    /// Advance flap and eye loops
    pub fn advance_phases(&mut self, dt: f32) {
        let rate = if self.flap_burst > 0.0 { FLAP_RATE_BURST } else { FLAP_RATE_IDLE };
        self.flap_burst = (self.flap_burst - dt).max(0.0);
        self.flap_phase.end += rate * dt;
        self.flap_phase.wrap(1.0);
        self.eye_phase.end += EYE_RATE * dt;
        self.eye_phase.wrap(1.0);
    }

    pub fn start_wobble(&mut self) {
        self.wobble_amount = 1.0;
        self.wobble_phase = 0.0;
    }

    /// Wobble offset for this step, decaying it as it goes
    pub fn advance_wobble(&mut self, dt: f32) -> Quat {
        if self.wobble_amount <= 0.0 {
            return Quat::IDENTITY;
        }
        self.wobble_phase += WOBBLE_FREQ * dt;
        self.wobble_amount = (self.wobble_amount - WOBBLE_DECAY * dt).max(0.0);
        Quat::from_rotation_x(self.wobble_phase.sin() * self.wobble_amount * WOBBLE_ANGLE)
    }

    pub fn shift_x(&mut self, dx: f32) {
        self.pos.shift_x(dx);
        self.aim.shift_x(dx);
    }

    pub fn pose(&self, frac: f32, assets: &AssetTable) -> BirdPose {
        BirdPose {
            pos: self.pos.sample(frac),
            aim: self.aim.sample(frac),
            rot: self.final_rot.sample(frac),
            wings: assets.wing_poses.sample(self.flap_phase.sample(frac)),
            eyes: assets.eye_poses.sample(self.eye_phase.sample(frac)),
            tongue: self.tongue.points.iter().map(|p| p.sample(frac)).collect(),
        }
    }
}
