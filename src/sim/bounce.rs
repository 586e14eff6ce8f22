//! Collision response for a falling bird
//!
//! Classifies a contact into leave / roll / bounce from the velocity along
//! the contact normal and returns what should happen. The caller applies
//! the outcome; nothing here touches simulation state except the RNG.

use glam::{Quat, Vec3};

use super::collision::{CollisionResult, reflect_velocity};
use super::rng::GameRng;
use crate::audio::{SoundCue, SoundRequest};
use crate::consts::*;

/// What the caller should do with a contact
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BounceOutcome {
    /// Already moving away from the surface
    Separating,
    /// Slow contact: slide along the surface
    Roll {
        vel: Vec3,
        /// Displacement that resolves the penetration
        push: Vec3,
    },
    Bounce {
        vel: Vec3,
        /// Tumble axis for the new flight
        rot_axis: Vec3,
        /// Play the scripted fall instead of changing velocity instantly
        animate: bool,
        puff: bool,
        sound: Option<SoundRequest>,
    },
}

/// Previous bounces of the current fall
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BounceHistory {
    pub count: u32,
    pub prev_pos: Option<Vec3>,
}

/// Respond to `hit` for a body moving at `vel` and tumbling at `spin`
pub fn bounce_response(
    hit: &CollisionResult,
    vel: Vec3,
    spin: Vec3,
    history: BounceHistory,
    rng: &mut GameRng,
) -> BounceOutcome {
    let normal = hit.normal;
    let d = vel.dot(normal);
    // The first contact of a fall always bounces, even when already leaving
    let first = history.count == 0;
    if !first {
        if d >= 0.0 {
            return BounceOutcome::Separating;
        }
        if d >= BOUNCE_ROLL_SPEED {
            return BounceOutcome::Roll {
                vel: normal.cross(spin) * ROLL_FACTOR,
                push: normal * hit.penetration,
            };
        }
    }

    // Blend toward the mirror image; the normal speed keeps its restitution share
    let mut bounced = if d < 0.0 {
        vel.lerp(reflect_velocity(vel, normal), 0.5 * (1.0 + BOUNCE_RESTITUTION))
    } else {
        vel
    };
    bounced.x = bounced.x.clamp(-BOUNCE_MAX_X, BOUNCE_MAX_X);

    // Tilt within a small cone around the reflection
    let speed = bounced.length();
    let dir = bounced.normalize_or(normal);
    let tilt_axis = Quat::from_axis_angle(dir, rng.next_float() * std::f32::consts::TAU) * dir.any_orthonormal_vector();
    let tilt = Quat::from_axis_angle(tilt_axis, rng.next_float() * BOUNCE_CONE);
    let bounced = tilt * dir * speed;

    let rot_axis = vel.cross(bounced).normalize_or(Vec3::Y);
    let animate = match (history.count, history.prev_pos) {
        (0, _) => true,
        (1, Some(prev)) => prev.distance_squared(hit.point) > BOUNCE_ANIMATE_DIST_SQ,
        _ => false,
    };
    let impact_speed = (-d).max(0.0);
    let sound = (!first).then(|| {
        SoundRequest::new(SoundCue::Bounce)
            .with_volume(impact_speed / 20.0)
            .with_pitch(0.8 + (impact_speed / 40.0).min(0.5))
    });

    BounceOutcome::Bounce {
        vel: bounced,
        rot_axis,
        animate,
        puff: animate || impact_speed > BOUNCE_PUFF_SPEED,
        sound,
    }
}
