//! Obstacles placed in the playfield
//!
//! Obstacles are plain values owned by the playfield and addressed by id.
//! Hit and teleport records carry the id plus whatever geometry they need,
//! so nothing dangles once the obstacle is pruned.

use std::f32::consts::PI;

use glam::{Affine3A, Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::collision::{CollisionResult, ContactZone, sphere_cylinder};
use crate::consts::{TELEPORT_EJECT_CLEARANCE, TELEPORT_RIM_MARGIN};

/// A pipe: capped cylinder whose mouth is the cap disc
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipe {
    /// Local frame: mouth at origin facing +Z, body along -Z
    pub pose_to_world: Affine3A,
    pub radius: f32,
    /// Can be flown into
    pub warp: bool,
}

impl Pipe {
    /// Pipe standing on the ground with its mouth at `mouth`, opening upward
    pub fn rising(mouth: Vec3, radius: f32, warp: bool) -> Self {
        Self {
            pose_to_world: Affine3A::from_translation(mouth),
            radius,
            warp,
        }
    }

    /// Pipe hanging from above with its mouth at `mouth`, opening downward
    pub fn hanging(mouth: Vec3, radius: f32) -> Self {
        Self {
            pose_to_world: Affine3A::from_rotation_translation(Quat::from_rotation_x(PI), mouth),
            radius,
            warp: false,
        }
    }

    pub fn mouth(&self) -> Vec3 {
        self.pose_to_world.translation.into()
    }

    /// Direction the mouth opens toward
    pub fn facing(&self) -> Vec3 {
        self.pose_to_world.transform_vector3(Vec3::Z)
    }

    pub fn opens_up(&self) -> bool {
        self.facing().z > 0.5
    }
}

/// Obstacle variants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ObstacleKind {
    Pipe(Pipe),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Obstacle {
    pub id: u32,
    pub kind: ObstacleKind,
}

impl Obstacle {
    /// World x the obstacle was spawned at
    pub fn x(&self) -> f32 {
        match &self.kind {
            ObstacleKind::Pipe(pipe) => pipe.pose_to_world.translation.x,
        }
    }

    pub fn collide(&self, center: Vec3, radius: f32) -> CollisionResult {
        match &self.kind {
            ObstacleKind::Pipe(pipe) => sphere_cylinder(center, radius, pipe.radius, &pipe.pose_to_world),
        }
    }

    /// Whether a contact counts as flying into the obstacle rather than hitting it
    pub fn is_teleport_entry(&self, center: Vec3, velocity: Vec3, contact: &CollisionResult) -> bool {
        match &self.kind {
            ObstacleKind::Pipe(pipe) => {
                if !pipe.warp || contact.zone != ContactZone::CapPlane {
                    return false;
                }
                let facing = pipe.facing();
                let off_axis = (center - pipe.mouth()).reject_from_normalized(facing).length();
                off_axis <= pipe.radius - TELEPORT_RIM_MARGIN && velocity.dot(facing) < 0.0
            }
        }
    }

    /// Where a bird teleporting out of this obstacle reappears, if it can
    pub fn eject_point(&self) -> Option<Vec3> {
        match &self.kind {
            ObstacleKind::Pipe(pipe) if pipe.opens_up() => {
                Some(pipe.mouth() + pipe.facing() * TELEPORT_EJECT_CLEARANCE)
            }
            ObstacleKind::Pipe(_) => None,
        }
    }

    /// Centre of the opening a teleport enters through
    pub fn entry_center(&self) -> Vec3 {
        match &self.kind {
            ObstacleKind::Pipe(pipe) => pipe.mouth(),
        }
    }

    /// Whether the obstacle rises from the ground toward the gap
    pub fn opens_up(&self) -> bool {
        match &self.kind {
            ObstacleKind::Pipe(pipe) => pipe.opens_up(),
        }
    }

    pub fn right_edge(&self) -> f32 {
        match &self.kind {
            ObstacleKind::Pipe(pipe) => pipe.pose_to_world.translation.x + pipe.radius,
        }
    }

    pub fn is_removable(&self, invisible_edge: f32) -> bool {
        self.right_edge() < invisible_edge
    }

    pub fn shift_x(&mut self, dx: f32) {
        match &mut self.kind {
            ObstacleKind::Pipe(pipe) => pipe.pose_to_world.translation.x += dx,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn warp_pipe() -> Obstacle {
        Obstacle {
            id: 1,
            kind: ObstacleKind::Pipe(Pipe::rising(Vec3::new(10.0, 0.0, 2.0), 1.1, true)),
        }
    }

    #[test]
    fn test_hanging_pipe_blocks_from_below() {
        let pipe = Obstacle {
            id: 2,
            kind: ObstacleKind::Pipe(Pipe::hanging(Vec3::new(10.0, 0.0, 6.0), 1.1)),
        };
        let hit = pipe.collide(Vec3::new(10.0, 0.0, 5.7), 0.45);
        assert_eq!(hit.zone, ContactZone::CapPlane);
        assert!(hit.normal.z < -0.99);
        // Well inside the column above the mouth
        let buried = pipe.collide(Vec3::new(10.0, 0.0, 9.0), 0.45);
        assert_eq!(buried.zone, ContactZone::Inside);
        assert!(pipe.eject_point().is_none());
    }

    #[test]
    fn test_teleport_entry_requires_centered_descent() {
        let pipe = warp_pipe();
        let center = Vec3::new(10.2, 0.0, 2.3);
        let hit = pipe.collide(center, 0.45);
        assert_eq!(hit.zone, ContactZone::CapPlane);
        assert!(pipe.is_teleport_entry(center, Vec3::new(4.0, 0.0, -3.0), &hit));
        // Rising out of the mouth doesn't count
        assert!(!pipe.is_teleport_entry(center, Vec3::new(4.0, 0.0, 3.0), &hit));

        // Near the rim
        let rim = Vec3::new(10.95, 0.0, 2.3);
        let rim_hit = pipe.collide(rim, 0.45);
        assert!(!pipe.is_teleport_entry(rim, Vec3::new(4.0, 0.0, -3.0), &rim_hit));
    }

    #[test]
    fn test_plain_pipe_is_not_an_entry() {
        let mut pipe = warp_pipe();
        if let ObstacleKind::Pipe(p) = &mut pipe.kind {
            p.warp = false;
        }
        let center = Vec3::new(10.0, 0.0, 2.3);
        let hit = pipe.collide(center, 0.45);
        assert!(!pipe.is_teleport_entry(center, Vec3::new(4.0, 0.0, -3.0), &hit));
    }

    #[test]
    fn test_eject_point_above_mouth() {
        let eject = warp_pipe().eject_point().unwrap();
        assert!((eject.x - 10.0).abs() < 1e-6);
        assert!((eject.z - (2.0 + TELEPORT_EJECT_CLEARANCE)).abs() < 1e-6);
    }

    #[test]
    fn test_removable_behind_edge() {
        let mut pipe = warp_pipe();
        assert!(!pipe.is_removable(11.0));
        assert!(pipe.is_removable(11.2));
        pipe.shift_x(-5.0);
        assert!((pipe.x() - 5.0).abs() < 1e-6);
        assert!(pipe.is_removable(6.2));
    }
}
