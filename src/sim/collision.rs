//! Collision detection between the bird sphere and pipe cylinders
//!
//! Pipes are capped cylinders of infinite length: in the cylinder's local
//! frame the cap disc sits at the origin facing +Z and the body extends
//! down -Z. The test is analytic and classifies which part was touched.

use glam::{Affine3A, Vec3};
use serde::{Deserialize, Serialize};

use crate::consts::COLLISION_EPSILON;

/// Which part of the cylinder the sphere touches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContactZone {
    None,
    /// Centre below the cap plane and within the wall radius
    Inside,
    /// Lateral wall
    Side,
    /// Flat cap face (also used for plain ground contact)
    CapPlane,
    /// Rim where the cap meets the wall
    CapEdge,
}

/// Result of a collision check
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollisionResult {
    pub zone: ContactZone,
    /// Contact point on the surface
    pub point: Vec3,
    /// Surface normal, pointing out of the solid toward the sphere
    pub normal: Vec3,
    /// Distance the sphere must move along `normal` to separate
    pub penetration: f32,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            zone: ContactZone::None,
            point: Vec3::ZERO,
            normal: Vec3::ZERO,
            penetration: 0.0,
        }
    }

    #[inline]
    pub fn hit(&self) -> bool {
        self.zone != ContactZone::None
    }
}

/// Sphere against a capped cylinder in the cylinder's own frame
pub fn sphere_cylinder_local(center: Vec3, sphere_radius: f32, cyl_radius: f32) -> CollisionResult {
    let v = center.z;
    let radial_len = center.truncate().length();
    // Any perpendicular works on the axis; avoid normalizing a zero vector
    let (u, radial) = if radial_len <= COLLISION_EPSILON {
        (0.0, Vec3::X)
    } else {
        (radial_len, Vec3::new(center.x / radial_len, center.y / radial_len, 0.0))
    };

    if v >= sphere_radius || u >= cyl_radius + sphere_radius {
        return CollisionResult::miss();
    }

    let over_cap = u <= cyl_radius + COLLISION_EPSILON;
    let cap_point = Vec3::new(center.x, center.y, 0.0);
    let wall_point = radial * cyl_radius + Vec3::Z * v;

    if over_cap && v < -COLLISION_EPSILON {
        // Buried: leave through whichever surface is closer
        let cap_depth = sphere_radius - v;
        let wall_depth = sphere_radius + cyl_radius - u;
        if cap_depth <= wall_depth {
            CollisionResult {
                zone: ContactZone::Inside,
                point: cap_point,
                normal: Vec3::Z,
                penetration: cap_depth,
            }
        } else {
            CollisionResult {
                zone: ContactZone::Inside,
                point: wall_point,
                normal: radial,
                penetration: wall_depth,
            }
        }
    } else if over_cap {
        CollisionResult {
            zone: ContactZone::CapPlane,
            point: cap_point,
            normal: Vec3::Z,
            penetration: sphere_radius - v,
        }
    } else if v <= COLLISION_EPSILON {
        CollisionResult {
            zone: ContactZone::Side,
            point: wall_point,
            normal: radial,
            penetration: sphere_radius - (u - cyl_radius),
        }
    } else {
        // Offset from the rim in the (radial, axial) plane
        let du = u - cyl_radius;
        let dist = (du * du + v * v).sqrt();
        if dist >= sphere_radius {
            return CollisionResult::miss();
        }
        CollisionResult {
            zone: ContactZone::CapEdge,
            point: radial * cyl_radius,
            normal: (radial * du + Vec3::Z * v) / dist,
            penetration: sphere_radius - dist,
        }
    }
}

/// Sphere in world space against a cylinder posed by `cyl_to_world`.
///
/// The pose must be rigid (rotation + translation).
pub fn sphere_cylinder(
    world_center: Vec3,
    sphere_radius: f32,
    cyl_radius: f32,
    cyl_to_world: &Affine3A,
) -> CollisionResult {
    let local = cyl_to_world.inverse().transform_point3(world_center);
    let mut result = sphere_cylinder_local(local, sphere_radius, cyl_radius);
    if result.hit() {
        result.point = cyl_to_world.transform_point3(result.point);
        result.normal = cyl_to_world.transform_vector3(result.normal).normalize_or(Vec3::Z);
    }
    result
}

/// Sphere against the horizontal ground plane
pub fn sphere_floor(center: Vec3, sphere_radius: f32, floor_z: f32) -> CollisionResult {
    let height = center.z - floor_z;
    if height > sphere_radius {
        return CollisionResult::miss();
    }
    CollisionResult {
        zone: ContactZone::CapPlane,
        point: Vec3::new(center.x, center.y, floor_z),
        normal: Vec3::Z,
        penetration: sphere_radius - height,
    }
}

/// Reflect velocity off a surface
///
/// Standard reflection: v' = v - 2(v·n)n
#[inline]
pub fn reflect_velocity(velocity: Vec3, normal: Vec3) -> Vec3 {
    velocity - 2.0 * velocity.dot(normal) * normal
}
