//! Double-buffered simulation values
//!
//! `start` is the value at the beginning of the current step interval and
//! `end` the value at its end. Each step ages the buffer (`start = end`)
//! before computing a new `end`; a renderer samples between the two with
//! the scheduler's interval fraction.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Values that can be blended for render-time sampling
pub trait Interpolate: Copy {
    fn interpolate(a: Self, b: Self, t: f32) -> Self;
}

impl Interpolate for f32 {
    fn interpolate(a: Self, b: Self, t: f32) -> Self {
        crate::lerp(a, b, t)
    }
}

impl Interpolate for Vec3 {
    fn interpolate(a: Self, b: Self, t: f32) -> Self {
        a.lerp(b, t)
    }
}

impl Interpolate for Quat {
    fn interpolate(a: Self, b: Self, t: f32) -> Self {
        a.slerp(b, t)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Buffered<T> {
    pub start: T,
    pub end: T,
}

impl<T: Copy> Buffered<T> {
    /// Both ends set to `value` (no motion across the interval)
    pub fn new(value: T) -> Self {
        Self {
            start: value,
            end: value,
        }
    }

    /// Start a new interval from the previous one's end
    #[inline]
    pub fn age(&mut self) {
        self.start = self.end;
    }

    /// Teleport: discard motion so nothing interpolates across the jump
    pub fn reset(&mut self, value: T) {
        self.start = value;
        self.end = value;
    }
}

impl<T: Interpolate> Buffered<T> {
    pub fn sample(&self, frac: f32) -> T {
        T::interpolate(self.start, self.end, frac.clamp(0.0, 1.0))
    }
}

impl Buffered<f32> {
    /// Keep `end` in [0, period) by shifting both ends together
    pub fn wrap(&mut self, period: f32) {
        if self.end >= period || self.end < 0.0 {
            let shift = (self.end / period).floor() * period;
            self.start -= shift;
            self.end -= shift;
        }
    }
}

impl Buffered<Vec3> {
    pub fn shift_x(&mut self, dx: f32) {
        self.start.x += dx;
        self.end.x += dx;
    }

    /// Motion over the current interval
    pub fn delta(&self) -> Vec3 {
        self.end - self.start
    }
}

impl Buffered<Quat> {
    /// Flip `end` onto the hemisphere of `start` so slerp takes the short way
    pub fn fix_sign(&mut self) {
        if self.end.dot(self.start) < 0.0 {
            self.end = -self.end;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_age_copies_end_to_start() {
        let mut b = Buffered::new(1.0_f32);
        b.end = 3.0;
        b.age();
        assert_eq!(b.start, 3.0);
        assert_eq!(b.end, 3.0);
    }

    #[test]
    fn test_sample_midpoint() {
        let b = Buffered {
            start: Vec3::ZERO,
            end: Vec3::new(2.0, 0.0, 4.0),
        };
        assert!(b.sample(0.5).distance(Vec3::new(1.0, 0.0, 2.0)) < 1e-6);
    }

    #[test]
    fn test_wrap_keeps_interval_continuous() {
        let mut b = Buffered { start: 0.9, end: 1.1 };
        b.wrap(1.0);
        assert!((b.end - 0.1).abs() < 1e-6);
        assert!((b.start - -0.1).abs() < 1e-6);
        assert!((b.end - b.start - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_fix_sign_picks_near_hemisphere() {
        let q = Quat::from_rotation_z(0.3);
        let mut b = Buffered { start: q, end: -q };
        b.fix_sign();
        assert!(b.end.dot(b.start) > 0.0);
    }
}
