//! Camera modes and pose construction
//!
//! Every mode reduces to the same three parameters (yaw of the framing,
//! eye offset, pan shift), which one formula turns into a pose that looks
//! at the focus point with +Z up. Camera space follows the usual
//! convention: the camera looks down its local -Z.

use std::f32::consts::FRAC_PI_2;

use glam::{Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::buffered::Buffered;
use crate::consts::*;
use crate::settings::ParallaxSpec;
use crate::{ease_in_out_cubic, normalize_angle};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CameraMode {
    /// Fixed side-on offset from the bird
    Follow,
    /// Title screen: circle the bird while bobbing up and down
    Orbit {
        angle: f32,
        rising: bool,
        rising_time: f32,
    },
    /// Ease from the orbit into the follow framing
    Transition {
        start_angle: f32,
        start_y_rise: f32,
        param: f32,
    },
}

/// Inputs of the shared pose formula
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraParams {
    pub frame_to_focus_yaw: f32,
    pub look_from_rel_frame: Vec3,
    pub shift_rel_frame: Vec3,
}

/// Background group scrolled by a fraction of the camera's motion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParallaxLayer {
    pub factor: f32,
    pub repeat: f32,
    /// World x of the layer's tiling origin
    pub anchor: Buffered<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Camera {
    pub mode: CameraMode,
    pub pos: Buffered<Vec3>,
    pub rot: Buffered<Quat>,
    pub layers: Vec<ParallaxLayer>,
}

fn orbit_rise(rising: bool, rising_time: f32) -> f32 {
    let f = ease_in_out_cubic(rising_time / ORBIT_RISE_TIME);
    if rising { f } else { 1.0 - f }
}

fn orbit_look_from(rise: f32) -> Vec3 {
    Vec3::new(0.0, -ORBIT_DISTANCE, ORBIT_HEIGHT + ORBIT_RISE_HEIGHT * rise)
}

/// cos⁵ ease-in-out nudged toward a cubic smoothstep
pub fn transition_ease(param: f32) -> f32 {
    let p = param.clamp(0.0, 1.0);
    let base = 1.0 - (p * FRAC_PI_2).cos().powi(5);
    let cubic = p * p * (3.0 - 2.0 * p);
    base + TRANSITION_CUBIC_WEIGHT * (cubic - base)
}

impl CameraMode {
    pub fn params(&self) -> CameraParams {
        match *self {
            CameraMode::Follow => CameraParams {
                frame_to_focus_yaw: 0.0,
                look_from_rel_frame: FOLLOW_LOOK_FROM,
                shift_rel_frame: FOLLOW_SHIFT,
            },
            CameraMode::Orbit {
                angle,
                rising,
                rising_time,
            } => CameraParams {
                frame_to_focus_yaw: angle,
                look_from_rel_frame: orbit_look_from(orbit_rise(rising, rising_time)),
                shift_rel_frame: Vec3::ZERO,
            },
            CameraMode::Transition {
                start_angle,
                start_y_rise,
                param,
            } => {
                let e = transition_ease(param);
                CameraParams {
                    frame_to_focus_yaw: start_angle * (1.0 - e),
                    look_from_rel_frame: orbit_look_from(start_y_rise).lerp(FOLLOW_LOOK_FROM, e),
                    shift_rel_frame: Vec3::ZERO.lerp(FOLLOW_SHIFT, e),
                }
            }
        }
    }

    /// How far the framing has moved from title toward gameplay (0..1)
    pub fn follow_weight(&self) -> f32 {
        match *self {
            CameraMode::Follow => 1.0,
            CameraMode::Orbit { .. } => 0.0,
            CameraMode::Transition { param, .. } => transition_ease(param),
        }
    }
}

/// Camera position and orientation looking at `focus`
pub fn pose_from(focus: Vec3, params: &CameraParams) -> (Vec3, Quat) {
    let frame = Quat::from_rotation_z(params.frame_to_focus_yaw);
    let eye = focus + frame * params.look_from_rel_frame + frame * params.shift_rel_frame;
    let forward = (focus - eye).normalize_or(Vec3::Y);
    let right = forward.cross(Vec3::Z).normalize_or(Vec3::X);
    let up = right.cross(forward);
    (eye, Quat::from_mat3(&Mat3::from_cols(right, up, -forward)).normalize())
}

impl Camera {
    pub fn new(focus: Vec3, parallax: &[ParallaxSpec]) -> Self {
        let mode = CameraMode::Orbit {
            angle: 0.0,
            rising: true,
            rising_time: 0.0,
        };
        let (pos, rot) = pose_from(focus, &mode.params());
        Self {
            mode,
            pos: Buffered::new(pos),
            rot: Buffered::new(rot),
            layers: parallax
                .iter()
                .map(|spec| ParallaxLayer {
                    factor: spec.factor,
                    repeat: spec.repeat,
                    anchor: Buffered::new(pos.x),
                })
                .collect(),
        }
    }

    pub fn age(&mut self) {
        self.pos.age();
        self.rot.age();
        for layer in &mut self.layers {
            layer.anchor.age();
        }
    }

    /// Leave the title orbit and head for the follow framing
    pub fn begin_transition(&mut self) {
        if let CameraMode::Orbit {
            angle,
            rising,
            rising_time,
        } = self.mode
        {
            self.mode = CameraMode::Transition {
                start_angle: normalize_angle(angle),
                start_y_rise: orbit_rise(rising, rising_time),
                param: 0.0,
            };
        }
    }

    pub fn follow_weight(&self) -> f32 {
        self.mode.follow_weight()
    }

    /// Advance the mode and recompute the pose. Returns true on the step the
    /// transition lands in `Follow`.
    pub fn update(&mut self, focus: Vec3, dt: f32) -> bool {
        let mut arrived = false;
        match &mut self.mode {
            CameraMode::Follow => {}
            CameraMode::Orbit {
                angle,
                rising,
                rising_time,
            } => {
                *angle = normalize_angle(*angle + ORBIT_SPEED * dt);
                *rising_time += dt;
                if *rising_time >= ORBIT_RISE_TIME {
                    *rising = !*rising;
                    *rising_time -= ORBIT_RISE_TIME;
                }
            }
            CameraMode::Transition { param, .. } => {
                *param += dt / TRANSITION_TIME;
                if *param >= 1.0 {
                    self.mode = CameraMode::Follow;
                    arrived = true;
                }
            }
        }

        let (pos, rot) = pose_from(focus, &self.mode.params());
        self.pos.end = pos;
        self.rot.end = rot;
        self.rot.fix_sign();

        let dx = self.pos.end.x - self.pos.start.x;
        let cam_x = self.pos.end.x;
        for layer in &mut self.layers {
            layer.anchor.end += dx * layer.factor;
            let behind = cam_x - layer.anchor.end;
            if behind >= layer.repeat || behind < 0.0 {
                let shift = (behind / layer.repeat).floor() * layer.repeat;
                layer.anchor.start += shift;
                layer.anchor.end += shift;
            }
        }

        arrived
    }

    /// Interpolated pose for rendering
    pub fn pose(&self, frac: f32) -> (Vec3, Quat) {
        (self.pos.sample(frac), self.rot.sample(frac))
    }

    pub fn shift_x(&mut self, dx: f32) {
        self.pos.shift_x(dx);
        for layer in &mut self.layers {
            layer.anchor.start += dx;
            layer.anchor.end += dx;
        }
    }
}
