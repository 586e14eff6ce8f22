//! Fixed timestep simulation tick
//!
//! Core game loop that advances simulation deterministically.

use std::f32::consts::{PI, TAU};

use glam::{Quat, Vec2, Vec3};

use super::bird::pitch_rotation;
use super::bounce::{BounceHistory, BounceOutcome, bounce_response};
use super::collision::{CollisionResult, sphere_floor};
use super::state::{FallMode, GameEvent, Hit, LifeState, Mode, ResetRequest, Rotator, SimulationState, TimeDilation};
use crate::assets::AssetTable;
use crate::audio::{SoundCue, SoundRequest};
use crate::consts::*;
use crate::settings::Tuning;
use crate::{critically_damp, cubic_bezier, cubic_bezier_tangent, ease_in_out_cubic, hermite_remap, lerp, normalize_angle};

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Copy, Default)]
pub struct TickInput {
    /// Press edge: jump, start or restart depending on state
    pub activate: bool,
    /// Pointer position of the press in normalized screen coordinates (y down)
    pub pointer: Option<Vec2>,
    /// Idle/demo mode - AI plays the game
    pub idle_mode: bool,
}

/// Everything a step reads besides the state itself
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    pub dt: f32,
    pub assets: &'a AssetTable,
    pub tuning: &'a Tuning,
}

/// Advance the simulation by one fixed timestep
pub fn tick(state: &mut SimulationState, input: &TickInput, ctx: &StepContext) {
    let dt = ctx.dt;
    state.time_ticks += 1;

    let mut input = *input;
    if input.idle_mode {
        autopilot(state, &mut input);
    }

    state.bird.age();
    state.camera.age();
    if let Mode::Playing { z_vel, .. } = &mut state.mode {
        z_vel.age();
    }

    let jump = route_input(state, &input);

    let before = state.mode.name();
    let mode_rot = update_mode(state, jump, ctx);
    if !matches!(state.mode, Mode::Teleport { .. }) {
        state.bird.aim.end = state.bird.pos.end;
    }
    let after = state.mode.name();
    if before != after {
        log::debug!("Mode {} -> {} at tick {}", before, after, state.time_ticks);
    }

    if !matches!(state.mode, Mode::Impact { .. }) {
        if !state.life.is_dead() {
            advance_score(state);
        }
        state.bird.advance_phases(dt);
        advance_rotator(state, dt);
    }

    state.sweat = (state.sweat - dt).max(0.0);
    let bird_delta = state.bird.pos.delta();
    state.bird.tongue.update(bird_delta, dt);

    if let Some(rot) = mode_rot {
        state.bird.rot.end = rot * state.rotator.rotation();
        state.bird.rot.fix_sign();
    }
    compose_final_rotation(state, dt);

    if state.camera.update(state.bird.aim.end, dt) {
        log::info!("Camera reached follow framing");
        state.events.push(GameEvent::TitleDismissed);
    }

    if state.playfield.is_started() {
        let aim_x = state.bird.aim.end.x;
        state
            .playfield
            .grow(aim_x + VIEW_AHEAD, &mut state.rng, ctx.tuning, &ctx.assets.pipe);
        state.playfield.prune(aim_x - VIEW_BEHIND - REMOVE_MARGIN);
    }

    if state.bird.aim.end.x > WORLD_WRAP_X {
        log::info!(
            "World shift by {} at x={:.1}",
            -WORLD_WRAP_AMOUNT,
            state.bird.aim.end.x
        );
        state.shift_world(-WORLD_WRAP_AMOUNT);
    }

    state.score_popup = (state.score_popup - SCORE_POPUP_DECAY * dt).max(0.0);
    update_dead_ui(state, dt);
}

/// Decide what a press means this step. Returns true for a jump.
fn route_input(state: &mut SimulationState, input: &TickInput) -> bool {
    if !input.activate {
        return false;
    }
    match state.life {
        LifeState::Dead { .. } => {
            press_while_dead(state, input.pointer);
            false
        }
        LifeState::Alive => match state.mode {
            Mode::Title { .. } | Mode::Playing { .. } => true,
            Mode::Impact { .. } | Mode::Recovering { .. } | Mode::Blending { .. } => {
                state.jump_buffered = true;
                false
            }
            Mode::Teleport { .. } | Mode::Falling { .. } => false,
        },
    }
}

fn in_back_button(pointer: Vec2) -> bool {
    pointer.cmpge(BACK_BUTTON_MIN).all() && pointer.cmple(BACK_BUTTON_MAX).all()
}

fn press_while_dead(state: &mut SimulationState, pointer: Option<Vec2>) {
    let LifeState::Dead {
        prompt_shown: true,
        back_button,
        ..
    } = &mut state.life
    else {
        return;
    };
    if back_button.is_some() || state.reset_request.is_some() {
        return;
    }
    if pointer.is_some_and(in_back_button) {
        *back_button = Some(0.0);
        state.events.push(GameEvent::Sound(SoundRequest::new(SoundCue::ButtonDown)));
    } else {
        log::info!("Restart requested");
        state.reset_request = Some(ResetRequest::NewGame);
    }
}

fn update_dead_ui(state: &mut SimulationState, dt: f32) {
    let LifeState::Dead {
        time,
        sign_shown,
        prompt_shown,
        back_button,
    } = &mut state.life
    else {
        return;
    };
    *time += dt;
    if !*sign_shown && *time >= DEAD_SIGN_DELAY {
        *sign_shown = true;
        state.events.push(GameEvent::Sound(SoundRequest::new(SoundCue::FinalScore)));
    }
    if !*prompt_shown && *time >= DEAD_SIGN_DELAY + DEAD_PROMPT_DELAY {
        *prompt_shown = true;
    }
    if let Some(held) = back_button {
        *held += dt;
        if *held >= BUTTON_PRESS_TIME {
            *back_button = None;
            state.events.push(GameEvent::Sound(SoundRequest::new(SoundCue::ButtonUp)));
            log::info!("Back to title requested");
            state.reset_request = Some(ResetRequest::BackToTitle);
        }
    }
}

fn advance_score(state: &mut SimulationState) {
    if !state.playfield.is_started() {
        return;
    }
    let passed = state.playfield.consume_checkpoints(state.bird.aim.end.x);
    for _ in 0..passed {
        state.score += 1;
        let note = (state.score - 1) % SCORE_NOTE_COUNT;
        state.push_sound(SoundRequest::new(SoundCue::Score { note }));
        state.events.push(GameEvent::Scored { score: state.score });
    }
    if passed > 0 {
        state.score_popup = 1.0;
    }
}

fn advance_rotator(state: &mut SimulationState, dt: f32) {
    let Rotator::Angle {
        angle,
        start_angle,
        end_angle,
        time,
        total_time,
    } = &mut state.rotator
    else {
        return;
    };
    *time += dt;
    let k = (*time / *total_time).min(1.0);
    *angle = lerp(*start_angle, *end_angle, ease_in_out_cubic(k));
    if *time >= *total_time {
        state.rotator = Rotator::FromMode;
    }
}

/// Damp the bird's rotation during the camera transition, then wobble
fn compose_final_rotation(state: &mut SimulationState, dt: f32) {
    let damped = Quat::IDENTITY.slerp(state.bird.rot.end, state.camera.follow_weight());
    let wobble = state.bird.advance_wobble(dt);
    state.bird.final_rot.end = (damped * wobble).normalize();
    state.bird.final_rot.fix_sign();
}

/// Nose angle for a vertical speed
fn pitch_target(vz: f32) -> f32 {
    let mut target = (vz * PITCH_PER_VEL).clamp(PITCH_MIN, PITCH_MAX);
    if vz < PITCH_KICK_VEL {
        target -= (PITCH_KICK_VEL - vz) * PITCH_KICK;
    }
    target
}

/// Run the active mode. Returns the mode's orientation for the bird, or
/// `None` to leave it untouched.
fn update_mode(state: &mut SimulationState, jump: bool, ctx: &StepContext) -> Option<Quat> {
    match state.mode {
        Mode::Title { .. } => update_title(state, jump, ctx),
        Mode::Playing { .. } => update_playing(state, jump, ctx),
        Mode::Teleport { .. } => update_teleport(state, ctx),
        Mode::Impact { .. } => update_impact(state, ctx),
        Mode::Recovering { .. } => update_recovering(state, ctx),
        Mode::Blending { .. } => update_blending(state, ctx),
        Mode::Falling {
            sub: FallMode::Animated { .. },
            ..
        } => update_fall_animated(state, ctx),
        Mode::Falling {
            sub: FallMode::Free { .. },
            ..
        } => update_fall_free(state, ctx),
    }
}

fn update_title(state: &mut SimulationState, jump: bool, ctx: &StepContext) -> Option<Quat> {
    let Mode::Title { time } = state.mode else {
        return None;
    };
    if jump {
        log::info!("Game started (seed {})", state.seed);
        state.camera.begin_transition();
        state.playfield.start(state.bird.pos.end.x, &ctx.assets.pipe);
        state.mode = Mode::playing(0.0, ctx.tuning.gravity, TimeDilation::None);
        return update_playing(state, true, ctx);
    }
    let time = time + ctx.dt;
    state.bird.pos.end.z = TITLE_BIRD_Z + (time * TITLE_BOB_SPEED).sin() * TITLE_BOB_HEIGHT;
    state.mode = Mode::Title { time };
    Some(Quat::IDENTITY)
}

fn update_playing(state: &mut SimulationState, jump: bool, ctx: &StepContext) -> Option<Quat> {
    let (dt, tuning) = (ctx.dt, ctx.tuning);
    let Mode::Playing {
        mut gravity,
        mut gravity_vel,
        mut z_vel,
        mut dilation,
    } = state.mode
    else {
        return None;
    };

    let jump = jump || std::mem::take(&mut state.jump_buffered);
    if jump {
        dilation = TimeDilation::None;
        z_vel.end = tuning.jump_velocity;
        gravity = tuning.jump_gravity;
        gravity_vel = 0.0;
    }

    let factor = dilation.factor(tuning);
    dilation.advance(dt, tuning);
    let sdt = dt * factor;

    critically_damp(&mut gravity, &mut gravity_vel, tuning.gravity, tuning.gravity_approach * factor, dt);
    let v0 = z_vel.end;
    let v1 = (v0 - gravity * sdt).max(tuning.terminal_velocity);
    z_vel.end = v1;

    state.bird.pos.end += Vec3::new(tuning.scroll_speed * sdt, 0.0, 0.5 * (v0 + v1) * sdt);
    let vel = Vec3::new(tuning.scroll_speed, 0.0, v1);

    state.mode = Mode::Playing {
        gravity,
        gravity_vel,
        z_vel,
        dilation,
    };

    if jump {
        state.bird.flap_burst = FLAP_BURST_TIME;
        if let Rotator::Angle { angle, .. } = state.rotator {
            state.rotator = Rotator::spin(normalize_angle(angle), 0.0, UNFLIP_TIME);
        }
        state.push_sound(SoundRequest::new(SoundCue::Flap));
        let pos = state.bird.pos.end;
        state.push_puff(pos - Vec3::Z * BIRD_RADIUS, -Vec3::Z, false);
    }

    state.bird.ease_pitch(pitch_target(v1), dt);
    let rot = pitch_rotation(state.bird.pitch.end);

    if let Some((contact, obstacle)) = find_contact(state) {
        on_flight_contact(state, &contact, obstacle, vel, ctx);
    }
    Some(rot)
}

/// Floor first when low enough, then obstacles in order
fn find_contact(state: &SimulationState) -> Option<(CollisionResult, Option<u32>)> {
    let center = state.bird.pos.end;
    if center.z - BIRD_RADIUS <= FLOOR_Z {
        let contact = sphere_floor(center, BIRD_RADIUS, FLOOR_Z);
        return contact.hit().then_some((contact, None));
    }
    state.playfield.obstacles.iter().find_map(|obstacle| {
        let contact = obstacle.collide(center, BIRD_RADIUS);
        contact.hit().then_some((contact, Some(obstacle.id)))
    })
}

fn on_flight_contact(
    state: &mut SimulationState,
    contact: &CollisionResult,
    obstacle: Option<u32>,
    vel: Vec3,
    ctx: &StepContext,
) {
    let center = state.bird.pos.end;

    if let Some(id) = obstacle {
        let entry = state
            .playfield
            .find(id)
            .filter(|o| o.is_teleport_entry(center, vel, contact))
            .map(|o| o.entry_center());
        if let Some((entry, exit)) = entry.zip(state.playfield.eject_point_after(id)) {
            log::debug!("Warp from x={:.1} to x={:.1}", entry.x, exit.x);
            state.mode = Mode::Teleport {
                time: 0.0,
                start_pos: center,
                entry,
                exit,
                did_enter: false,
                did_pop: false,
                did_puff: false,
            };
            return;
        }
    }

    let rise_up = match obstacle.and_then(|id| state.playfield.find(id)) {
        Some(o) => o.opens_up(),
        None => true,
    };
    state.bird.pos.end += contact.normal * (contact.penetration + COLLISION_EPSILON);
    state.bird.aim.end = state.bird.pos.end;
    state.mode = Mode::Impact {
        prev_vel: vel,
        hit: Hit::new(contact, obstacle),
        time: 0.0,
        rise_up,
    };
    state.push_sound(SoundRequest::new(SoundCue::Impact).with_volume(vel.length() / ctx.tuning.jump_velocity));
}

fn update_teleport(state: &mut SimulationState, ctx: &StepContext) -> Option<Quat> {
    let dt = ctx.dt;
    let Mode::Teleport {
        time,
        start_pos,
        entry,
        exit,
        mut did_enter,
        mut did_pop,
        mut did_puff,
    } = state.mode
    else {
        return None;
    };
    let time = time + dt;
    let lag_start = TELEPORT_TIME - TELEPORT_LAG;

    // Camera holds, slides between the mouths, then holds again
    let slide = ease_in_out_cubic((time - TELEPORT_LEAD) / (lag_start - TELEPORT_LEAD));
    state.bird.aim.end = start_pos.lerp(exit, slide);

    let sunk_entry = entry - Vec3::Z * TELEPORT_DIP;
    let sunk_exit = exit - Vec3::Z * TELEPORT_DIP;
    let swirl = |k: f32| {
        let angle = k * 2.0 * TAU;
        Vec3::new(angle.cos(), angle.sin(), 0.0) * TELEPORT_SPIRAL_RADIUS * (k * PI).sin()
    };
    state.bird.pos.end = if time < TELEPORT_LEAD {
        let k = time / TELEPORT_LEAD;
        start_pos.lerp(sunk_entry, k * k) + swirl(k)
    } else if time < lag_start {
        sunk_entry.lerp(sunk_exit, slide)
    } else {
        let k = ((time - lag_start) / TELEPORT_LAG).min(1.0);
        sunk_exit.lerp(exit, 1.0 - (1.0 - k) * (1.0 - k)) + swirl(1.0 - k)
    };

    if !did_enter && time >= TELEPORT_LEAD {
        did_enter = true;
        state.push_sound(SoundRequest::new(SoundCue::EnterPipe));
    }
    if !did_pop && time >= lag_start - TELEPORT_POP_LEAD {
        did_pop = true;
        state.push_sound(SoundRequest::new(SoundCue::ExitPipe));
    }
    if !did_puff && time >= lag_start {
        did_puff = true;
        state.push_puff(exit, Vec3::Z, true);
    }

    let vz = state.bird.pos.delta().z / dt;
    state.bird.ease_pitch(pitch_target(vz), dt);
    let rot = pitch_rotation(state.bird.pitch.end);

    if time >= TELEPORT_TIME {
        state.bird.pos.end = exit;
        state.bird.aim.end = exit;
        state.mode = Mode::playing(ctx.tuning.teleport_exit_velocity, ctx.tuning.jump_gravity, TimeDilation::None);
    } else {
        state.mode = Mode::Teleport {
            time,
            start_pos,
            entry,
            exit,
            did_enter,
            did_pop,
            did_puff,
        };
    }
    Some(rot)
}

fn update_impact(state: &mut SimulationState, ctx: &StepContext) -> Option<Quat> {
    let Mode::Impact {
        prev_vel,
        hit,
        time,
        rise_up,
    } = state.mode
    else {
        return None;
    };
    let time = time + ctx.dt * IMPACT_TIME_SCALE;
    if time < 1.0 {
        state.mode = Mode::Impact {
            prev_vel,
            hit,
            time,
            rise_up,
        };
        return None;
    }

    state.damage += 1;
    if state.damage >= ctx.tuning.damage_to_die {
        die(state, prev_vel, &hit);
        return None;
    }

    log::debug!("Survived impact {}/{}", state.damage, ctx.tuning.damage_to_die);
    state.sweat = SWEAT_TIME;
    let pos = state.bird.pos.end;
    state.push_puff(hit.point, hit.normal, false);

    if state.jump_buffered {
        // Consumed by the first playing step
        state.mode = Mode::playing(0.0, ctx.tuning.gravity, TimeDilation::None);
        return None;
    }

    let side = if rise_up { 1.0 } else { -1.0 };
    let push = Vec3::new(hit.normal.x, 0.0, hit.normal.z).normalize_or(Vec3::Z * side);
    let end = pos + push * RECOVER_PUSH + Vec3::Z * side * RECOVER_RISE;
    let cps = [
        pos,
        pos + push * RECOVER_PUSH * 0.6,
        end - Vec3::X * (RECOVER_FORWARD / 3.0),
        end,
    ];
    state.mode = Mode::Recovering {
        time: 0.0,
        total_time: RECOVER_TIME,
        cps,
        played_sound: false,
    };
    state.rotator = Rotator::spin(0.0, side * TAU, FLIP_TIME);
    None
}

fn die(state: &mut SimulationState, prev_vel: Vec3, hit: &Hit) {
    log::info!("Bird died with score {}", state.score);
    state.life = LifeState::dead();
    state.rotator = Rotator::FromMode;
    state.jump_buffered = false;
    state.events.push(GameEvent::Died { score: state.score });
    if state.bird.pos.end.z > FALL_CUE_MIN_Z {
        state.push_sound(SoundRequest::new(SoundCue::Fall));
    }
    state.mode = Mode::Falling {
        bounce_count: 0,
        prev_bounce_pos: None,
        sub: FallMode::Free { vel: prev_vel },
    };
    // The impact already pushed the bird clear of the surface
    let contact = CollisionResult {
        penetration: 0.0,
        ..hit.contact()
    };
    apply_bounce(state, &contact, prev_vel);
}

/// Run the bounce routine for a falling bird and apply what it decides
fn apply_bounce(state: &mut SimulationState, contact: &CollisionResult, vel: Vec3) {
    let Mode::Falling {
        bounce_count,
        prev_bounce_pos,
        ..
    } = state.mode
    else {
        return;
    };
    let history = BounceHistory {
        count: bounce_count,
        prev_pos: prev_bounce_pos,
    };
    match bounce_response(contact, vel, state.bird.spin, history, &mut state.rng) {
        BounceOutcome::Separating => {}
        BounceOutcome::Roll { vel, push } => {
            state.bird.pos.end += push;
            state.mode = Mode::Falling {
                bounce_count,
                prev_bounce_pos,
                sub: FallMode::Free { vel },
            };
        }
        BounceOutcome::Bounce {
            vel,
            rot_axis,
            animate,
            puff,
            sound,
        } => {
            if let Some(sound) = sound {
                state.push_sound(sound);
            }
            if puff {
                state.push_puff(contact.point, contact.normal, animate);
            }
            state.bird.pos.end += contact.normal * contact.penetration;
            let sub = if animate {
                FallMode::Animated {
                    recoil_dir: Vec3::new(vel.x, vel.y, 0.0).normalize_or(-Vec3::X),
                    start_pos: state.bird.pos.end,
                    frame: 0.0,
                    start_rot: state.bird.rot.end,
                    rot_axis,
                }
            } else {
                state.bird.spin = rot_axis * vel.length();
                FallMode::Free { vel }
            };
            state.mode = Mode::Falling {
                bounce_count: bounce_count + 1,
                prev_bounce_pos: Some(contact.point),
                sub,
            };
        }
    }
}

fn update_recovering(state: &mut SimulationState, ctx: &StepContext) -> Option<Quat> {
    let dt = ctx.dt;
    let Mode::Recovering {
        time,
        total_time,
        cps,
        mut played_sound,
    } = state.mode
    else {
        return None;
    };
    let time = time + dt;
    let t = (time / total_time).min(1.0);
    state.bird.pos.end = cubic_bezier(&cps, hermite_remap(t, RECOVER_START_SLOPE, RECOVER_END_SLOPE));

    if !played_sound && time >= RECOVER_WOBBLE_DELAY {
        played_sound = true;
        state.bird.start_wobble();
        state.push_sound(SoundRequest::new(SoundCue::Wobble));
    }

    let vz = state.bird.pos.delta().z / dt;
    state.bird.ease_pitch(pitch_target(vz), dt);

    state.mode = if time >= total_time {
        // Parameter speed at the end is the remap's end slope over the duration
        let from_vel = cubic_bezier_tangent(&cps, 1.0) * (RECOVER_END_SLOPE / total_time);
        Mode::Blending { from_vel, time: 0.0 }
    } else {
        Mode::Recovering {
            time,
            total_time,
            cps,
            played_sound,
        }
    };
    Some(pitch_rotation(state.bird.pitch.end))
}

fn update_blending(state: &mut SimulationState, ctx: &StepContext) -> Option<Quat> {
    let (dt, tuning) = (ctx.dt, ctx.tuning);
    let Mode::Blending { from_vel, time } = state.mode else {
        return None;
    };
    let time = time + dt;
    let cruise = Vec3::new(tuning.scroll_speed, 0.0, 0.0);
    let vel = from_vel.lerp(cruise, (time / BLEND_TIME).min(1.0));
    state.bird.pos.end += vel * dt;
    state.bird.ease_pitch(pitch_target(vel.z), dt);

    state.mode = if time >= BLEND_TIME {
        Mode::playing(vel.z, tuning.jump_gravity, TimeDilation::Resume { time: 0.0 })
    } else {
        Mode::Blending { from_vel, time }
    };
    Some(pitch_rotation(state.bird.pitch.end))
}

fn update_fall_animated(state: &mut SimulationState, ctx: &StepContext) -> Option<Quat> {
    let dt = ctx.dt;
    let Mode::Falling {
        bounce_count,
        prev_bounce_pos,
        sub: FallMode::Animated {
            recoil_dir,
            start_pos,
            frame,
            start_rot,
            rot_axis,
        },
    } = state.mode
    else {
        return None;
    };
    let assets = ctx.assets;
    let frame = frame + FALL_ANIM_FPS * dt;
    let sample = assets.fall_frame(frame);

    let mut pos = start_pos + recoil_dir * sample.recoil - Vec3::Z * sample.drop;
    pos.z = pos.z.max(FLOOR_Z + BIRD_RADIUS);
    state.bird.pos.end = pos;
    let rot = Quat::from_axis_angle(rot_axis, sample.angle) * start_rot;

    let last = assets.fall_last_frame();
    let sub = if frame >= last {
        let before = assets.fall_frame(last - 1.0);
        state.bird.spin = rot_axis * (sample.angle - before.angle) * FALL_ANIM_FPS;
        FallMode::Free {
            vel: state.bird.pos.delta() / dt,
        }
    } else {
        FallMode::Animated {
            recoil_dir,
            start_pos,
            frame,
            start_rot,
            rot_axis,
        }
    };
    state.mode = Mode::Falling {
        bounce_count,
        prev_bounce_pos,
        sub,
    };
    Some(rot)
}

fn update_fall_free(state: &mut SimulationState, ctx: &StepContext) -> Option<Quat> {
    let dt = ctx.dt;
    let Mode::Falling {
        bounce_count,
        prev_bounce_pos,
        sub: FallMode::Free { vel },
    } = state.mode
    else {
        return None;
    };
    let mut vel = vel;
    vel.z -= FALL_GRAVITY * dt;
    vel *= (1.0 - FALL_DRAG * dt).max(0.0);
    state.bird.pos.end += vel * dt;

    let rot = (Quat::from_scaled_axis(state.bird.spin * dt) * state.bird.rot.end).normalize();
    state.bird.spin *= (-SPIN_DAMPING * dt).exp();

    state.mode = Mode::Falling {
        bounce_count,
        prev_bounce_pos,
        sub: FallMode::Free { vel },
    };
    if let Some((contact, _)) = find_contact(state) {
        apply_bounce(state, &contact, vel);
    }
    Some(rot)
}

/// Demo player: taps to stay above the next gap's bottom and restarts after death
fn autopilot(state: &SimulationState, input: &mut TickInput) {
    match (state.life, state.mode) {
        (LifeState::Dead { prompt_shown, .. }, _) => {
            input.activate = prompt_shown && state.reset_request.is_none();
            input.pointer = None;
        }
        (LifeState::Alive, Mode::Title { time }) => input.activate = time > 1.0,
        (LifeState::Alive, Mode::Playing { z_vel, .. }) => {
            let pos = state.bird.pos.end;
            let floor = match state.playfield.gap_ahead(pos.x - BIRD_RADIUS) {
                Some(gap) if gap.x - pos.x < 6.0 => gap.bottom + BIRD_RADIUS + 0.5,
                Some(gap) => gap.center() - 0.8,
                None => TITLE_BIRD_Z - 1.0,
            };
            input.activate = pos.z < floor && z_vel.end <= 0.0;
        }
        _ => input.activate = false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::collision::ContactZone;

    fn assets() -> AssetTable {
        AssetTable::builtin().unwrap()
    }

    fn step(state: &mut SimulationState, input: TickInput, assets: &AssetTable, tuning: &Tuning) {
        let ctx = StepContext {
            dt: SIM_DT,
            assets,
            tuning,
        };
        tick(state, &input, &ctx);
    }

    fn press() -> TickInput {
        TickInput {
            activate: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_press_on_title_starts_game_with_jump() {
        let (assets, tuning) = (assets(), Tuning::default());
        let mut state = SimulationState::new(1, &assets, &tuning);
        step(&mut state, TickInput::default(), &assets, &tuning);
        step(&mut state, press(), &assets, &tuning);

        assert!(state.playfield.is_started());
        let Mode::Playing { z_vel, .. } = state.mode else {
            panic!("expected playing, got {}", state.mode.name());
        };
        assert!(z_vel.end > 0.0 && z_vel.end < tuning.jump_velocity);
        let events = state.drain_events();
        assert!(events
            .iter()
            .any(|e| matches!(e, GameEvent::Sound(s) if s.cue == SoundCue::Flap)));
    }

    #[test]
    fn test_impact_freezes_then_recovers() {
        let (assets, tuning) = (assets(), Tuning::default());
        let mut state = SimulationState::new_game(2, &assets, &tuning);
        state.bird.pos.reset(Vec3::new(0.0, 0.0, BIRD_RADIUS + 0.01));

        let mut steps = 0;
        while !matches!(state.mode, Mode::Impact { .. }) {
            step(&mut state, TickInput::default(), &assets, &tuning);
            steps += 1;
            assert!(steps < 10);
        }
        let frozen = state.bird.pos.end;
        step(&mut state, TickInput::default(), &assets, &tuning);
        assert_eq!(state.bird.pos.end, frozen);

        let mut steps = 0;
        while matches!(state.mode, Mode::Impact { .. }) {
            step(&mut state, TickInput::default(), &assets, &tuning);
            steps += 1;
        }
        // One unit of impact time at five times real speed
        assert!(steps <= (0.2 / SIM_DT).ceil() as usize + 1);
        assert_eq!(state.damage, 1);
        assert!(matches!(state.mode, Mode::Recovering { .. }));
        assert!(state.rotator.is_flipping());
    }

    #[test]
    fn test_jump_buffered_during_impact_skips_recovery() {
        let (assets, tuning) = (assets(), Tuning::default());
        let mut state = SimulationState::new_game(2, &assets, &tuning);
        state.bird.pos.reset(Vec3::new(0.0, 0.0, BIRD_RADIUS + 0.01));
        while !matches!(state.mode, Mode::Impact { .. }) {
            step(&mut state, TickInput::default(), &assets, &tuning);
        }
        step(&mut state, press(), &assets, &tuning);
        assert!(state.jump_buffered);
        while matches!(state.mode, Mode::Impact { .. }) {
            step(&mut state, TickInput::default(), &assets, &tuning);
        }
        assert!(state.is_playing());
        step(&mut state, TickInput::default(), &assets, &tuning);
        let Mode::Playing { z_vel, .. } = state.mode else {
            panic!("expected playing");
        };
        assert!(z_vel.end > 0.0);
        assert!(!state.jump_buffered);
    }

    #[test]
    fn test_last_impact_kills_and_falls() {
        let (assets, tuning) = (assets(), Tuning::default());
        let mut state = SimulationState::new_game(3, &assets, &tuning);
        state.damage = tuning.damage_to_die - 1;
        state.bird.pos.reset(Vec3::new(0.0, 0.0, 4.0));
        if let Mode::Playing { z_vel, .. } = &mut state.mode {
            z_vel.reset(tuning.terminal_velocity);
        }
        for _ in 0..200 {
            step(&mut state, TickInput::default(), &assets, &tuning);
            if state.life.is_dead() {
                break;
            }
        }
        assert!(state.life.is_dead());
        assert!(matches!(
            state.mode,
            Mode::Falling {
                sub: FallMode::Animated { .. },
                bounce_count: 1,
                ..
            }
        ));
        assert_eq!(state.rotator, Rotator::FromMode);
        let events = state.drain_events();
        assert!(events.iter().any(|e| matches!(e, GameEvent::Died { .. })));
        // Died on the ground: no fall cue
        assert!(!events
            .iter()
            .any(|e| matches!(e, GameEvent::Sound(s) if s.cue == SoundCue::Fall)));
    }

    #[test]
    fn test_fatal_leaving_contact_still_plays_scripted_fall() {
        let (assets, tuning) = (assets(), Tuning::default());
        let mut state = SimulationState::new_game(3, &assets, &tuning);
        state.damage = tuning.damage_to_die - 1;
        let pos = Vec3::new(0.0, 0.0, 3.0);
        state.bird.pos.reset(pos);
        let contact = CollisionResult {
            zone: ContactZone::CapEdge,
            point: pos - Vec3::new(1.0, 0.0, 1.0).normalize() * BIRD_RADIUS,
            normal: Vec3::new(1.0, 0.0, 1.0).normalize(),
            penetration: 0.05,
        };
        state.mode = Mode::Impact {
            prev_vel: Vec3::new(4.0, 0.0, -0.5),
            hit: Hit::new(&contact, None),
            time: 0.999,
            rise_up: true,
        };
        step(&mut state, TickInput::default(), &assets, &tuning);

        assert!(state.life.is_dead());
        assert!(
            matches!(
                state.mode,
                Mode::Falling {
                    sub: FallMode::Animated { .. },
                    bounce_count: 1,
                    ..
                }
            ),
            "got {}",
            state.mode.name()
        );
    }

    #[test]
    fn test_scripted_fall_starts_where_the_impact_left_the_bird() {
        let (assets, tuning) = (assets(), Tuning::default());
        let mut state = SimulationState::new_game(3, &assets, &tuning);
        state.damage = tuning.damage_to_die - 1;
        state.bird.pos.reset(Vec3::new(0.0, 0.0, 2.0));
        if let Mode::Playing { z_vel, .. } = &mut state.mode {
            z_vel.reset(tuning.terminal_velocity);
        }
        while !matches!(state.mode, Mode::Impact { .. }) {
            step(&mut state, TickInput::default(), &assets, &tuning);
        }
        let pushed_out = state.bird.pos.end;
        assert!(pushed_out.z > BIRD_RADIUS);
        while !state.life.is_dead() {
            step(&mut state, TickInput::default(), &assets, &tuning);
        }
        let Mode::Falling {
            sub: FallMode::Animated { start_pos, .. },
            ..
        } = state.mode
        else {
            panic!("expected scripted fall, got {}", state.mode.name());
        };
        assert!(start_pos.distance(pushed_out) < 1e-5);
    }

    #[test]
    fn test_dead_bird_passing_checkpoint_does_not_score() {
        let (assets, tuning) = (assets(), Tuning::default());
        let mut state = SimulationState::new_game(6, &assets, &tuning);
        step(&mut state, TickInput::default(), &assets, &tuning);
        let first = state.playfield.checkpoints[0];

        state.life = LifeState::dead();
        state.mode = Mode::Falling {
            bounce_count: 1,
            prev_bounce_pos: None,
            sub: FallMode::Free { vel: Vec3::ZERO },
        };
        state.bird.pos.reset(Vec3::new(first + 1.0, 10.0, 20.0));
        step(&mut state, TickInput::default(), &assets, &tuning);

        assert_eq!(state.score, 0);
        assert!(!state.drain_events().iter().any(|e| matches!(e, GameEvent::Scored { .. })));
    }

    #[test]
    fn test_dead_prompt_then_restart_request() {
        let (assets, tuning) = (assets(), Tuning::default());
        let mut state = SimulationState::new_game(4, &assets, &tuning);
        state.life = LifeState::dead();
        state.mode = Mode::Falling {
            bounce_count: 0,
            prev_bounce_pos: None,
            sub: FallMode::Free { vel: Vec3::ZERO },
        };
        // Too early: ignored
        step(&mut state, press(), &assets, &tuning);
        assert!(state.reset_request.is_none());

        let wait = ((DEAD_SIGN_DELAY + DEAD_PROMPT_DELAY) / SIM_DT) as usize + 2;
        for _ in 0..wait {
            step(&mut state, TickInput::default(), &assets, &tuning);
        }
        let events = state.drain_events();
        assert!(events
            .iter()
            .any(|e| matches!(e, GameEvent::Sound(s) if s.cue == SoundCue::FinalScore)));

        step(&mut state, press(), &assets, &tuning);
        assert_eq!(state.reset_request, Some(ResetRequest::NewGame));
    }

    #[test]
    fn test_back_button_press_and_release() {
        let (assets, tuning) = (assets(), Tuning::default());
        let mut state = SimulationState::new_game(4, &assets, &tuning);
        state.life = LifeState::Dead {
            time: 5.0,
            sign_shown: true,
            prompt_shown: true,
            back_button: None,
        };
        state.mode = Mode::Falling {
            bounce_count: 0,
            prev_bounce_pos: None,
            sub: FallMode::Free { vel: Vec3::ZERO },
        };
        let on_button = TickInput {
            activate: true,
            pointer: Some((BACK_BUTTON_MIN + BACK_BUTTON_MAX) * 0.5),
            idle_mode: false,
        };
        step(&mut state, on_button, &assets, &tuning);
        assert!(state.reset_request.is_none());
        let events = state.drain_events();
        assert!(events
            .iter()
            .any(|e| matches!(e, GameEvent::Sound(s) if s.cue == SoundCue::ButtonDown)));

        for _ in 0..(BUTTON_PRESS_TIME / SIM_DT) as usize + 2 {
            step(&mut state, TickInput::default(), &assets, &tuning);
        }
        assert_eq!(state.reset_request, Some(ResetRequest::BackToTitle));
    }

    #[test]
    fn test_pitch_target_kicks_when_diving() {
        assert!(pitch_target(-10.0) < (-10.0 * PITCH_PER_VEL));
        assert_eq!(pitch_target(100.0), PITCH_MAX);
    }

    #[test]
    fn test_rotator_unflips_on_jump() {
        let (assets, tuning) = (assets(), Tuning::default());
        let mut state = SimulationState::new_game(5, &assets, &tuning);
        state.rotator = Rotator::spin(0.0, TAU, FLIP_TIME);
        for _ in 0..20 {
            step(&mut state, TickInput::default(), &assets, &tuning);
        }
        step(&mut state, press(), &assets, &tuning);
        let Rotator::Angle { end_angle, total_time, .. } = state.rotator else {
            panic!("expected an unflip");
        };
        assert_eq!(end_angle, 0.0);
        assert_eq!(total_time, UNFLIP_TIME);
    }
}
