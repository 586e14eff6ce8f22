//! Flapsim headless runner
//!
//! Plays the built-in autopilot for a while at a fixed 60 Hz frame rate and
//! reports what happened.
//!
//! Usage: `flapsim [seed] [seconds] [tuning.json]`

use std::collections::BTreeMap;
use std::error::Error;

use flapsim::sim::GameEvent;
use flapsim::{AssetTable, Session, Tuning};

const FRAME_DT: f32 = 1.0 / 60.0;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    log::info!("Flapsim (headless) starting...");

    let mut args = std::env::args().skip(1);
    let seed = args.next().map(|s| s.parse::<u64>()).transpose()?.unwrap_or(1);
    let seconds = args.next().map(|s| s.parse::<f32>()).transpose()?.unwrap_or(60.0);
    let tuning = match args.next() {
        Some(path) => Tuning::load(path)?,
        None => Tuning::default(),
    };
    let assets = AssetTable::builtin()?;

    let mut session = Session::new(seed, assets, tuning);
    session.set_idle_mode(true);

    let frames = (seconds / FRAME_DT).ceil() as u64;
    let mut cues: BTreeMap<&'static str, u32> = BTreeMap::new();
    let mut puffs = 0;
    let mut runs = Vec::new();
    for _ in 0..frames {
        session.update(FRAME_DT);
        for event in session.drain_events() {
            match event {
                GameEvent::Sound(request) => *cues.entry(request.cue.name()).or_default() += 1,
                GameEvent::Puff(_) => puffs += 1,
                GameEvent::Died { score } => runs.push(score),
                GameEvent::TitleDismissed | GameEvent::Scored { .. } => {}
            }
        }
    }

    let state = session.state();
    println!("Simulated {:.1}s with seed {}", seconds, seed);
    println!("Finished runs: {} {:?}", runs.len(), runs);
    println!(
        "Current run: score {}, damage {}, mode {}",
        state.score,
        state.damage,
        state.mode.name()
    );
    println!("Particle puffs: {}", puffs);
    for (cue, count) in &cues {
        println!("  {:<12} {}", cue, count);
    }
    if let Some(best) = session.high_scores.top_score() {
        println!("Best score: {}", best);
    }
    Ok(())
}
