//! Sound cues requested by the simulation
//!
//! The core never plays audio; it emits `SoundRequest`s and the host maps
//! each cue name onto whatever playback it has.

use serde::{Deserialize, Serialize};

/// Sound cue types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoundCue {
    /// Player tapped / bird flapped
    Flap,
    /// Bird bounced off something while falling
    Bounce,
    /// Bird hit a pipe or the floor
    Impact,
    /// Bird dove into a warp pipe
    EnterPipe,
    /// Bird popped out of the exit pipe
    ExitPipe,
    /// Dazed wobble during recovery
    Wobble,
    /// Passed a checkpoint; index selects the note
    Score { note: u32 },
    /// Start of the death fall
    Fall,
    /// Final score sign appears
    FinalScore,
    ButtonDown,
    ButtonUp,
}

impl SoundCue {
    /// Stable identifier for host-side lookup
    pub fn name(&self) -> &'static str {
        match self {
            SoundCue::Flap => "flap",
            SoundCue::Bounce => "bounce",
            SoundCue::Impact => "impact",
            SoundCue::EnterPipe => "enter_pipe",
            SoundCue::ExitPipe => "exit_pipe",
            SoundCue::Wobble => "wobble",
            SoundCue::Score { .. } => "score",
            SoundCue::Fall => "fall",
            SoundCue::FinalScore => "final_score",
            SoundCue::ButtonDown => "button_down",
            SoundCue::ButtonUp => "button_up",
        }
    }
}

/// A fire-and-forget request to play a cue
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoundRequest {
    pub cue: SoundCue,
    /// 0.0 - 1.0
    pub volume: f32,
    /// Playback rate multiplier (1.0 = authored pitch)
    pub pitch: f32,
}

impl SoundRequest {
    pub fn new(cue: SoundCue) -> Self {
        Self {
            cue,
            volume: 1.0,
            pitch: 1.0,
        }
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume.clamp(0.0, 1.0);
        self
    }

    pub fn with_pitch(mut self, pitch: f32) -> Self {
        self.pitch = pitch;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_cue_name_ignores_note() {
        assert_eq!(SoundCue::Score { note: 0 }.name(), SoundCue::Score { note: 7 }.name());
    }

    #[test]
    fn test_volume_clamped() {
        let req = SoundRequest::new(SoundCue::Bounce).with_volume(3.0);
        assert_eq!(req.volume, 1.0);
    }
}
