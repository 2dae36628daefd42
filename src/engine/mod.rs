//! Speech engine seam.
//!
//! The playback controller never talks to a synthesizer directly. It hands
//! [`Utterance`]s to a [`SpeechEngine`] and receives [`EngineEvent`]s back as
//! plain messages, so engines can run on worker threads while the controller
//! stays single-threaded, and tests can script events by hand.
//!
//! Engines are constructed with an `mpsc::Sender<EngineEvent>`; every request
//! produces zero or more progress events followed by exactly one terminal
//! event, unless it is cancelled first.

pub mod console;
#[cfg(feature = "piper")]
pub mod piper;
#[cfg(test)]
pub(crate) mod scripted;

use crate::error::PlaybackError;
use serde::{Deserialize, Serialize};

pub use console::ConsoleEngine;
#[cfg(feature = "piper")]
pub use piper::PiperEngine;

pub type RequestId = u64;

pub const MIN_RATE: f32 = 0.1;
pub const MAX_RATE: f32 = 10.0;
pub const MIN_PITCH: f32 = 0.0;
pub const MAX_PITCH: f32 = 2.0;
pub const MIN_VOLUME: f32 = 0.0;
pub const MAX_VOLUME: f32 = 1.0;

/// Voice knobs passed straight through to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceSettings {
    /// Engine-specific voice identifier; `None` means the engine default.
    pub voice: Option<String>,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            voice: None,
            rate: 1.0,
            pitch: 1.0,
            volume: 1.0,
        }
    }
}

impl VoiceSettings {
    /// Reject non-finite or out-of-range knobs.
    pub fn validate(&self) -> Result<(), PlaybackError> {
        check_range("rate", self.rate, MIN_RATE, MAX_RATE)?;
        check_range("pitch", self.pitch, MIN_PITCH, MAX_PITCH)?;
        check_range("volume", self.volume, MIN_VOLUME, MAX_VOLUME)
    }

    /// Pull every knob back into range. Non-finite values fall back to the
    /// default.
    pub fn clamped(self) -> Self {
        let defaults = Self::default();
        Self {
            voice: self.voice.filter(|voice| !voice.trim().is_empty()),
            rate: clamp_or(self.rate, MIN_RATE, MAX_RATE, defaults.rate),
            pitch: clamp_or(self.pitch, MIN_PITCH, MAX_PITCH, defaults.pitch),
            volume: clamp_or(self.volume, MIN_VOLUME, MAX_VOLUME, defaults.volume),
        }
    }
}

fn check_range(name: &str, value: f32, min: f32, max: f32) -> Result<(), PlaybackError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(PlaybackError::Configuration(format!(
            "{name} must be within {min}..={max}, got {value}"
        )))
    }
}

fn clamp_or(value: f32, min: f32, max: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        fallback
    }
}

/// One speech request.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub request_id: RequestId,
    /// Index of the segment this text belongs to.
    pub segment: usize,
    pub text: String,
    pub voice: VoiceSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEventKind {
    /// Char offset reached within the utterance text.
    Progress { char_offset: usize },
    Finished,
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineEvent {
    pub request_id: RequestId,
    pub kind: EngineEventKind,
}

impl EngineEvent {
    pub fn progress(request_id: RequestId, char_offset: usize) -> Self {
        Self {
            request_id,
            kind: EngineEventKind::Progress { char_offset },
        }
    }

    pub fn finished(request_id: RequestId) -> Self {
        Self {
            request_id,
            kind: EngineEventKind::Finished,
        }
    }

    pub fn failed(request_id: RequestId, message: impl Into<String>) -> Self {
        Self {
            request_id,
            kind: EngineEventKind::Failed {
                message: message.into(),
            },
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self.kind, EngineEventKind::Progress { .. })
    }
}

/// A narration backend.
///
/// At most one request is outstanding: `speak` implicitly cancels whatever
/// was playing before, and a cancelled request emits no further events.
pub trait SpeechEngine {
    /// Start narrating `utterance` asynchronously.
    fn speak(&mut self, utterance: Utterance) -> anyhow::Result<()>;

    /// Suspend the current request without discarding it.
    fn pause(&mut self);

    /// Continue a suspended request where it stopped.
    fn resume(&mut self);

    /// Drop the current request, if any.
    fn cancel(&mut self);

    /// Whether `pause`/`resume` truly suspend. Engines that can only cancel
    /// return `false` and the controller re-issues the unspoken remainder.
    fn supports_suspend(&self) -> bool {
        true
    }
}

impl<E: SpeechEngine + ?Sized> SpeechEngine for Box<E> {
    fn speak(&mut self, utterance: Utterance) -> anyhow::Result<()> {
        (**self).speak(utterance)
    }

    fn pause(&mut self) {
        (**self).pause()
    }

    fn resume(&mut self) {
        (**self).resume()
    }

    fn cancel(&mut self) {
        (**self).cancel()
    }

    fn supports_suspend(&self) -> bool {
        (**self).supports_suspend()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_voice_is_valid() {
        assert!(VoiceSettings::default().validate().is_ok());
    }

    #[test]
    fn out_of_range_knobs_are_rejected() {
        let voice = VoiceSettings {
            rate: 25.0,
            ..VoiceSettings::default()
        };
        assert!(matches!(
            voice.validate(),
            Err(PlaybackError::Configuration(_))
        ));

        let voice = VoiceSettings {
            pitch: f32::NAN,
            ..VoiceSettings::default()
        };
        assert!(voice.validate().is_err());
    }

    #[test]
    fn clamping_pulls_knobs_into_range() {
        let voice = VoiceSettings {
            voice: Some("  ".to_string()),
            rate: 0.0,
            pitch: 9.0,
            volume: f32::INFINITY,
        }
        .clamped();
        assert_eq!(voice.voice, None);
        assert_eq!(voice.rate, MIN_RATE);
        assert_eq!(voice.pitch, MAX_PITCH);
        assert_eq!(voice.volume, 1.0);
        assert!(voice.validate().is_ok());
    }

    #[test]
    fn only_progress_is_non_terminal() {
        assert!(!EngineEvent::progress(1, 4).is_terminal());
        assert!(EngineEvent::finished(1).is_terminal());
        assert!(EngineEvent::failed(1, "boom").is_terminal());
    }
}
