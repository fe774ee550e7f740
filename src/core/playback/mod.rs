//! Playback core: the dual-backend reading coordinator.
//!
//! Two pieces cooperate here:
//! - [`engine`]: the playback engine adapter, one control surface over a
//!   single audio handle, whatever produced it.
//! - [`controller`]: the session state machine that picks a backend per
//!   play gesture, fetches remote audio, tracks progress, and persists
//!   user preferences.
//!
//! [`local`] provides on-device synthesis (the no-network fallback) and
//! [`prefs`] the durable preference store.

pub mod controller;
pub mod engine;
pub mod local;
pub mod prefs;

use bytes::Bytes;

pub use controller::{
    ReaderSession, SessionEvent, SessionState, VoiceOption, VoiceTier, expand_voice_options,
};
pub use engine::{EngineCallback, PlaybackEngine, SinkEngine};
pub use local::{EspeakSynthesizer, LocalSpeechError, LocalSynthesis};
pub use prefs::{EngineChoice, PrefStore, Preferences};

/// Which synthesis path produced the audio for the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// On-device synthesis, no network call
    Local,
    /// Cloud synthesis via the gateway
    Remote,
}

/// Decoded-audio transient resource: one synthesis output, ready to play.
///
/// The engine takes ownership of the clip on `load` and releases it on
/// `stop` or when a new clip supersedes it.
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub bytes: Bytes,
    pub content_type: String,
}

impl AudioClip {
    pub fn new(bytes: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: content_type.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Duration estimate used until the audio handle reports a real duration:
/// roughly 0.4 seconds per word, scaled by the playback rate.
pub fn estimated_duration_secs(text: &str, rate: f32) -> f32 {
    let words = text.split_whitespace().count();
    (words as f32 * 0.4) / rate.max(0.1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_scales_with_rate() {
        let text = "one two three four five six seven eight nine ten";
        let normal = estimated_duration_secs(text, 1.0);
        assert!((normal - 4.0).abs() < 1e-6);

        let double = estimated_duration_secs(text, 2.0);
        assert!((double - 2.0).abs() < 1e-6);
    }

    #[test]
    fn estimate_of_empty_text_is_zero() {
        assert_eq!(estimated_duration_secs("", 1.0), 0.0);
    }
}
