//! Base types for speech synthesis providers.
//!
//! The gateway talks to its synthesis backend through the
//! [`SpeechSynthesizer`] trait so handlers can be exercised against a
//! stub provider in tests.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for synthesis operations
pub type TtsResult<T> = Result<T, TtsError>;

/// Errors produced by a synthesis provider
#[derive(Error, Debug)]
pub enum TtsError {
    /// Configuration is invalid or incomplete
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The provider API returned an error
    #[error("Provider error: {0}")]
    ProviderError(String),

    /// Audio generation failed after the request was accepted
    #[error("Audio generation failed: {0}")]
    AudioGenerationFailed(String),
}

/// A synthesis request passed to the provider.
///
/// Fields mirror the gateway's `/tts/synthesize` body after defaults have
/// been applied; validation (non-empty text, length limit) happens in the
/// handler before a request is built.
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    pub text: String,
    pub voice_id: String,
    pub engine: String,
    pub output_format: String,
}

/// Synthesized audio returned by a provider.
#[derive(Debug, Clone)]
pub struct SynthesizedSpeech {
    /// Encoded audio bytes in the requested output format
    pub audio: Bytes,
    /// MIME type of the audio, e.g. `audio/mpeg`
    pub content_type: String,
}

/// One voice offered by the remote service.
///
/// Serialized camelCase: this is the wire shape of the `/tts/voices`
/// response entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceDescription {
    /// Voice identity, e.g. "Joanna"
    pub id: String,
    /// Display name
    pub name: String,
    /// Gender tag as reported by the provider
    pub gender: String,
    /// Engines (rendering tiers) this voice supports
    pub engine: Vec<String>,
    /// BCP-47 style language code, e.g. "en-US"
    pub language_code: String,
    /// Human-readable language name, e.g. "US English"
    pub language_name: String,
}

/// Interface implemented by synthesis backends.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize the given text, returning encoded audio.
    async fn synthesize(&self, request: SynthesisRequest) -> TtsResult<SynthesizedSpeech>;

    /// Describe the voices this backend offers.
    async fn describe_voices(&self) -> TtsResult<Vec<VoiceDescription>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voice_description_serializes_camel_case() {
        let voice = VoiceDescription {
            id: "Joanna".to_string(),
            name: "Joanna".to_string(),
            gender: "Female".to_string(),
            engine: vec!["neural".to_string(), "standard".to_string()],
            language_code: "en-US".to_string(),
            language_name: "US English".to_string(),
        };

        let json = serde_json::to_string(&voice).unwrap();
        assert!(json.contains("\"languageCode\":\"en-US\""));
        assert!(json.contains("\"languageName\":\"US English\""));
        assert!(json.contains("\"engine\":[\"neural\",\"standard\"]"));
    }
}
