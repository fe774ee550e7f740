//! On-device speech synthesis, the no-network fallback backend.
//!
//! Shells out to `espeak-ng`, which writes a WAV stream to stdout. The
//! playback rate is baked into the synthesis (words-per-minute), so clips
//! from this backend are loaded into the engine at rate 1.0.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::AudioClip;

/// espeak-ng's default speaking rate, words per minute.
const BASE_WORDS_PER_MINUTE: f32 = 175.0;

/// Bounds accepted by espeak-ng's `-s` flag.
const MIN_WPM: u32 = 80;
const MAX_WPM: u32 = 450;

#[derive(Error, Debug)]
pub enum LocalSpeechError {
    #[error("Failed to run speech synthesizer: {0}")]
    SpawnFailed(String),

    #[error("Speech synthesizer exited with status {0}")]
    SynthesisFailed(i32),

    #[error("Speech synthesizer produced no audio")]
    EmptyOutput,
}

/// Interface over on-device synthesis.
#[async_trait]
pub trait LocalSynthesis: Send + Sync {
    /// Synthesize `text` at the given playback rate, returning a WAV clip.
    async fn synthesize(&self, text: &str, rate: f32) -> Result<AudioClip, LocalSpeechError>;
}

/// espeak-ng subprocess synthesizer.
pub struct EspeakSynthesizer {
    binary: String,
}

impl EspeakSynthesizer {
    pub fn new() -> Self {
        Self {
            binary: "espeak-ng".to_string(),
        }
    }

    /// Use a different espeak-compatible binary (e.g. plain `espeak`).
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn words_per_minute(rate: f32) -> u32 {
        ((BASE_WORDS_PER_MINUTE * rate).round() as u32).clamp(MIN_WPM, MAX_WPM)
    }
}

impl Default for EspeakSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LocalSynthesis for EspeakSynthesizer {
    async fn synthesize(&self, text: &str, rate: f32) -> Result<AudioClip, LocalSpeechError> {
        let wpm = Self::words_per_minute(rate);
        debug!(wpm, text_len = text.len(), "Synthesizing speech locally");

        let mut child = Command::new(&self.binary)
            .arg("--stdout")
            .arg("-s")
            .arg(wpm.to_string())
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .spawn()
            .map_err(|e| LocalSpeechError::SpawnFailed(e.to_string()))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .await
                .map_err(|e| LocalSpeechError::SpawnFailed(e.to_string()))?;
            // Close stdin so espeak sees EOF and starts synthesizing.
            drop(stdin);
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| LocalSpeechError::SpawnFailed(e.to_string()))?;

        if !output.status.success() {
            return Err(LocalSpeechError::SynthesisFailed(
                output.status.code().unwrap_or(-1),
            ));
        }
        if output.stdout.is_empty() {
            return Err(LocalSpeechError::EmptyOutput);
        }

        Ok(AudioClip::new(Bytes::from(output.stdout), "audio/wav"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words_per_minute_scales_and_clamps() {
        assert_eq!(EspeakSynthesizer::words_per_minute(1.0), 175);
        assert_eq!(EspeakSynthesizer::words_per_minute(2.0), 350);
        assert_eq!(EspeakSynthesizer::words_per_minute(0.1), MIN_WPM);
        assert_eq!(EspeakSynthesizer::words_per_minute(4.0), MAX_WPM);
    }
}
