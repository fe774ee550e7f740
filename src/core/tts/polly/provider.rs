//! Amazon Polly synthesis backend.
//!
//! Implements [`SpeechSynthesizer`] using Polly's SynthesizeSpeech and
//! DescribeVoices operations via the AWS SDK for Rust. Unlike HTTP-based
//! providers, the SDK handles request signing, credential management, and
//! streaming.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use aws_sdk_polly::Client as PollyClient;
use aws_sdk_polly::primitives::ByteStream;
use aws_sdk_polly::types::{Engine, OutputFormat, VoiceId};
use tracing::{debug, error};

use super::config::{DEFAULT_VOICE_ID, SynthesisTier, TtsOutputFormat};
use crate::core::tts::base::{
    SpeechSynthesizer, SynthesisRequest, SynthesizedSpeech, TtsError, TtsResult, VoiceDescription,
};

/// Defaults applied when a synthesis request leaves a field empty.
#[derive(Debug, Clone)]
pub struct PollySynthesizerConfig {
    pub default_voice_id: String,
    pub default_tier: SynthesisTier,
    pub default_output_format: TtsOutputFormat,
}

impl Default for PollySynthesizerConfig {
    fn default() -> Self {
        Self {
            default_voice_id: DEFAULT_VOICE_ID.to_string(),
            default_tier: SynthesisTier::default(),
            default_output_format: TtsOutputFormat::default(),
        }
    }
}

/// Amazon Polly provider.
pub struct PollySynthesizer {
    client: PollyClient,
    config: PollySynthesizerConfig,
    /// Request counter for logging (atomic for lock-free access)
    request_counter: Arc<AtomicU64>,
}

impl PollySynthesizer {
    /// Create a provider from an already-configured Polly client.
    ///
    /// The client carries region and credentials; see `AppState::new` for
    /// how the shared AWS config is assembled.
    pub fn new(client: PollyClient, config: PollySynthesizerConfig) -> Self {
        Self {
            client,
            config,
            request_counter: Arc::new(AtomicU64::new(0)),
        }
    }

    fn effective_voice<'a>(&'a self, requested: &'a str) -> &'a str {
        if requested.is_empty() {
            &self.config.default_voice_id
        } else {
            requested
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for PollySynthesizer {
    async fn synthesize(&self, request: SynthesisRequest) -> TtsResult<SynthesizedSpeech> {
        let voice = self.effective_voice(&request.voice_id).to_string();
        let tier = if request.engine.is_empty() {
            self.config.default_tier
        } else {
            SynthesisTier::from_str_or_default(&request.engine)
        };
        let format = if request.output_format.is_empty() {
            self.config.default_output_format
        } else {
            TtsOutputFormat::from_str_or_default(&request.output_format)
        };

        let request_id = self.request_counter.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(
            request_id,
            text_len = request.text.len(),
            voice = %voice,
            engine = %tier,
            "Synthesizing text with Amazon Polly"
        );

        let response = self
            .client
            .synthesize_speech()
            .text(&request.text)
            .voice_id(VoiceId::from(voice.as_str()))
            .engine(Engine::from(tier.as_str()))
            .output_format(OutputFormat::from(format.as_str()))
            .send()
            .await
            .map_err(|e| {
                error!(request_id, error = %e, "Polly API error");
                TtsError::ProviderError(format!("Polly API error: {e}"))
            })?;

        let content_type = response
            .content_type
            .clone()
            .unwrap_or_else(|| format.mime_type().to_string());

        let audio_stream: ByteStream = response.audio_stream;
        let audio = audio_stream
            .collect()
            .await
            .map_err(|e| {
                error!(request_id, error = %e, "Failed to read audio stream");
                TtsError::AudioGenerationFailed(format!("Failed to read audio stream: {e}"))
            })?
            .into_bytes();

        debug!(request_id, audio_bytes = audio.len(), "Successfully synthesized audio");

        Ok(SynthesizedSpeech {
            audio,
            content_type,
        })
    }

    async fn describe_voices(&self) -> TtsResult<Vec<VoiceDescription>> {
        let response = self.client.describe_voices().send().await.map_err(|e| {
            error!(error = %e, "Polly DescribeVoices error");
            TtsError::ProviderError(format!("Polly API error: {e}"))
        })?;

        let voices = response
            .voices()
            .iter()
            .filter_map(|voice| {
                let id = voice.id()?.as_str().to_string();
                Some(VoiceDescription {
                    name: voice.name().unwrap_or(id.as_str()).to_string(),
                    gender: voice
                        .gender()
                        .map(|g| g.as_str().to_string())
                        .unwrap_or_else(|| "Unknown".to_string()),
                    engine: voice
                        .supported_engines()
                        .iter()
                        .map(|e| e.as_str().to_string())
                        .collect(),
                    language_code: voice
                        .language_code()
                        .map(|c| c.as_str().to_string())
                        .unwrap_or_default(),
                    language_name: voice.language_name().unwrap_or_default().to_string(),
                    id,
                })
            })
            .collect();

        Ok(voices)
    }
}
