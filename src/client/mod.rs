//! HTTP client for the gateway's synthesis API, plus the token seam.
//!
//! The session controller talks to the gateway through the [`SpeechApi`]
//! trait and obtains bearer tokens through [`TokenProvider`], so both can
//! be substituted in tests.

use async_trait::async_trait;
use base64::Engine as _;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::playback::AudioClip;
use crate::core::tts::VoiceDescription;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Non-2xx response; the body is surfaced verbatim.
    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Invalid response: {0}")]
    Decode(String),
}

/// Parameters for one synthesis call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeakRequest {
    pub text: String,
    pub voice_id: String,
    pub engine: String,
    pub output_format: String,
    /// Client playback rate; informational for the gateway.
    pub speed: f32,
}

/// Asynchronous bearer-token source. `None` means no session, so the
/// remote backend is unavailable right now.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn token(&self) -> Option<String>;
}

/// Token provider backed by a fixed token (environment or CLI flag).
pub struct StaticTokenProvider {
    token: Option<String>,
}

impl StaticTokenProvider {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn token(&self) -> Option<String> {
        self.token.clone()
    }
}

/// The gateway operations the playback controller needs.
#[async_trait]
pub trait SpeechApi: Send + Sync {
    /// Request synthesis and return the decoded audio clip.
    async fn synthesize(&self, request: &SpeakRequest, token: &str) -> Result<AudioClip, ApiError>;

    /// Fetch the remote voice catalog.
    async fn voices(&self, token: &str) -> Result<Vec<VoiceDescription>, ApiError>;
}

// =============================================================================
// Gateway HTTP client
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeBody {
    audio_content: String,
    content_type: Option<String>,
    #[allow(dead_code)]
    character_count: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct VoicesBody {
    voices: Vec<VoiceDescription>,
}

/// reqwest-based [`SpeechApi`] implementation.
pub struct GatewayClient {
    http: reqwest::Client,
    base_url: String,
}

impl GatewayClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn error_for_status(response: reqwest::Response) -> ApiError {
        let status = response.status().as_u16();
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        ApiError::Status { status, message }
    }

    /// Fetch the caller's usage summary. Used by the CLI, passed through
    /// as-is.
    pub async fn usage(&self, token: &str, days: i64) -> Result<serde_json::Value, ApiError> {
        let response = self
            .http
            .get(self.url("/usage"))
            .query(&[("days", days)])
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_for_status(response).await);
        }
        response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[async_trait]
impl SpeechApi for GatewayClient {
    async fn synthesize(&self, request: &SpeakRequest, token: &str) -> Result<AudioClip, ApiError> {
        let response = self
            .http
            .post(self.url("/tts/synthesize"))
            .bearer_auth(token)
            .json(request)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_for_status(response).await);
        }

        let body: SynthesizeBody = response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(&body.audio_content)
            .map_err(|e| ApiError::Decode(format!("Invalid base64 audio: {e}")))?;

        Ok(AudioClip::new(
            Bytes::from(bytes),
            body.content_type
                .unwrap_or_else(|| "audio/mpeg".to_string()),
        ))
    }

    async fn voices(&self, token: &str) -> Result<Vec<VoiceDescription>, ApiError> {
        let response = self
            .http
            .get(self.url("/tts/voices"))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_for_status(response).await);
        }

        let body: VoicesBody = response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(body.voices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        let client = GatewayClient::new("http://localhost:8080/");
        assert_eq!(client.url("/tts/voices"), "http://localhost:8080/tts/voices");
    }

    #[test]
    fn speak_request_serializes_camel_case() {
        let request = SpeakRequest {
            text: "hello".to_string(),
            voice_id: "Ruth".to_string(),
            engine: "generative".to_string(),
            output_format: "mp3".to_string(),
            speed: 1.5,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"voiceId\":\"Ruth\""));
        assert!(json.contains("\"outputFormat\":\"mp3\""));
    }

    #[tokio::test]
    async fn static_provider_returns_its_token() {
        let provider = StaticTokenProvider::new(Some("abc".to_string()));
        assert_eq!(provider.token().await.as_deref(), Some("abc"));

        let empty = StaticTokenProvider::new(None);
        assert!(empty.token().await.is_none());
    }
}
