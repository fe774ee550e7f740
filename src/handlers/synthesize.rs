//! Handler for POST /tts/synthesize - synthesize text and track usage.

use std::sync::Arc;

use axum::{Extension, Json, extract::State};
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::tts::SynthesisRequest;
use crate::errors::{AppError, AppResult};
use crate::middleware::AuthContext;
use crate::state::AppState;
use crate::usage::UsageRecord;

/// Maximum accepted text length, in characters.
pub const MAX_TEXT_LENGTH: usize = 100_000;

fn default_voice() -> String {
    "Joanna".to_string()
}

fn default_engine() -> String {
    "neural".to_string()
}

fn default_output_format() -> String {
    "mp3".to_string()
}

/// Request body for the synthesis endpoint.
///
/// Unknown fields (e.g. a client-side playback `speed`) are ignored;
/// playback rate is applied by the client, not baked into the audio.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesizeRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default = "default_voice")]
    pub voice_id: String,
    #[serde(default = "default_engine")]
    pub engine: String,
    #[serde(default = "default_output_format")]
    pub output_format: String,
}

/// Response body: base64 audio plus the request echo.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesizeResponse {
    pub audio_content: String,
    pub content_type: String,
    pub character_count: usize,
    pub voice_id: String,
    pub engine: String,
}

pub async fn synthesize_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<SynthesizeRequest>,
) -> AppResult<Json<SynthesizeResponse>> {
    // Validate before any provider call
    if request.text.trim().is_empty() {
        return Err(AppError::Validation(
            "Text is required and must be a non-empty string".to_string(),
        ));
    }
    if request.text.len() > MAX_TEXT_LENGTH {
        return Err(AppError::Validation(
            "Text is too long. Maximum 100,000 characters allowed.".to_string(),
        ));
    }

    let character_count = request.text.len();
    let speech = state
        .synthesizer
        .synthesize(SynthesisRequest {
            text: request.text,
            voice_id: request.voice_id.clone(),
            engine: request.engine.clone(),
            output_format: request.output_format.clone(),
        })
        .await?;

    // Track usage. The audio is already synthesized at this point, so a
    // ledger failure is logged rather than turned into a client error.
    let user_id = auth.user_id.clone().unwrap_or_else(|| "unknown".to_string());
    let record = UsageRecord::now(
        user_id,
        character_count,
        request.voice_id.clone(),
        request.engine.clone(),
        request.output_format.clone(),
    );
    if let Err(e) = state.ledger.record(record).await {
        warn!(error = %e, "Failed to record usage row");
    }

    let audio_content = base64::engine::general_purpose::STANDARD.encode(&speech.audio);

    Ok(Json(SynthesizeResponse {
        audio_content,
        content_type: speech.content_type,
        character_count,
        voice_id: request.voice_id,
        engine: request.engine,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_defaults_are_applied() {
        let request: SynthesizeRequest = serde_json::from_str(r#"{"text": "hello"}"#).unwrap();
        assert_eq!(request.voice_id, "Joanna");
        assert_eq!(request.engine, "neural");
        assert_eq!(request.output_format, "mp3");
    }

    #[test]
    fn unknown_fields_are_tolerated() {
        let request: SynthesizeRequest =
            serde_json::from_str(r#"{"text": "hello", "voiceId": "Ruth", "speed": 1.5}"#).unwrap();
        assert_eq!(request.voice_id, "Ruth");
    }

    #[test]
    fn response_serializes_camel_case() {
        let response = SynthesizeResponse {
            audio_content: "QUJD".to_string(),
            content_type: "audio/mpeg".to_string(),
            character_count: 5,
            voice_id: "Joanna".to_string(),
            engine: "neural".to_string(),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"audioContent\":\"QUJD\""));
        assert!(json.contains("\"characterCount\":5"));
    }
}
