//! Handler for GET /tts/voices - list available synthesis voices.

use std::sync::Arc;

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::core::tts::VoiceDescription;
use crate::errors::AppResult;
use crate::state::AppState;

const VOICE_CACHE_KEY: &str = "voices";

#[derive(Debug, Serialize, Deserialize)]
pub struct VoicesResponse {
    pub voices: Vec<VoiceDescription>,
}

/// Returns the provider's voice catalog, sorted by display name.
///
/// The catalog is served from cache once fetched; the provider is only
/// asked again after the cache TTL lapses.
pub async fn list_voices(State(state): State<Arc<AppState>>) -> AppResult<Json<VoicesResponse>> {
    if let Some(cached) = state.voice_cache.get(VOICE_CACHE_KEY).await {
        return Ok(Json(VoicesResponse {
            voices: cached.as_ref().clone(),
        }));
    }

    let mut voices = state.synthesizer.describe_voices().await?;
    voices.sort_by(|a, b| a.name.cmp(&b.name));

    let voices = Arc::new(voices);
    state
        .voice_cache
        .insert(VOICE_CACHE_KEY.to_string(), Arc::clone(&voices))
        .await;

    Ok(Json(VoicesResponse {
        voices: voices.as_ref().clone(),
    }))
}
