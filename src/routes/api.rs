use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers::{profile, synthesize, usage, voices};
use crate::state::AppState;
use std::sync::Arc;

/// Create the API router with protected routes
///
/// Note: Authentication middleware is applied in main.rs after state is
/// available.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tts/synthesize", post(synthesize::synthesize_handler))
        .route("/tts/voices", get(voices::list_voices))
        .route("/usage", get(usage::usage_handler))
        .route("/profile", get(profile::profile_handler))
        .layer(TraceLayer::new_for_http())
}
