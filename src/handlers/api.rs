use axum::Json;
use serde_json::{Value, json};

/// Handler for GET / - health check
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "voxread",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
