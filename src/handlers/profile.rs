//! Handler for GET /profile - user identity plus a usage snapshot.

use std::sync::Arc;

use axum::{Extension, Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};
use crate::middleware::AuthContext;
use crate::state::AppState;
use crate::usage::now_millis;

const PROFILE_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowTotals {
    pub total_requests: usize,
    pub total_characters: usize,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUsage {
    pub last30_days: WindowTotals,
    pub first_usage: Option<i64>,
    pub last_usage: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub user_id: String,
    pub email: Option<String>,
    pub usage: ProfileUsage,
}

pub async fn profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
) -> AppResult<Json<ProfileResponse>> {
    let user_id = auth.user_id.clone().ok_or(AppError::Unauthorized)?;

    let start_time = now_millis() - PROFILE_WINDOW_DAYS * 24 * 60 * 60 * 1000;
    let records = state.ledger.query(&user_id, start_time, None).await?;

    let total_requests = records.len();
    let total_characters: usize = records.iter().map(|r| r.character_count).sum();
    let first_usage = records.iter().map(|r| r.timestamp_ms).min();
    let last_usage = records.iter().map(|r| r.timestamp_ms).max();

    Ok(Json(ProfileResponse {
        user_id,
        email: auth.email.clone(),
        usage: ProfileUsage {
            last30_days: WindowTotals {
                total_requests,
                total_characters,
            },
            first_usage,
            last_usage,
        },
    }))
}
