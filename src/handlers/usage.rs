//! Handler for GET /usage - per-user usage statistics.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};
use crate::middleware::AuthContext;
use crate::state::AppState;
use crate::usage::now_millis;

const DEFAULT_DAYS: i64 = 30;
const DEFAULT_LIMIT: usize = 100;
const RECENT_REQUESTS: usize = 10;

#[derive(Debug, Default, Deserialize)]
pub struct UsageParams {
    pub days: Option<i64>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsagePeriod {
    pub days: i64,
    pub start_time: i64,
    pub end_time: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSummary {
    pub total_requests: usize,
    pub total_characters: usize,
    pub average_characters_per_request: usize,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct VoiceTally {
    pub count: usize,
    pub characters: usize,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentRequest {
    pub timestamp: i64,
    pub character_count: usize,
    pub voice_id: String,
    pub engine: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageResponse {
    pub user_id: String,
    pub period: UsagePeriod,
    pub summary: UsageSummary,
    pub voice_usage: HashMap<String, VoiceTally>,
    pub recent_requests: Vec<RecentRequest>,
}

pub async fn usage_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<UsageParams>,
) -> AppResult<Json<UsageResponse>> {
    let user_id = auth.user_id.clone().ok_or(AppError::Unauthorized)?;

    let days = params.days.unwrap_or(DEFAULT_DAYS).max(0);
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    let end_time = now_millis();
    let start_time = end_time - days * 24 * 60 * 60 * 1000;

    let records = state
        .ledger
        .query(&user_id, start_time, Some(limit))
        .await?;

    let total_requests = records.len();
    let total_characters: usize = records.iter().map(|r| r.character_count).sum();
    let average_characters_per_request = if total_requests > 0 {
        ((total_characters as f64) / (total_requests as f64)).round() as usize
    } else {
        0
    };

    let mut voice_usage: HashMap<String, VoiceTally> = HashMap::new();
    for record in &records {
        let voice = if record.voice_id.is_empty() {
            "unknown".to_string()
        } else {
            record.voice_id.clone()
        };
        let tally = voice_usage.entry(voice).or_default();
        tally.count += 1;
        tally.characters += record.character_count;
    }

    let recent_requests = records
        .iter()
        .take(RECENT_REQUESTS)
        .map(|r| RecentRequest {
            timestamp: r.timestamp_ms,
            character_count: r.character_count,
            voice_id: r.voice_id.clone(),
            engine: r.engine.clone(),
        })
        .collect();

    Ok(Json(UsageResponse {
        user_id,
        period: UsagePeriod {
            days,
            start_time,
            end_time,
        },
        summary: UsageSummary {
            total_requests,
            total_characters,
            average_characters_per_request,
        },
        voice_usage,
        recent_requests,
    }))
}
