//! Usage ledger: one row per synthesis request.
//!
//! The ledger is append-only: the synthesize handler records a row, the
//! usage and profile handlers read them back. Two implementations exist:
//! [`DynamoLedger`] for production and [`MemoryLedger`] for tests and
//! local runs without AWS.

mod dynamo;
mod memory;

use async_trait::async_trait;
use thiserror::Error;

pub use dynamo::DynamoLedger;
pub use memory::MemoryLedger;

/// Usage rows expire after this many days.
pub const RETENTION_DAYS: i64 = 90;

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Errors produced by a usage ledger
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Failed to write usage record: {0}")]
    WriteFailed(String),

    #[error("Failed to query usage records: {0}")]
    QueryFailed(String),
}

/// One synthesis request, as recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageRecord {
    pub user_id: String,
    /// Milliseconds since the Unix epoch
    pub timestamp_ms: i64,
    pub character_count: usize,
    pub voice_id: String,
    pub engine: String,
    pub output_format: String,
    /// Row expiry, seconds since the Unix epoch
    pub expires_at: i64,
}

impl UsageRecord {
    /// Build a record stamped with the current time and the standard
    /// retention window.
    pub fn now(
        user_id: impl Into<String>,
        character_count: usize,
        voice_id: impl Into<String>,
        engine: impl Into<String>,
        output_format: impl Into<String>,
    ) -> Self {
        let now_ms = now_millis();
        Self {
            user_id: user_id.into(),
            timestamp_ms: now_ms,
            character_count,
            voice_id: voice_id.into(),
            engine: engine.into(),
            output_format: output_format.into(),
            expires_at: now_ms / 1000 + RETENTION_DAYS * 24 * 60 * 60,
        }
    }
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Interface over the append-only usage store.
#[async_trait]
pub trait UsageLedger: Send + Sync {
    /// Append one usage row.
    async fn record(&self, record: UsageRecord) -> LedgerResult<()>;

    /// Return the user's rows with `timestamp_ms >= since_ms`, newest
    /// first, capped at `limit` rows when given.
    async fn query(
        &self,
        user_id: &str,
        since_ms: i64,
        limit: Option<usize>,
    ) -> LedgerResult<Vec<UsageRecord>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_carry_the_retention_window() {
        let record = UsageRecord::now("user-1", 42, "Joanna", "neural", "mp3");
        let expected = record.timestamp_ms / 1000 + RETENTION_DAYS * 24 * 60 * 60;
        assert_eq!(record.expires_at, expected);
        assert_eq!(record.character_count, 42);
    }
}
