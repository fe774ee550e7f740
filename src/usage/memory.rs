//! In-memory usage ledger for tests and table-less local runs.

use async_trait::async_trait;
use dashmap::DashMap;

use super::{LedgerResult, UsageLedger, UsageRecord};

/// Usage ledger backed by a concurrent in-process map.
///
/// Rows are kept per user in insertion order; queries sort newest first
/// the same way the DynamoDB implementation does. Expiry is honored at
/// query time rather than by a background sweeper.
#[derive(Default)]
pub struct MemoryLedger {
    rows: DashMap<String, Vec<UsageRecord>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of rows across all users. Test helper.
    pub fn len(&self) -> usize {
        self.rows.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl UsageLedger for MemoryLedger {
    async fn record(&self, record: UsageRecord) -> LedgerResult<()> {
        self.rows
            .entry(record.user_id.clone())
            .or_default()
            .push(record);
        Ok(())
    }

    async fn query(
        &self,
        user_id: &str,
        since_ms: i64,
        limit: Option<usize>,
    ) -> LedgerResult<Vec<UsageRecord>> {
        let now_s = super::now_millis() / 1000;
        let mut matches: Vec<UsageRecord> = self
            .rows
            .get(user_id)
            .map(|rows| {
                rows.iter()
                    .filter(|r| r.timestamp_ms >= since_ms && r.expires_at > now_s)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        matches.sort_by(|a, b| b.timestamp_ms.cmp(&a.timestamp_ms));
        if let Some(limit) = limit {
            matches.truncate(limit);
        }
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_at(user: &str, ts: i64, chars: usize) -> UsageRecord {
        UsageRecord {
            user_id: user.to_string(),
            timestamp_ms: ts,
            character_count: chars,
            voice_id: "Joanna".to_string(),
            engine: "neural".to_string(),
            output_format: "mp3".to_string(),
            expires_at: i64::MAX,
        }
    }

    #[tokio::test]
    async fn query_returns_newest_first_and_honors_limit() {
        let ledger = MemoryLedger::new();
        for ts in [100, 300, 200] {
            ledger.record(record_at("u1", ts, 10)).await.unwrap();
        }

        let rows = ledger.query("u1", 0, Some(2)).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].timestamp_ms, 300);
        assert_eq!(rows[1].timestamp_ms, 200);
    }

    #[tokio::test]
    async fn query_filters_by_start_time_and_user() {
        let ledger = MemoryLedger::new();
        ledger.record(record_at("u1", 100, 10)).await.unwrap();
        ledger.record(record_at("u1", 500, 10)).await.unwrap();
        ledger.record(record_at("u2", 500, 10)).await.unwrap();

        let rows = ledger.query("u1", 200, None).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].timestamp_ms, 500);

        let rows = ledger.query("u3", 0, None).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn expired_rows_are_not_returned() {
        let ledger = MemoryLedger::new();
        let mut expired = record_at("u1", 100, 10);
        expired.expires_at = 0;
        ledger.record(expired).await.unwrap();

        let rows = ledger.query("u1", 0, None).await.unwrap();
        assert!(rows.is_empty());
        assert_eq!(ledger.len(), 1);
    }
}
