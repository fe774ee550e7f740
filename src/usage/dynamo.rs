//! DynamoDB-backed usage ledger.
//!
//! Table schema: partition key `userId` (S), sort key `timestamp` (N,
//! milliseconds). The `ttl` attribute carries the row expiry in epoch
//! seconds; the table's TTL setting handles physical deletion.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::Client as DynamoClient;
use aws_sdk_dynamodb::types::AttributeValue;
use tracing::error;

use super::{LedgerError, LedgerResult, UsageLedger, UsageRecord};

/// Usage ledger backed by a DynamoDB table.
pub struct DynamoLedger {
    client: DynamoClient,
    table: String,
}

impl DynamoLedger {
    pub fn new(client: DynamoClient, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }

    fn parse_item(item: &HashMap<String, AttributeValue>) -> Option<UsageRecord> {
        let s = |key: &str| item.get(key)?.as_s().ok().cloned();
        let n = |key: &str| item.get(key)?.as_n().ok()?.parse::<i64>().ok();

        Some(UsageRecord {
            user_id: s("userId")?,
            timestamp_ms: n("timestamp")?,
            character_count: n("characterCount").unwrap_or(0) as usize,
            voice_id: s("voiceId").unwrap_or_default(),
            engine: s("engine").unwrap_or_default(),
            output_format: s("outputFormat").unwrap_or_default(),
            expires_at: n("ttl").unwrap_or(i64::MAX),
        })
    }
}

#[async_trait]
impl UsageLedger for DynamoLedger {
    async fn record(&self, record: UsageRecord) -> LedgerResult<()> {
        self.client
            .put_item()
            .table_name(&self.table)
            .item("userId", AttributeValue::S(record.user_id))
            .item(
                "timestamp",
                AttributeValue::N(record.timestamp_ms.to_string()),
            )
            .item(
                "characterCount",
                AttributeValue::N(record.character_count.to_string()),
            )
            .item("voiceId", AttributeValue::S(record.voice_id))
            .item("engine", AttributeValue::S(record.engine))
            .item("outputFormat", AttributeValue::S(record.output_format))
            .item("ttl", AttributeValue::N(record.expires_at.to_string()))
            .send()
            .await
            .map_err(|e| {
                error!(table = %self.table, error = %e, "DynamoDB PutItem failed");
                LedgerError::WriteFailed(e.to_string())
            })?;
        Ok(())
    }

    async fn query(
        &self,
        user_id: &str,
        since_ms: i64,
        limit: Option<usize>,
    ) -> LedgerResult<Vec<UsageRecord>> {
        let mut request = self
            .client
            .query()
            .table_name(&self.table)
            .key_condition_expression("userId = :userId AND #ts >= :startTime")
            .expression_attribute_names("#ts", "timestamp")
            .expression_attribute_values(":userId", AttributeValue::S(user_id.to_string()))
            .expression_attribute_values(":startTime", AttributeValue::N(since_ms.to_string()))
            // Most recent first
            .scan_index_forward(false);

        if let Some(limit) = limit {
            request = request.limit(limit.min(i32::MAX as usize) as i32);
        }

        let response = request.send().await.map_err(|e| {
            error!(table = %self.table, error = %e, "DynamoDB Query failed");
            LedgerError::QueryFailed(e.to_string())
        })?;

        Ok(response
            .items()
            .iter()
            .filter_map(Self::parse_item)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_item_reads_all_fields() {
        let mut item = HashMap::new();
        item.insert("userId".to_string(), AttributeValue::S("u1".to_string()));
        item.insert(
            "timestamp".to_string(),
            AttributeValue::N("1700000000000".to_string()),
        );
        item.insert(
            "characterCount".to_string(),
            AttributeValue::N("120".to_string()),
        );
        item.insert("voiceId".to_string(), AttributeValue::S("Ruth".to_string()));
        item.insert(
            "engine".to_string(),
            AttributeValue::S("generative".to_string()),
        );
        item.insert(
            "outputFormat".to_string(),
            AttributeValue::S("mp3".to_string()),
        );
        item.insert("ttl".to_string(), AttributeValue::N("1707776000".to_string()));

        let record = DynamoLedger::parse_item(&item).unwrap();
        assert_eq!(record.user_id, "u1");
        assert_eq!(record.timestamp_ms, 1_700_000_000_000);
        assert_eq!(record.character_count, 120);
        assert_eq!(record.voice_id, "Ruth");
        assert_eq!(record.engine, "generative");
        assert_eq!(record.expires_at, 1_707_776_000);
    }

    #[test]
    fn parse_item_requires_the_key_attributes() {
        let mut item = HashMap::new();
        item.insert("userId".to_string(), AttributeValue::S("u1".to_string()));
        assert!(DynamoLedger::parse_item(&item).is_none());
    }
}
