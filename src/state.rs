//! Shared application state for the gateway.

use std::sync::Arc;
use std::time::Duration;

use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use moka::future::Cache;
use tracing::info;

use crate::config::ServerConfig;
use crate::core::tts::{PollySynthesizer, PollySynthesizerConfig, SpeechSynthesizer, VoiceDescription};
use crate::usage::{DynamoLedger, MemoryLedger, UsageLedger};

/// Application state shared across all request handlers.
pub struct AppState {
    pub config: ServerConfig,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub ledger: Arc<dyn UsageLedger>,
    /// Voice catalog cache. The catalog changes rarely, so it is fetched
    /// once and served from memory until the TTL lapses.
    pub voice_cache: Cache<String, Arc<Vec<VoiceDescription>>>,
}

impl AppState {
    /// Build production state: Polly synthesizer plus a DynamoDB ledger
    /// (or the in-memory ledger when no table is configured).
    pub async fn new(config: ServerConfig) -> Arc<Self> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(ref region) = config.aws_region {
            loader = loader.region(Region::new(region.clone()));
        }
        if config.has_explicit_aws_credentials() {
            let credentials = Credentials::new(
                config.aws_access_key_id.clone().unwrap_or_default(),
                config.aws_secret_access_key.clone().unwrap_or_default(),
                config.aws_session_token.clone(),
                None,
                "voxread",
            );
            loader = loader.credentials_provider(credentials);
        }
        let aws_config = loader.load().await;

        let polly = aws_sdk_polly::Client::new(&aws_config);
        let synthesizer: Arc<dyn SpeechSynthesizer> = Arc::new(PollySynthesizer::new(
            polly,
            PollySynthesizerConfig::default(),
        ));

        let ledger: Arc<dyn UsageLedger> = match config.usage_table {
            Some(ref table) => {
                let dynamo = aws_sdk_dynamodb::Client::new(&aws_config);
                Arc::new(DynamoLedger::new(dynamo, table.clone()))
            }
            None => {
                info!("USAGE_TABLE not configured, using in-memory usage ledger");
                Arc::new(MemoryLedger::new())
            }
        };

        Self::with_parts(config, synthesizer, ledger)
    }

    /// Build state from preconstructed collaborators. Used by tests to
    /// inject stub providers and ledgers.
    pub fn with_parts(
        config: ServerConfig,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        ledger: Arc<dyn UsageLedger>,
    ) -> Arc<Self> {
        let voice_cache = Cache::builder()
            .time_to_live(Duration::from_secs(config.voice_cache_ttl_seconds))
            .max_capacity(4)
            .build();

        Arc::new(Self {
            config,
            synthesizer,
            ledger,
            voice_cache,
        })
    }
}
