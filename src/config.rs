use serde::Deserialize;
use solana_sdk::signature::Keypair;
use std::time::Duration;

use crate::automation::AutomationConfig;
use crate::error::{Result, SwapError};
use crate::swap::ScorerWeights;

pub const DEFAULT_JUPITER_API_URL: &str = "https://quote-api.jup.ag/v6";
pub const DEFAULT_PRICE_API_URL: &str = "https://price.jup.ag/v6";
pub const DEFAULT_SOLANA_RPC_URL: &str = "https://api.mainnet-beta.solana.com";

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    // Solana Configuration
    pub solana_rpc_url: String,
    pub commitment: String,
    pub wallet_private_key: Option<String>,

    // Aggregator endpoints
    pub jupiter_api_url: String,
    pub price_api_url: String,
    pub request_timeout_secs: u64,

    // Retry policy for idempotent ledger reads
    pub max_retries: u32,
    pub retry_backoff_ms: u64,

    // Swap parameters
    pub default_slippage_bps: u16,
    pub comparison_slippage_bps: u16,

    // Route scoring weights
    pub score_output_divisor: f64,
    pub score_price_impact_weight: f64,
    pub score_speed_weight: f64,
    pub score_cheapest_bonus: f64,

    // Automation
    pub trigger_poll_interval_secs: u64,
    pub scheduler_tick_millis: u64,
    pub token_cache_ttl_secs: u64,

    // Logging
    pub log_dir: String,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            solana_rpc_url: DEFAULT_SOLANA_RPC_URL.to_string(),
            commitment: "confirmed".to_string(),
            wallet_private_key: None,
            jupiter_api_url: DEFAULT_JUPITER_API_URL.to_string(),
            price_api_url: DEFAULT_PRICE_API_URL.to_string(),
            request_timeout_secs: 30,
            max_retries: 3,
            retry_backoff_ms: 500,
            default_slippage_bps: 50,
            comparison_slippage_bps: 100,
            score_output_divisor: 1_000_000.0,
            score_price_impact_weight: 100.0,
            score_speed_weight: 10.0,
            score_cheapest_bonus: 1000.0,
            trigger_poll_interval_secs: 30,
            scheduler_tick_millis: 1000,
            token_cache_ttl_secs: 300,
            log_dir: "./logs".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    pub fn from_env() -> std::result::Result<Self, config::ConfigError> {
        let config_builder = config::Config::builder()
            .add_source(config::Environment::default().separator("__"))
            .set_default("commitment", "confirmed")?
            .set_default("jupiter_api_url", DEFAULT_JUPITER_API_URL)?
            .set_default("price_api_url", DEFAULT_PRICE_API_URL)?
            .set_default("request_timeout_secs", 30)?
            .set_default("max_retries", 3)?
            .set_default("retry_backoff_ms", 500)?
            .set_default("default_slippage_bps", 50)?
            .set_default("comparison_slippage_bps", 100)?
            .set_default("score_output_divisor", 1_000_000.0)?
            .set_default("score_price_impact_weight", 100.0)?
            .set_default("score_speed_weight", 10.0)?
            .set_default("score_cheapest_bonus", 1000.0)?
            .set_default("trigger_poll_interval_secs", 30)?
            .set_default("scheduler_tick_millis", 1000)?
            .set_default("token_cache_ttl_secs", 300)?
            .set_default("log_dir", "./logs")?
            .set_default("log_level", "info")?;

        let settings = config_builder.build()?;
        settings.try_deserialize()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn token_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.token_cache_ttl_secs)
    }

    pub fn scorer_weights(&self) -> ScorerWeights {
        ScorerWeights {
            output_divisor: self.score_output_divisor,
            price_impact_weight: self.score_price_impact_weight,
            speed_weight: self.score_speed_weight,
            cheapest_bonus: self.score_cheapest_bonus,
            ..ScorerWeights::default()
        }
    }

    pub fn automation_config(&self) -> AutomationConfig {
        AutomationConfig {
            poll_interval: Duration::from_secs(self.trigger_poll_interval_secs),
            tick_interval: Duration::from_millis(self.scheduler_tick_millis.max(1)),
            default_slippage_bps: self.default_slippage_bps,
        }
    }

    /// Decodes the configured base58 private key, if any.
    pub fn wallet_keypair(&self) -> Result<Option<Keypair>> {
        let Some(encoded) = self.wallet_private_key.as_deref() else {
            return Ok(None);
        };

        let private_key_bytes = bs58::decode(encoded.trim())
            .into_vec()
            .map_err(|e| SwapError::ConfigError(format!("Invalid base58 private key: {}", e)))?;

        let keypair = Keypair::from_bytes(&private_key_bytes).map_err(|e| {
            SwapError::ConfigError(format!("Failed to create keypair from bytes: {}", e))
        })?;

        Ok(Some(keypair))
    }
}
