//! Token metadata and USD prices from the aggregator, with in-memory caches.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, warn};

use crate::aggregator::{AggregatorApi, TokenInfo};
use crate::automation::PriceSource;
use crate::error::{Result, SwapError};
use crate::swap::NATIVE_MINT;

pub const DEFAULT_PRICE_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy)]
struct CachedPrice {
    price: f64,
    fetched_at: Instant,
}

pub struct TokenService {
    aggregator: Arc<dyn AggregatorApi>,
    token_cache: DashMap<String, TokenInfo>,
    price_cache: DashMap<String, CachedPrice>,
    price_ttl: Duration,
}

impl TokenService {
    pub fn new(aggregator: Arc<dyn AggregatorApi>, price_ttl: Duration) -> Self {
        Self {
            aggregator,
            token_cache: DashMap::new(),
            price_cache: DashMap::new(),
            price_ttl,
        }
    }

    /// Full token list. Every entry also refreshes the metadata cache.
    pub async fn supported_tokens(&self) -> Result<Vec<TokenInfo>> {
        let tokens = self
            .aggregator
            .tokens()
            .await
            .map_err(|e| SwapError::TokenMetadataFailed(e.to_string()))?;

        for token in &tokens {
            self.token_cache.insert(token.address.clone(), token.clone());
        }
        debug!(count = tokens.len(), "Fetched supported tokens");
        Ok(tokens)
    }

    pub async fn token_metadata(&self, mint: &str) -> Result<TokenInfo> {
        if let Some(cached) = self.token_cache.get(mint) {
            return Ok(cached.clone());
        }

        self.supported_tokens()
            .await?
            .into_iter()
            .find(|token| token.address == mint)
            .ok_or_else(|| SwapError::TokenNotFound(mint.to_string()))
    }

    /// USD price of `mint`, served from cache while younger than the TTL.
    pub async fn token_price(&self, mint: &str) -> Result<f64> {
        if let Some(cached) = self.price_cache.get(mint) {
            if cached.fetched_at.elapsed() < self.price_ttl {
                return Ok(cached.price);
            }
        }

        self.fresh_price(mint).await
    }

    /// USD price of `mint` straight from the aggregator. Refreshes the cache.
    pub async fn fresh_price(&self, mint: &str) -> Result<f64> {
        let prices = self
            .aggregator
            .prices(&[mint.to_string()])
            .await
            .map_err(|e| SwapError::PriceFailed(format!("{}: {}", mint, e)))?;

        let price = prices
            .get(mint)
            .map(|data| data.price)
            .ok_or_else(|| {
                warn!(mint, "No price data returned");
                SwapError::PriceFailed(format!("no price data for {}", mint))
            })?;

        self.price_cache.insert(
            mint.to_string(),
            CachedPrice {
                price,
                fetched_at: Instant::now(),
            },
        );
        Ok(price)
    }

    pub async fn sol_price(&self) -> Result<f64> {
        self.token_price(NATIVE_MINT).await
    }

    /// Case-insensitive substring match on name or symbol.
    pub async fn search_tokens(&self, query: &str) -> Result<Vec<TokenInfo>> {
        let needle = query.to_lowercase();
        Ok(self
            .supported_tokens()
            .await?
            .into_iter()
            .filter(|token| {
                token.name.to_lowercase().contains(&needle)
                    || token.symbol.to_lowercase().contains(&needle)
            })
            .collect())
    }

    pub async fn tokens_by_category(&self, tag: &str) -> Result<Vec<TokenInfo>> {
        Ok(self
            .supported_tokens()
            .await?
            .into_iter()
            .filter(|token| token.tags.iter().any(|t| t == tag))
            .collect())
    }

    pub fn clear_price_cache(&self) {
        self.price_cache.clear();
    }

    pub fn clear_token_cache(&self) {
        self.token_cache.clear();
    }
}

#[async_trait]
impl PriceSource for TokenService {
    async fn price(&self, asset: &str) -> Result<f64> {
        self.fresh_price(asset).await
    }
}
