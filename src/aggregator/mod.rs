//! Narrow interface to the external liquidity aggregator.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::Result;

mod client;
pub mod types;

pub use client::JupiterClient;
pub use types::{
    PlatformFee, PriceData, QuoteQuery, QuoteResponse, RoutePlan, SwapInfo, SwapRequest,
    SwapResponse, TokenInfo,
};

/// Operations the engine needs from the aggregator service.
///
/// Errors are reported as `SwapError::Api` with the upstream HTTP status when
/// one was received; callers wrap them into their own failure kinds.
#[async_trait]
pub trait AggregatorApi: Send + Sync {
    async fn quote(&self, query: &QuoteQuery) -> Result<QuoteResponse>;

    /// Requests a prebuilt, unsigned transaction for a previously obtained quote.
    async fn swap_transaction(&self, request: &SwapRequest) -> Result<SwapResponse>;

    async fn tokens(&self) -> Result<Vec<TokenInfo>>;

    /// Prices keyed by mint for the requested ids. Unknown ids are absent.
    async fn prices(&self, ids: &[String]) -> Result<HashMap<String, PriceData>>;

    async fn health(&self) -> Result<()>;
}
