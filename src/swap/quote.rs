use std::sync::Arc;

use tracing::{debug, instrument};

use super::types::{QuoteRequest, RoutingMode};
use crate::aggregator::{AggregatorApi, QuoteQuery, QuoteResponse};
use crate::error::{log_error, Result, SwapError};

/// Obtains quotes from the aggregator. No caching happens at this layer.
#[derive(Clone)]
pub struct QuoteGateway {
    aggregator: Arc<dyn AggregatorApi>,
    default_slippage_bps: u16,
}

impl QuoteGateway {
    pub fn new(aggregator: Arc<dyn AggregatorApi>, default_slippage_bps: u16) -> Self {
        Self {
            aggregator,
            default_slippage_bps,
        }
    }

    pub fn aggregator(&self) -> &Arc<dyn AggregatorApi> {
        &self.aggregator
    }

    pub fn default_slippage_bps(&self) -> u16 {
        self.default_slippage_bps
    }

    pub fn build_query(&self, request: &QuoteRequest) -> Result<QuoteQuery> {
        let input_mint = request.input_asset.trim();
        let output_mint = request.output_asset.trim();

        if input_mint.is_empty() {
            return Err(SwapError::InvalidRequest("input asset must not be empty".into()));
        }
        if output_mint.is_empty() {
            return Err(SwapError::InvalidRequest("output asset must not be empty".into()));
        }
        if request.amount == 0 {
            return Err(SwapError::InvalidRequest("amount must be positive".into()));
        }

        Ok(QuoteQuery {
            input_mint: input_mint.to_string(),
            output_mint: output_mint.to_string(),
            amount: request.amount,
            slippage_bps: request.slippage_bps.unwrap_or(self.default_slippage_bps),
            fee_bps: request.fee_bps,
            only_direct_routes: request.routing_mode == RoutingMode::DirectOnly,
            as_legacy_transaction: request.as_legacy_transaction,
            max_accounts: request.max_accounts,
        })
    }

    /// Fetches a usable quote, passing upstream errors through unchanged.
    pub async fn request_quote(&self, request: &QuoteRequest) -> Result<QuoteResponse> {
        let query = self.build_query(request)?;
        let quote = self.aggregator.quote(&query).await?;
        quote.validate()?;
        Ok(quote)
    }

    /// Fetches a quote, reporting upstream failures as `QuoteFailed`.
    #[instrument(
        skip(self, request),
        fields(
            input = %request.input_asset,
            output = %request.output_asset,
            amount = request.amount
        )
    )]
    pub async fn get_quote(&self, request: &QuoteRequest) -> Result<QuoteResponse> {
        match self.request_quote(request).await {
            Ok(quote) => {
                debug!(out_amount = %quote.out_amount, hops = quote.hop_count(), "Quote obtained");
                Ok(quote)
            }
            Err(e @ SwapError::InvalidRequest(_)) => Err(e),
            Err(e) => {
                log_error(&e, "Quote request failed");
                Err(SwapError::quote_failed(&e))
            }
        }
    }
}
