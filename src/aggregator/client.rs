use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use super::types::{
    PriceData, PriceResponse, QuoteQuery, QuoteResponse, SwapRequest, SwapResponse, TokenInfo,
    TokenListResponse,
};
use super::AggregatorApi;
use crate::config::Settings;
use crate::error::{Result, SwapError};

const SERVICE: &str = "jupiter";

/// HTTP client for the Jupiter aggregator.
#[derive(Clone, Debug)]
pub struct JupiterClient {
    http: Client,
    api_url: String,
    price_api_url: String,
}

impl JupiterClient {
    pub fn new(api_url: &str, price_api_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SwapError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            price_api_url: price_api_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(
            &settings.jupiter_api_url,
            &settings.price_api_url,
            settings.request_timeout(),
        )
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path)
    }

    /// Turns a non-2xx response into `SwapError::Api` carrying the body text.
    async fn read_json<T: DeserializeOwned>(response: Response, what: &str) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error body".to_string());
            let message = extract_error_message(&body).unwrap_or(body);
            warn!(status = status.as_u16(), "Jupiter {} request failed: {}", what, message);
            return Err(SwapError::api(SERVICE, message, Some(status.as_u16())));
        }

        response.json::<T>().await.map_err(|e| {
            SwapError::api(
                SERVICE,
                format!("Failed to parse Jupiter {} response: {}", what, e),
                Some(status.as_u16()),
            )
        })
    }
}

/// Jupiter reports failures as `{"error": "..."}` or `{"message": "..."}`.
fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("error")
        .or_else(|| value.get("message"))
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

fn transport_error(err: reqwest::Error) -> SwapError {
    SwapError::api(SERVICE, err.to_string(), err.status().map(|s| s.as_u16()))
}

#[async_trait]
impl AggregatorApi for JupiterClient {
    #[instrument(
        skip(self),
        fields(input = %query.input_mint, output = %query.output_mint, amount = query.amount)
    )]
    async fn quote(&self, query: &QuoteQuery) -> Result<QuoteResponse> {
        let response = self
            .http
            .get(self.endpoint("quote"))
            .query(query)
            .send()
            .await
            .map_err(transport_error)?;

        let quote: QuoteResponse = Self::read_json(response, "quote").await?;
        debug!(
            out_amount = %quote.out_amount,
            hops = quote.hop_count(),
            price_impact = %quote.price_impact_pct,
            "Received quote"
        );
        Ok(quote)
    }

    #[instrument(skip(self, request), fields(user = %request.user_public_key))]
    async fn swap_transaction(&self, request: &SwapRequest) -> Result<SwapResponse> {
        let response = self
            .http
            .post(self.endpoint("swap"))
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;

        Self::read_json(response, "swap").await
    }

    async fn tokens(&self) -> Result<Vec<TokenInfo>> {
        let response = self
            .http
            .get(self.endpoint("tokens"))
            .send()
            .await
            .map_err(transport_error)?;

        let list: TokenListResponse = Self::read_json(response, "tokens").await?;
        Ok(list.into_tokens())
    }

    async fn prices(&self, ids: &[String]) -> Result<HashMap<String, PriceData>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let response = self
            .http
            .get(format!("{}/price", self.price_api_url))
            .query(&[("ids", ids.join(","))])
            .send()
            .await
            .map_err(transport_error)?;

        let prices: PriceResponse = Self::read_json(response, "price").await?;
        Ok(prices.data)
    }

    /// The aggregator is considered reachable when `/quote` answers at all,
    /// including with a 4xx for the missing query parameters.
    async fn health(&self) -> Result<()> {
        self.http
            .get(self.endpoint("quote"))
            .send()
            .await
            .map(|_| ())
            .map_err(transport_error)
    }
}
