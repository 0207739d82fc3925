use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SwapError};

/// Information about a Solana token from Jupiter's API
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    pub address: String,
    #[serde(default)]
    pub chain_id: Option<i64>,
    pub decimals: u8,
    pub name: String,
    pub symbol: String,
    #[serde(rename = "logoURI", default)]
    pub logo_uri: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub extensions: Option<serde_json::Value>,
}

/// `/tokens` is served either as a bare list or wrapped in `{"tokens": [...]}`.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub(crate) enum TokenListResponse {
    Wrapped { tokens: Vec<TokenInfo> },
    Bare(Vec<TokenInfo>),
}

impl TokenListResponse {
    pub(crate) fn into_tokens(self) -> Vec<TokenInfo> {
        match self {
            Self::Wrapped { tokens } | Self::Bare(tokens) => tokens,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlatformFee {
    #[serde(default)]
    pub amount: Option<String>,
    pub fee_bps: u16,
}

/// One hop of a route: a single pool on a single DEX.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SwapInfo {
    pub amm_key: String,
    pub label: Option<String>,
    pub input_mint: String,
    pub output_mint: String,
    pub in_amount: String,
    pub out_amount: String,
    pub fee_amount: String,
    pub fee_mint: String,
}

impl SwapInfo {
    pub fn dex_label(&self) -> &str {
        self.label.as_deref().unwrap_or("Unknown")
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoutePlan {
    pub swap_info: SwapInfo,
    pub percent: u8,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    pub input_mint: String,
    pub in_amount: String,
    pub output_mint: String,
    pub out_amount: String,
    pub other_amount_threshold: String,
    pub swap_mode: String,
    pub slippage_bps: u16,
    #[serde(default)]
    pub platform_fee: Option<PlatformFee>,
    pub price_impact_pct: String,
    pub route_plan: Vec<RoutePlan>,
    #[serde(default)]
    pub context_slot: u64,
    #[serde(default)]
    pub time_taken: f64,
}

impl QuoteResponse {
    pub fn in_amount_u64(&self) -> Result<u64> {
        parse_amount("inAmount", &self.in_amount)
    }

    pub fn out_amount_u64(&self) -> Result<u64> {
        parse_amount("outAmount", &self.out_amount)
    }

    /// Absolute price impact in percent. Unparseable values count as zero.
    pub fn price_impact_percent(&self) -> f64 {
        self.price_impact_pct
            .trim()
            .parse::<f64>()
            .map(f64::abs)
            .unwrap_or(0.0)
    }

    pub fn hop_count(&self) -> usize {
        self.route_plan.len()
    }

    pub fn dex_path(&self) -> Vec<String> {
        self.route_plan
            .iter()
            .map(|plan| plan.swap_info.dex_label().to_string())
            .collect()
    }

    /// Checks the payload can be acted on: a non-empty route and integer amounts.
    pub fn validate(&self) -> Result<()> {
        if self.route_plan.is_empty() {
            return Err(SwapError::api("jupiter", "quote contains an empty route plan", None));
        }
        self.in_amount_u64()?;
        self.out_amount_u64()?;
        Ok(())
    }
}

fn parse_amount(field: &str, raw: &str) -> Result<u64> {
    raw.parse::<u64>().map_err(|e| {
        SwapError::api(
            "jupiter",
            format!("Failed to parse {} '{}': {}", field, raw, e),
            None,
        )
    })
}

/// Query string of `GET /quote`.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuoteQuery {
    pub input_mint: String,
    pub output_mint: String,
    pub amount: u64,
    pub slippage_bps: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee_bps: Option<u16>,
    pub only_direct_routes: bool,
    pub as_legacy_transaction: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_accounts: Option<u16>,
}

/// Body of `POST /swap`.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SwapRequest {
    pub quote_response: QuoteResponse,
    pub user_public_key: String,
    pub wrap_and_unwrap_sol: bool,
    pub use_shared_accounts: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compute_unit_price_micro_lamports: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prioritization_fee_lamports: Option<u64>,
    pub as_legacy_transaction: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_token_account: Option<String>,
    pub dynamic_compute_unit_limit: bool,
    pub skip_user_accounts_rpc_calls: bool,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SwapResponse {
    #[serde(default)]
    pub swap_transaction: Option<String>,
    #[serde(default)]
    pub last_valid_block_height: Option<u64>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PriceData {
    pub id: String,
    #[serde(default)]
    pub mint_symbol: Option<String>,
    #[serde(deserialize_with = "number_or_string")]
    pub price: f64,
}

/// Price endpoints have served prices both as JSON numbers and as strings.
fn number_or_string<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(value) => Ok(value),
        Raw::Text(text) => text.trim().parse::<f64>().map_err(serde::de::Error::custom),
    }
}

#[derive(Deserialize, Debug)]
pub(crate) struct PriceResponse {
    #[serde(default)]
    pub data: HashMap<String, PriceData>,
}
