use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use jupflow_types::SwapReceipt;
use serde::{Deserialize, Serialize};
use solana_sdk::native_token::LAMPORTS_PER_SOL;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::transaction::VersionedTransaction;

use crate::aggregator::QuoteResponse;

/// Wrapped SOL mint, treated as the native asset.
pub const NATIVE_MINT: &str = "So11111111111111111111111111111111111111112";
pub const DEFAULT_SLIPPAGE_BPS: u16 = 50;
pub const DEFAULT_COMPARISON_SLIPPAGE_BPS: u16 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RoutingMode {
    #[default]
    Any,
    DirectOnly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub input_asset: String,
    pub output_asset: String,
    /// Amount in the input asset's smallest unit.
    pub amount: u64,
    pub slippage_bps: Option<u16>,
    pub fee_bps: Option<u16>,
    #[serde(default)]
    pub routing_mode: RoutingMode,
    #[serde(default)]
    pub as_legacy_transaction: bool,
    pub max_accounts: Option<u16>,
}

impl QuoteRequest {
    pub fn new(
        input_asset: impl Into<String>,
        output_asset: impl Into<String>,
        amount: u64,
    ) -> Self {
        Self {
            input_asset: input_asset.into(),
            output_asset: output_asset.into(),
            amount,
            slippage_bps: None,
            fee_bps: None,
            routing_mode: RoutingMode::Any,
            as_legacy_transaction: false,
            max_accounts: None,
        }
    }

    pub fn with_slippage(mut self, slippage_bps: u16) -> Self {
        self.slippage_bps = Some(slippage_bps);
        self
    }

    pub fn with_routing_mode(mut self, routing_mode: RoutingMode) -> Self {
        self.routing_mode = routing_mode;
        self
    }

    /// Carries the quote-relevant part of swap options into a request.
    pub fn with_options(mut self, options: &SwapOptions) -> Self {
        self.slippage_bps = options.slippage_bps.or(self.slippage_bps);
        self.fee_bps = options.fee_bps;
        self.as_legacy_transaction = options.as_legacy_transaction;
        self.max_accounts = options.max_accounts;
        self
    }
}

/// Per-call knobs for quoting and building a swap transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SwapOptions {
    pub slippage_bps: Option<u16>,
    pub fee_bps: Option<u16>,
    pub compute_unit_price_micro_lamports: Option<u64>,
    pub prioritization_fee_lamports: Option<u64>,
    pub as_legacy_transaction: bool,
    pub use_shared_accounts: bool,
    pub dynamic_compute_unit_limit: bool,
    pub destination_token_account: Option<String>,
    pub max_accounts: Option<u16>,
}

impl Default for SwapOptions {
    fn default() -> Self {
        Self {
            slippage_bps: None,
            fee_bps: None,
            compute_unit_price_micro_lamports: None,
            prioritization_fee_lamports: None,
            as_legacy_transaction: false,
            use_shared_accounts: true,
            dynamic_compute_unit_limit: true,
            destination_token_account: None,
            max_accounts: None,
        }
    }
}

impl SwapOptions {
    pub fn with_slippage(slippage_bps: u16) -> Self {
        Self {
            slippage_bps: Some(slippage_bps),
            ..Self::default()
        }
    }
}

/// Optional constraints applied by `RouteScorer::compare_routes`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RouteFilter {
    pub include_dexes: Option<Vec<String>>,
    pub exclude_dexes: Option<Vec<String>>,
    pub max_hops: Option<usize>,
    /// Accepted for compatibility; quotes carry no liquidity figure to test it against.
    pub min_liquidity: Option<f64>,
    pub prefer_speed: bool,
    pub prefer_cheapest: bool,
    pub max_slippage_bps: Option<u16>,
}

impl RouteFilter {
    /// A route passes when it touches an included dex (if any are listed)
    /// and touches no excluded dex and stays within the hop limit.
    pub fn admits(&self, dex_path: &[String]) -> bool {
        let touches = |dexes: &Vec<String>| {
            let wanted: HashSet<&str> = dexes.iter().map(String::as_str).collect();
            dex_path.iter().any(|dex| wanted.contains(dex.as_str()))
        };

        if let Some(include) = &self.include_dexes {
            if !touches(include) {
                return false;
            }
        }
        if let Some(exclude) = &self.exclude_dexes {
            if touches(exclude) {
                return false;
            }
        }
        if let Some(max_hops) = self.max_hops {
            if dex_path.len() > max_hops {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn classify(price_impact_percent: f64, hops: usize) -> Self {
        if price_impact_percent < 0.5 && hops <= 2 {
            RiskLevel::Low
        } else if price_impact_percent < 2.0 && hops <= 3 {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteComparison {
    pub route: QuoteResponse,
    pub score: f64,
    pub estimated_execution_seconds: f64,
    pub risk_level: RiskLevel,
    pub dex_path: Vec<String>,
}

/// A confirmed swap.
#[derive(Debug, Clone)]
pub struct SwapResult {
    pub signature: Signature,
    pub input_amount: u64,
    pub output_amount: u64,
    pub price_impact: f64,
    pub route: QuoteResponse,
    pub raw_transaction: VersionedTransaction,
}

impl SwapResult {
    pub fn receipt(&self) -> SwapReceipt {
        SwapReceipt {
            signature: self.signature.to_string(),
            input_amount: self.input_amount,
            output_amount: self.output_amount,
            price_impact: self.price_impact,
        }
    }
}

/// A quote together with the unsigned transaction the aggregator built for it.
#[derive(Debug, Clone)]
pub struct PreparedSwap {
    pub quote: QuoteResponse,
    pub transaction: VersionedTransaction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceCheck {
    pub sufficient: bool,
    pub available: u64,
    pub required: u64,
}

/// Identity a swap is performed for. Only `Signable` can sign transactions.
#[derive(Clone)]
pub enum Wallet {
    Signable(Arc<Keypair>),
    ViewOnly(Pubkey),
}

impl Wallet {
    pub fn pubkey(&self) -> Pubkey {
        match self {
            Wallet::Signable(keypair) => keypair.pubkey(),
            Wallet::ViewOnly(pubkey) => *pubkey,
        }
    }

    pub fn keypair(&self) -> Option<&Arc<Keypair>> {
        match self {
            Wallet::Signable(keypair) => Some(keypair),
            Wallet::ViewOnly(_) => None,
        }
    }

    pub fn can_sign(&self) -> bool {
        matches!(self, Wallet::Signable(_))
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Wallet::Signable(keypair) => {
                f.debug_tuple("Signable").field(&keypair.pubkey()).finish()
            }
            Wallet::ViewOnly(pubkey) => f.debug_tuple("ViewOnly").field(pubkey).finish(),
        }
    }
}

impl From<Keypair> for Wallet {
    fn from(keypair: Keypair) -> Self {
        Wallet::Signable(Arc::new(keypair))
    }
}

impl From<Arc<Keypair>> for Wallet {
    fn from(keypair: Arc<Keypair>) -> Self {
        Wallet::Signable(keypair)
    }
}

impl From<Pubkey> for Wallet {
    fn from(pubkey: Pubkey) -> Self {
        Wallet::ViewOnly(pubkey)
    }
}

pub fn sol_to_lamports(sol: f64) -> u64 {
    (sol * LAMPORTS_PER_SOL as f64).floor() as u64
}

pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn path(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn test_filter_include_and_exclude() {
        let filter = RouteFilter {
            include_dexes: Some(vec!["Orca".into()]),
            ..RouteFilter::default()
        };
        assert!(filter.admits(&path(&["Raydium", "Orca"])));
        assert!(!filter.admits(&path(&["Raydium"])));

        let filter = RouteFilter {
            include_dexes: Some(vec!["Orca".into()]),
            exclude_dexes: Some(vec!["Raydium".into()]),
            ..RouteFilter::default()
        };
        assert!(!filter.admits(&path(&["Raydium", "Orca"])));
        assert!(filter.admits(&path(&["Orca"])));
    }

    #[test]
    fn test_filter_empty_include_list_admits_nothing() {
        let filter = RouteFilter {
            include_dexes: Some(vec![]),
            ..RouteFilter::default()
        };
        assert!(!filter.admits(&path(&["Orca"])));
    }

    #[test]
    fn test_filter_max_hops() {
        let filter = RouteFilter {
            max_hops: Some(2),
            ..RouteFilter::default()
        };
        assert!(filter.admits(&path(&["Orca", "Raydium"])));
        assert!(!filter.admits(&path(&["Orca", "Raydium", "Meteora"])));
    }

    #[test]
    fn test_risk_classification() {
        assert_eq!(RiskLevel::classify(0.1, 1), RiskLevel::Low);
        assert_eq!(RiskLevel::classify(0.1, 3), RiskLevel::Medium);
        assert_eq!(RiskLevel::classify(1.5, 2), RiskLevel::Medium);
        assert_eq!(RiskLevel::classify(2.0, 1), RiskLevel::High);
        assert_eq!(RiskLevel::classify(0.1, 4), RiskLevel::High);
        assert_eq!(serde_json::to_string(&RiskLevel::Medium).unwrap(), "\"medium\"");
    }

    #[test]
    fn test_wallet_variants() {
        let keypair = Keypair::new();
        let pubkey = keypair.pubkey();

        let signable = Wallet::from(keypair);
        assert!(signable.can_sign());
        assert_eq!(signable.pubkey(), pubkey);

        let view_only = Wallet::from(pubkey);
        assert!(!view_only.can_sign());
        assert!(view_only.keypair().is_none());
        assert_eq!(format!("{:?}", view_only), format!("ViewOnly({:?})", pubkey));
    }

    #[test]
    fn test_lamport_conversions() {
        assert_eq!(sol_to_lamports(1.5), 1_500_000_000);
        assert_eq!(lamports_to_sol(2_500_000_000), 2.5);
    }

    #[test]
    fn test_swap_options_defaults() {
        let options = SwapOptions::default();
        assert!(options.use_shared_accounts);
        assert!(options.dynamic_compute_unit_limit);
        assert!(!options.as_legacy_transaction);

        let parsed: SwapOptions = serde_json::from_str(r#"{"slippageBps":75}"#).unwrap();
        assert_eq!(parsed.slippage_bps, Some(75));
        assert!(parsed.use_shared_accounts);
    }
}
