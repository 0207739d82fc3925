//! Shared doubles for the integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use base64::prelude::*;
use chrono::{DateTime, TimeZone, Utc};
use jupflow::aggregator::{
    PriceData, QuoteQuery, RoutePlan, SwapInfo, SwapRequest, SwapResponse,
};
use jupflow::{
    AggregatorApi, EngineEvent, LedgerRpc, ManualClock, PriceSource, QuoteResponse,
    SimulationReport, SwapEngine, SwapError, TokenInfo,
};
use parking_lot::Mutex;
use solana_sdk::hash::Hash;
use solana_sdk::message::{v0, VersionedMessage};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::VersionedTransaction;
use tokio::sync::broadcast;

pub const SOL_MINT: &str = "So11111111111111111111111111111111111111112";
pub const USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

/// 2024-05-01 12:00:30 UTC, half a minute before the next cron minute.
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 30).unwrap()
}

pub fn quote(out_amount: u64, price_impact_pct: &str, labels: &[&str]) -> QuoteResponse {
    let route_plan = labels
        .iter()
        .enumerate()
        .map(|(i, label)| RoutePlan {
            swap_info: SwapInfo {
                amm_key: format!("amm{}", i),
                label: Some(label.to_string()),
                input_mint: SOL_MINT.to_string(),
                output_mint: USDC_MINT.to_string(),
                in_amount: "1000000000".to_string(),
                out_amount: out_amount.to_string(),
                fee_amount: "0".to_string(),
                fee_mint: SOL_MINT.to_string(),
            },
            percent: 100,
        })
        .collect();

    QuoteResponse {
        input_mint: SOL_MINT.to_string(),
        in_amount: "1000000000".to_string(),
        output_mint: USDC_MINT.to_string(),
        out_amount: out_amount.to_string(),
        other_amount_threshold: out_amount.to_string(),
        swap_mode: "ExactIn".to_string(),
        slippage_bps: 50,
        platform_fee: None,
        price_impact_pct: price_impact_pct.to_string(),
        route_plan,
        context_slot: 1,
        time_taken: 0.01,
    }
}

pub fn token(address: &str, symbol: &str, tags: &[&str]) -> TokenInfo {
    TokenInfo {
        address: address.to_string(),
        chain_id: Some(101),
        decimals: 6,
        name: format!("{} Token", symbol),
        symbol: symbol.to_string(),
        logo_uri: None,
        tags: tags.iter().map(|tag| tag.to_string()).collect(),
        extensions: None,
    }
}

/// Aggregator double. Quotes are keyed by `only_direct_routes`; swap
/// transactions are built for the requesting owner.
#[derive(Default)]
pub struct MockAggregator {
    pub quotes: Mutex<HashMap<bool, QuoteResponse>>,
    pub fail_quotes: AtomicBool,
    pub quote_calls: AtomicUsize,
    pub swap_calls: AtomicUsize,
    pub tokens: Mutex<Vec<TokenInfo>>,
    pub prices: Mutex<HashMap<String, f64>>,
    pub down: AtomicBool,
}

impl MockAggregator {
    pub fn with_quote(quote: QuoteResponse) -> Self {
        let mock = Self::default();
        mock.quotes.lock().insert(false, quote.clone());
        mock.quotes.lock().insert(true, quote);
        mock
    }
}

#[async_trait]
impl AggregatorApi for MockAggregator {
    async fn quote(&self, query: &QuoteQuery) -> jupflow::Result<QuoteResponse> {
        self.quote_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_quotes.load(Ordering::SeqCst) {
            return Err(SwapError::api("jupiter", "service unavailable", Some(503)));
        }
        self.quotes
            .lock()
            .get(&query.only_direct_routes)
            .cloned()
            .ok_or_else(|| SwapError::api("jupiter", "Could not find any route", Some(400)))
    }

    async fn swap_transaction(&self, request: &SwapRequest) -> jupflow::Result<SwapResponse> {
        self.swap_calls.fetch_add(1, Ordering::SeqCst);
        let payer = Pubkey::from_str(&request.user_public_key)
            .map_err(|e| SwapError::api("jupiter", e.to_string(), Some(400)))?;
        Ok(SwapResponse {
            swap_transaction: Some(encoded_unsigned_transaction(&payer)),
            last_valid_block_height: Some(100),
        })
    }

    async fn tokens(&self) -> jupflow::Result<Vec<TokenInfo>> {
        Ok(self.tokens.lock().clone())
    }

    async fn prices(&self, ids: &[String]) -> jupflow::Result<HashMap<String, PriceData>> {
        let prices = self.prices.lock();
        Ok(ids
            .iter()
            .filter_map(|id| {
                prices.get(id).map(|price| {
                    (
                        id.clone(),
                        PriceData {
                            id: id.clone(),
                            mint_symbol: None,
                            price: *price,
                        },
                    )
                })
            })
            .collect())
    }

    async fn health(&self) -> jupflow::Result<()> {
        if self.down.load(Ordering::SeqCst) {
            return Err(SwapError::api("jupiter", "connection refused", None));
        }
        Ok(())
    }
}

pub fn encoded_unsigned_transaction(payer: &Pubkey) -> String {
    let message = v0::Message::try_compile(payer, &[], &[], Hash::default()).unwrap();
    let transaction = VersionedTransaction {
        signatures: vec![Signature::default()],
        message: VersionedMessage::V0(message),
    };
    BASE64_STANDARD.encode(bincode::serialize(&transaction).unwrap())
}

#[derive(Default)]
pub struct MockLedger {
    pub native: Mutex<HashMap<Pubkey, u64>>,
    pub token_accounts: Mutex<HashMap<Pubkey, u64>>,
    pub sent: Mutex<Vec<VersionedTransaction>>,
    pub reject_sends: AtomicBool,
}

impl MockLedger {
    pub fn fund(&self, owner: &Pubkey, lamports: u64) {
        self.native.lock().insert(*owner, lamports);
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }
}

#[async_trait]
impl LedgerRpc for MockLedger {
    async fn native_balance(&self, owner: &Pubkey) -> jupflow::Result<u64> {
        Ok(self.native.lock().get(owner).copied().unwrap_or(0))
    }

    async fn token_account_amount(&self, token_account: &Pubkey) -> jupflow::Result<Option<u64>> {
        Ok(self.token_accounts.lock().get(token_account).copied())
    }

    async fn latest_blockhash(&self) -> jupflow::Result<Hash> {
        Ok(Hash::new_unique())
    }

    async fn send_and_confirm(
        &self,
        transaction: &VersionedTransaction,
    ) -> jupflow::Result<Signature> {
        if self.reject_sends.load(Ordering::SeqCst) {
            return Err(SwapError::TransactionFailed {
                message: "Transaction simulation failed: slippage exceeded".into(),
                details: None,
            });
        }
        self.sent.lock().push(transaction.clone());
        Ok(transaction.signatures[0])
    }

    async fn simulate(
        &self,
        _transaction: &VersionedTransaction,
    ) -> jupflow::Result<SimulationReport> {
        Ok(SimulationReport {
            success: true,
            logs: vec!["Program log: Instruction: Route".to_string()],
            units_consumed: Some(120_000),
            error: None,
        })
    }

    async fn health(&self) -> jupflow::Result<u64> {
        Ok(250_000_000)
    }
}

/// Price feed whose value tests can move.
pub struct FixedPrice(pub Mutex<f64>);

impl FixedPrice {
    pub fn new(price: f64) -> Self {
        Self(Mutex::new(price))
    }

    pub fn set(&self, price: f64) {
        *self.0.lock() = price;
    }
}

#[async_trait]
impl PriceSource for FixedPrice {
    async fn price(&self, _asset: &str) -> jupflow::Result<f64> {
        Ok(*self.0.lock())
    }
}

pub struct Harness {
    pub engine: SwapEngine,
    pub aggregator: Arc<MockAggregator>,
    pub ledger: Arc<MockLedger>,
    pub clock: Arc<ManualClock>,
    pub events: broadcast::Receiver<EngineEvent>,
}

pub fn harness(aggregator: MockAggregator) -> Harness {
    harness_with_prices(aggregator, None)
}

pub fn harness_with_prices(aggregator: MockAggregator, prices: Option<Arc<FixedPrice>>) -> Harness {
    let aggregator = Arc::new(aggregator);
    let ledger = Arc::new(MockLedger::default());
    let clock = Arc::new(ManualClock::new(start_time()));

    let mut builder = SwapEngine::builder(aggregator.clone(), ledger.clone()).clock(clock.clone());
    if let Some(prices) = prices {
        builder = builder.price_source(prices);
    }
    let engine = builder.build();
    let events = engine.subscribe();

    Harness {
        engine,
        aggregator,
        ledger,
        clock,
        events,
    }
}

/// Events published so far, in order.
pub fn drain(events: &mut broadcast::Receiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    seen
}

pub fn names(events: &[EngineEvent]) -> Vec<&'static str> {
    events.iter().map(EngineEvent::name).collect()
}

pub async fn join_all(handles: Vec<tokio::task::JoinHandle<()>>) {
    for handle in handles {
        handle.await.unwrap();
    }
}
