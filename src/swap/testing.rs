//! In-crate doubles for the aggregator and ledger collaborators.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use base64::prelude::*;
use parking_lot::Mutex;
use solana_sdk::hash::Hash;
use solana_sdk::message::{v0, VersionedMessage};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::VersionedTransaction;

use crate::aggregator::{
    AggregatorApi, PriceData, QuoteQuery, QuoteResponse, SwapRequest, SwapResponse, TokenInfo,
};
use crate::error::{Result, SwapError};
use crate::ledger::{LedgerRpc, SimulationReport};

/// Base64 of an unsigned v0 transaction paying from `payer`.
pub fn encoded_unsigned_transaction(payer: &Pubkey) -> String {
    let message = v0::Message::try_compile(payer, &[], &[], Hash::default())
        .expect("compile empty message");
    let transaction = VersionedTransaction {
        signatures: vec![Signature::default()],
        message: VersionedMessage::V0(message),
    };
    BASE64_STANDARD.encode(bincode::serialize(&transaction).expect("serialize transaction"))
}

#[derive(Default)]
pub struct StubAggregator {
    pub quotes: Mutex<HashMap<bool, Result<QuoteResponse>>>,
    pub quote_queries: Mutex<Vec<QuoteQuery>>,
    pub swap_requests: Mutex<Vec<SwapRequest>>,
    pub swap_transaction: Mutex<Option<String>>,
    pub swap_calls: AtomicUsize,
}

impl StubAggregator {
    /// Answers both routing modes with the same quote.
    pub fn with_quote(quote: QuoteResponse) -> Self {
        let stub = Self::default();
        stub.set_quote(false, Ok(quote.clone()));
        stub.set_quote(true, Ok(quote));
        stub
    }

    pub fn set_quote(&self, only_direct_routes: bool, quote: Result<QuoteResponse>) {
        self.quotes.lock().insert(only_direct_routes, quote);
    }
}

fn clone_result(result: &Result<QuoteResponse>) -> Result<QuoteResponse> {
    match result {
        Ok(quote) => Ok(quote.clone()),
        Err(SwapError::Api { service, message, status }) => Err(SwapError::Api {
            service: service.clone(),
            message: message.clone(),
            status: *status,
        }),
        Err(other) => Err(SwapError::InternalError(other.to_string())),
    }
}

#[async_trait]
impl AggregatorApi for StubAggregator {
    async fn quote(&self, query: &QuoteQuery) -> Result<QuoteResponse> {
        self.quote_queries.lock().push(query.clone());
        match self.quotes.lock().get(&query.only_direct_routes) {
            Some(result) => clone_result(result),
            None => Err(SwapError::api("jupiter", "no route", Some(400))),
        }
    }

    async fn swap_transaction(&self, request: &SwapRequest) -> Result<SwapResponse> {
        self.swap_calls.fetch_add(1, Ordering::SeqCst);
        self.swap_requests.lock().push(request.clone());
        Ok(SwapResponse {
            swap_transaction: self.swap_transaction.lock().clone(),
            last_valid_block_height: Some(100),
        })
    }

    async fn tokens(&self) -> Result<Vec<TokenInfo>> {
        Ok(Vec::new())
    }

    async fn prices(&self, _ids: &[String]) -> Result<HashMap<String, PriceData>> {
        Ok(HashMap::new())
    }

    async fn health(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct StubLedger {
    pub native: Mutex<HashMap<Pubkey, u64>>,
    pub token_accounts: Mutex<HashMap<Pubkey, u64>>,
    pub fail_reads: Mutex<bool>,
    pub sent: Mutex<Vec<VersionedTransaction>>,
}

#[async_trait]
impl LedgerRpc for StubLedger {
    async fn native_balance(&self, owner: &Pubkey) -> Result<u64> {
        if *self.fail_reads.lock() {
            return Err(SwapError::SolanaRpc("connection refused".into()));
        }
        Ok(self.native.lock().get(owner).copied().unwrap_or(0))
    }

    async fn token_account_amount(&self, token_account: &Pubkey) -> Result<Option<u64>> {
        if *self.fail_reads.lock() {
            return Err(SwapError::SolanaRpc("connection refused".into()));
        }
        Ok(self.token_accounts.lock().get(token_account).copied())
    }

    async fn latest_blockhash(&self) -> Result<Hash> {
        Ok(Hash::new_unique())
    }

    async fn send_and_confirm(&self, transaction: &VersionedTransaction) -> Result<Signature> {
        self.sent.lock().push(transaction.clone());
        Ok(transaction.signatures[0])
    }

    async fn simulate(&self, _transaction: &VersionedTransaction) -> Result<SimulationReport> {
        Ok(SimulationReport {
            success: true,
            logs: vec!["Program log: ok".to_string()],
            units_consumed: Some(42_000),
            error: None,
        })
    }

    async fn health(&self) -> Result<u64> {
        Ok(1)
    }
}
