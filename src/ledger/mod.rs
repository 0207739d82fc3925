//! Ledger RPC collaborator: balances, blockhashes, submission and simulation.

use async_trait::async_trait;
use serde::Serialize;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::VersionedTransaction;

use crate::error::Result;

mod solana;

pub use solana::SolanaLedger;

/// Outcome of a dry-run of a transaction against the ledger.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SimulationReport {
    pub success: bool,
    pub logs: Vec<String>,
    pub units_consumed: Option<u64>,
    pub error: Option<String>,
}

#[async_trait]
pub trait LedgerRpc: Send + Sync {
    /// Native balance in lamports.
    async fn native_balance(&self, owner: &Pubkey) -> Result<u64>;

    /// Raw amount held by a token account, `None` when the account does not exist.
    async fn token_account_amount(&self, token_account: &Pubkey) -> Result<Option<u64>>;

    async fn latest_blockhash(&self) -> Result<Hash>;

    /// Submits a signed transaction and waits for confirmation.
    async fn send_and_confirm(&self, transaction: &VersionedTransaction) -> Result<Signature>;

    async fn simulate(&self, transaction: &VersionedTransaction) -> Result<SimulationReport>;

    /// Current slot, used as a liveness probe.
    async fn health(&self) -> Result<u64>;
}
