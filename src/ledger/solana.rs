use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use solana_client::client_error::ClientError;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcSimulateTransactionConfig;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::VersionedTransaction;
use spl_token::solana_program::program_pack::Pack;
use spl_token::state::Account as TokenAccount;
use tracing::{debug, error, info, instrument};

use super::{LedgerRpc, SimulationReport};
use crate::config::Settings;
use crate::error::{Result, SwapError};

/// `LedgerRpc` over the nonblocking Solana JSON-RPC client.
pub struct SolanaLedger {
    rpc_client: Arc<RpcClient>,
    commitment: CommitmentConfig,
}

impl std::fmt::Debug for SolanaLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolanaLedger")
            .field("rpc_url", &self.rpc_client.url())
            .field("commitment", &self.commitment.commitment)
            .finish()
    }
}

impl SolanaLedger {
    pub fn new(rpc_url: &str, commitment: &str) -> Result<Self> {
        let commitment = CommitmentConfig::from_str(commitment).map_err(|e| {
            SwapError::ConfigError(format!("Invalid commitment '{}': {}", commitment, e))
        })?;
        let rpc_client = Arc::new(RpcClient::new_with_commitment(rpc_url.to_string(), commitment));

        Ok(Self {
            rpc_client,
            commitment,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(&settings.solana_rpc_url, &settings.commitment)
    }

    pub fn rpc_client(&self) -> Arc<RpcClient> {
        self.rpc_client.clone()
    }
}

fn rpc_error(context: &str, err: ClientError) -> SwapError {
    SwapError::SolanaRpc(format!("{}: {}", context, err))
}

#[async_trait]
impl LedgerRpc for SolanaLedger {
    async fn native_balance(&self, owner: &Pubkey) -> Result<u64> {
        self.rpc_client
            .get_balance(owner)
            .await
            .map_err(|e| rpc_error("Failed to get native balance", e))
    }

    async fn token_account_amount(&self, token_account: &Pubkey) -> Result<Option<u64>> {
        let account = self
            .rpc_client
            .get_account_with_commitment(token_account, self.commitment)
            .await
            .map_err(|e| rpc_error("Failed to get token account", e))?
            .value;

        let Some(account) = account else {
            debug!(%token_account, "Token account not provisioned");
            return Ok(None);
        };

        if account.data.len() < TokenAccount::LEN {
            return Err(SwapError::SolanaRpc(format!(
                "Account {} is not a token account ({} bytes)",
                token_account,
                account.data.len()
            )));
        }

        let state = TokenAccount::unpack_from_slice(&account.data[..TokenAccount::LEN])
            .map_err(|e| SwapError::SolanaRpc(format!("Failed to unpack token account: {}", e)))?;

        Ok(Some(state.amount))
    }

    async fn latest_blockhash(&self) -> Result<Hash> {
        self.rpc_client
            .get_latest_blockhash()
            .await
            .map_err(|e| rpc_error("Failed to get recent blockhash", e))
    }

    #[instrument(skip_all, fields(signature = ?transaction.signatures.first()))]
    async fn send_and_confirm(&self, transaction: &VersionedTransaction) -> Result<Signature> {
        info!("Sending transaction...");
        match self.rpc_client.send_and_confirm_transaction(transaction).await {
            Ok(signature) => {
                info!(%signature, "Transaction confirmed");
                Ok(signature)
            }
            Err(e) => {
                error!(error = %e, "Send/confirm transaction failed");
                let details = e
                    .get_transaction_error()
                    .and_then(|tx_err| serde_json::to_value(tx_err).ok());
                Err(SwapError::TransactionFailed {
                    message: e.to_string(),
                    details,
                })
            }
        }
    }

    async fn simulate(&self, transaction: &VersionedTransaction) -> Result<SimulationReport> {
        let config = RpcSimulateTransactionConfig {
            sig_verify: false,
            replace_recent_blockhash: true,
            commitment: Some(self.commitment),
            ..RpcSimulateTransactionConfig::default()
        };

        let response = self
            .rpc_client
            .simulate_transaction_with_config(transaction, config)
            .await
            .map_err(|e| SwapError::SimulationFailed(format!("RPC simulation failed: {}", e)))?;

        let result = response.value;
        if let Some(err) = &result.err {
            error!(error = ?err, "Transaction simulation returned error");
        }

        Ok(SimulationReport {
            success: result.err.is_none(),
            logs: result.logs.unwrap_or_default(),
            units_consumed: result.units_consumed,
            error: result.err.map(|err| err.to_string()),
        })
    }

    async fn health(&self) -> Result<u64> {
        self.rpc_client
            .get_slot()
            .await
            .map_err(|e| rpc_error("Failed to get slot", e))
    }
}
