use std::str::FromStr;
use std::sync::Arc;

use solana_sdk::pubkey::Pubkey;
use spl_associated_token_account::get_associated_token_address;
use tracing::{debug, instrument};

use super::types::{BalanceCheck, NATIVE_MINT};
use crate::error::{Result, SwapError};
use crate::ledger::LedgerRpc;

/// Reads balances held by an owner, natively or in associated token accounts.
#[derive(Clone)]
pub struct BalanceGuard {
    ledger: Arc<dyn LedgerRpc>,
}

impl BalanceGuard {
    pub fn new(ledger: Arc<dyn LedgerRpc>) -> Self {
        Self { ledger }
    }

    /// Raw balance of `asset` for `owner` in the asset's smallest unit.
    ///
    /// A missing associated token account reads as zero.
    pub async fn balance_of(&self, owner: &Pubkey, asset: &str) -> Result<u64> {
        if asset == NATIVE_MINT {
            return self
                .ledger
                .native_balance(owner)
                .await
                .map_err(|e| SwapError::BalanceCheckFailed(e.to_string()));
        }

        let mint = Pubkey::from_str(asset)
            .map_err(|e| {
                SwapError::BalanceCheckFailed(format!("Invalid mint '{}': {}", asset, e))
            })?;
        let token_account = get_associated_token_address(owner, &mint);

        let amount = self
            .ledger
            .token_account_amount(&token_account)
            .await
            .map_err(|e| SwapError::BalanceCheckFailed(e.to_string()))?;

        if amount.is_none() {
            debug!(%owner, %mint, %token_account, "Associated token account does not exist");
        }
        Ok(amount.unwrap_or(0))
    }

    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn check_balance(
        &self,
        owner: &Pubkey,
        asset: &str,
        required: u64,
    ) -> Result<BalanceCheck> {
        let available = self.balance_of(owner, asset).await?;
        Ok(BalanceCheck {
            sufficient: available >= required,
            available,
            required,
        })
    }
}
