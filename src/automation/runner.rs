use std::collections::HashMap;

use async_trait::async_trait;
use jupflow_types::{RecurringSwapConfig, SwapReceipt};
use parking_lot::RwLock;
use solana_sdk::pubkey::Pubkey;

use crate::error::Result;
use crate::swap::{SwapExecutor, SwapOptions, Wallet};

/// Parameters of a swap fired by the scheduler or a trigger.
#[derive(Debug, Clone, PartialEq)]
pub struct SwapOrder {
    pub input_asset: String,
    pub output_asset: String,
    pub amount: u64,
    pub owner: Pubkey,
    pub slippage_bps: Option<u16>,
}

impl From<&RecurringSwapConfig> for SwapOrder {
    fn from(config: &RecurringSwapConfig) -> Self {
        Self {
            input_asset: config.input_asset.clone(),
            output_asset: config.output_asset.clone(),
            amount: config.amount,
            owner: config.owner_account,
            slippage_bps: Some(config.max_slippage_bps),
        }
    }
}

/// Executes automated swaps on behalf of an owner account.
#[async_trait]
pub trait SwapRunner: Send + Sync {
    async fn run(&self, order: SwapOrder) -> Result<SwapReceipt>;
}

/// Runs orders through the swap executor with wallets looked up by owner.
///
/// Owners without a registered keypair are treated as view-only and fail
/// with `WalletSigningRequired`.
pub struct KeyringRunner {
    executor: SwapExecutor,
    keyring: RwLock<HashMap<Pubkey, Wallet>>,
}

impl KeyringRunner {
    pub fn new(executor: SwapExecutor) -> Self {
        Self {
            executor,
            keyring: RwLock::new(HashMap::new()),
        }
    }

    pub fn add_wallet(&self, wallet: Wallet) {
        self.keyring.write().insert(wallet.pubkey(), wallet);
    }

    pub fn remove_wallet(&self, owner: &Pubkey) -> Option<Wallet> {
        self.keyring.write().remove(owner)
    }

    pub fn wallet_for(&self, owner: &Pubkey) -> Wallet {
        self.keyring
            .read()
            .get(owner)
            .cloned()
            .unwrap_or(Wallet::ViewOnly(*owner))
    }
}

#[async_trait]
impl SwapRunner for KeyringRunner {
    async fn run(&self, order: SwapOrder) -> Result<SwapReceipt> {
        let wallet = self.wallet_for(&order.owner);
        let options = SwapOptions {
            slippage_bps: order.slippage_bps,
            ..SwapOptions::default()
        };

        let result = self
            .executor
            .execute_swap(
                &order.input_asset,
                &order.output_asset,
                order.amount,
                &wallet,
                &options,
            )
            .await?;
        Ok(result.receipt())
    }
}
