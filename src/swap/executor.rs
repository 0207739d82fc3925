use std::sync::Arc;

use base64::prelude::*;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::transaction::VersionedTransaction;
use tracing::{info, instrument, warn};

use super::balance::BalanceGuard;
use super::quote::QuoteGateway;
use super::types::{
    BalanceCheck, PreparedSwap, QuoteRequest, SwapOptions, SwapResult, Wallet,
};
use crate::aggregator::{QuoteResponse, SwapRequest};
use crate::error::{retry_with_backoff, Result, SwapError};
use crate::ledger::{LedgerRpc, SimulationReport};

/// Turns a quote into a signed, submitted and confirmed transaction.
#[derive(Clone)]
pub struct SwapExecutor {
    gateway: QuoteGateway,
    balance_guard: BalanceGuard,
    ledger: Arc<dyn LedgerRpc>,
    max_retries: u32,
    retry_backoff_ms: u64,
}

impl SwapExecutor {
    pub fn new(gateway: QuoteGateway, ledger: Arc<dyn LedgerRpc>) -> Self {
        Self {
            gateway,
            balance_guard: BalanceGuard::new(ledger.clone()),
            ledger,
            max_retries: 3,
            retry_backoff_ms: 500,
        }
    }

    /// Retry policy for idempotent ledger reads such as the recent blockhash.
    pub fn with_retry_policy(mut self, max_retries: u32, retry_backoff_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.retry_backoff_ms = retry_backoff_ms;
        self
    }

    pub fn balance_guard(&self) -> &BalanceGuard {
        &self.balance_guard
    }

    /// Checks funds, quotes, signs, submits and waits for confirmation.
    ///
    /// View-only wallets are rejected before any quote is requested.
    #[instrument(skip(self, wallet, options), fields(owner = %wallet.pubkey()))]
    pub async fn execute_swap(
        &self,
        input_asset: &str,
        output_asset: &str,
        amount: u64,
        wallet: &Wallet,
        options: &SwapOptions,
    ) -> Result<SwapResult> {
        let owner = wallet.pubkey();

        let check = self.balance_guard.check_balance(&owner, input_asset, amount).await?;
        ensure_sufficient(input_asset, &check)?;

        let keypair = wallet.keypair().ok_or(SwapError::WalletSigningRequired)?;

        let quote = self
            .gateway
            .get_quote(&QuoteRequest::new(input_asset, output_asset, amount).with_options(options))
            .await?;

        let unsigned = self.build_swap_transaction(&quote, &owner, options).await?;
        if unsigned.message.static_account_keys().first() != Some(&owner) {
            return Err(SwapError::InvalidSwapResponse(format!(
                "transaction fee payer is not {}",
                owner
            )));
        }

        let blockhash = retry_with_backoff(
            || self.ledger.latest_blockhash(),
            self.max_retries,
            self.retry_backoff_ms,
        )
        .await?;

        let mut message = unsigned.message;
        message.set_recent_blockhash(blockhash);
        let transaction = VersionedTransaction::try_new(message, &[keypair.as_ref()])
            .map_err(|e| {
                SwapError::InvalidSwapResponse(format!("Failed to sign swap transaction: {}", e))
            })?;

        let signature = self.ledger.send_and_confirm(&transaction).await?;
        info!(%signature, input = %input_asset, output = %output_asset, amount, "Swap confirmed");

        Ok(SwapResult {
            signature,
            input_amount: quote.in_amount_u64()?,
            output_amount: quote.out_amount_u64()?,
            price_impact: quote.price_impact_percent(),
            route: quote,
            raw_transaction: transaction,
        })
    }

    /// Quotes and fetches the aggregator-built transaction without signing it.
    pub async fn create_swap_transaction(
        &self,
        input_asset: &str,
        output_asset: &str,
        amount: u64,
        owner: &Pubkey,
        options: &SwapOptions,
    ) -> Result<PreparedSwap> {
        let quote = self
            .gateway
            .get_quote(&QuoteRequest::new(input_asset, output_asset, amount).with_options(options))
            .await?;
        let transaction = self.build_swap_transaction(&quote, owner, options).await?;
        Ok(PreparedSwap { quote, transaction })
    }

    /// Builds the swap transaction and dry-runs it on the ledger.
    pub async fn simulate_swap(
        &self,
        input_asset: &str,
        output_asset: &str,
        amount: u64,
        owner: &Pubkey,
        options: &SwapOptions,
    ) -> Result<SimulationReport> {
        let prepared = self
            .create_swap_transaction(input_asset, output_asset, amount, owner, options)
            .await?;
        let report = self.ledger.simulate(&prepared.transaction).await?;
        if !report.success {
            warn!(error = ?report.error, "Swap simulation did not succeed");
        }
        Ok(report)
    }

    pub async fn build_swap_transaction(
        &self,
        quote: &QuoteResponse,
        owner: &Pubkey,
        options: &SwapOptions,
    ) -> Result<VersionedTransaction> {
        let request = SwapRequest {
            quote_response: quote.clone(),
            user_public_key: owner.to_string(),
            wrap_and_unwrap_sol: true,
            use_shared_accounts: options.use_shared_accounts,
            compute_unit_price_micro_lamports: options.compute_unit_price_micro_lamports,
            prioritization_fee_lamports: options.prioritization_fee_lamports,
            as_legacy_transaction: options.as_legacy_transaction,
            destination_token_account: options.destination_token_account.clone(),
            dynamic_compute_unit_limit: options.dynamic_compute_unit_limit,
            skip_user_accounts_rpc_calls: false,
        };

        let response = self
            .gateway
            .aggregator()
            .swap_transaction(&request)
            .await
            .map_err(|e| SwapError::swap_transaction_failed(&e))?;

        let encoded = response
            .swap_transaction
            .filter(|tx| !tx.is_empty())
            .ok_or_else(|| SwapError::InvalidSwapResponse("missing swapTransaction".into()))?;

        decode_transaction(&encoded)
    }
}

fn ensure_sufficient(asset: &str, check: &BalanceCheck) -> Result<()> {
    if check.sufficient {
        return Ok(());
    }
    Err(SwapError::InsufficientBalance {
        asset: asset.to_string(),
        required: check.required,
        available: check.available,
    })
}

fn decode_transaction(encoded: &str) -> Result<VersionedTransaction> {
    let bytes = BASE64_STANDARD
        .decode(encoded)
        .map_err(|e| {
            SwapError::InvalidSwapResponse(format!(
                "Failed to decode base64 swap transaction: {}",
                e
            ))
        })?;
    bincode::deserialize(&bytes).map_err(|e| {
        SwapError::InvalidSwapResponse(format!("Failed to deserialize transaction: {}", e))
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::aggregator::types::fixtures::{quote_with_hops, SOL_MINT, USDC_MINT};
    use crate::swap::testing::{encoded_unsigned_transaction, StubAggregator, StubLedger};
    use crate::swap::NATIVE_MINT;
    use pretty_assertions::assert_eq;
    use solana_sdk::signature::{Keypair, Signer};
    use spl_associated_token_account::get_associated_token_address;
    use std::str::FromStr;

    struct Harness {
        aggregator: Arc<StubAggregator>,
        ledger: Arc<StubLedger>,
        executor: SwapExecutor,
    }

    fn harness() -> Harness {
        let aggregator = Arc::new(StubAggregator::with_quote(quote_with_hops(
            612_000_000,
            "0.25",
            &["Orca"],
        )));
        let ledger = Arc::new(StubLedger::default());
        let executor = SwapExecutor::new(QuoteGateway::new(aggregator.clone(), 50), ledger.clone())
            .with_retry_policy(0, 1);
        Harness {
            aggregator,
            ledger,
            executor,
        }
    }

    fn fund_usdc(ledger: &StubLedger, owner: &Pubkey, amount: u64) {
        let mint = Pubkey::from_str(USDC_MINT).unwrap();
        ledger
            .token_accounts
            .lock()
            .insert(get_associated_token_address(owner, &mint), amount);
    }

    #[tokio::test]
    async fn test_execute_swap_signs_and_submits() {
        let h = harness();
        let keypair = Keypair::new();
        let owner = keypair.pubkey();
        fund_usdc(&h.ledger, &owner, 200_000_000);
        *h.aggregator.swap_transaction.lock() = Some(encoded_unsigned_transaction(&owner));

        let result = h
            .executor
            .execute_swap(
                USDC_MINT,
                SOL_MINT,
                100_000_000,
                &Wallet::from(keypair),
                &SwapOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(result.output_amount, 612_000_000);
        assert_eq!(result.input_amount, 100_000_000);
        assert_eq!(result.price_impact, 0.25);
        assert_eq!(result.signature, result.raw_transaction.signatures[0]);
        assert_eq!(h.ledger.sent.lock().len(), 1);
        assert!(result.raw_transaction.verify_with_results().iter().all(|ok| *ok));

        let requests = h.aggregator.swap_requests.lock();
        assert_eq!(requests[0].user_public_key, owner.to_string());
        assert!(requests[0].wrap_and_unwrap_sol);
    }

    #[tokio::test]
    async fn test_insufficient_balance_fails_before_quote() {
        let h = harness();
        let keypair = Keypair::new();
        h.ledger.native.lock().insert(keypair.pubkey(), 10);

        let err = h
            .executor
            .execute_swap(
                NATIVE_MINT,
                USDC_MINT,
                1_000,
                &Wallet::from(keypair),
                &SwapOptions::default(),
            )
            .await
            .unwrap_err();

        match err {
            SwapError::InsufficientBalance { asset, required, available } => {
                assert_eq!(asset, NATIVE_MINT);
                assert_eq!(required, 1_000);
                assert_eq!(available, 10);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(h.aggregator.quote_queries.lock().is_empty());
    }

    #[tokio::test]
    async fn test_view_only_wallet_requires_signing() {
        let h = harness();
        let owner = Pubkey::new_unique();
        fund_usdc(&h.ledger, &owner, 200_000_000);

        let err = h
            .executor
            .execute_swap(
                USDC_MINT,
                SOL_MINT,
                100,
                &Wallet::ViewOnly(owner),
                &SwapOptions::default(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "WALLET_SIGNING_REQUIRED");
        assert_eq!(h.aggregator.swap_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_garbage_transaction_is_invalid_swap_response() {
        let h = harness();
        let keypair = Keypair::new();
        fund_usdc(&h.ledger, &keypair.pubkey(), 200);
        *h.aggregator.swap_transaction.lock() = Some("not base64!".to_string());

        let err = h
            .executor
            .execute_swap(USDC_MINT, SOL_MINT, 100, &Wallet::from(keypair), &SwapOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_SWAP_RESPONSE");
        assert!(h.ledger.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_foreign_fee_payer_is_rejected() {
        let h = harness();
        let keypair = Keypair::new();
        fund_usdc(&h.ledger, &keypair.pubkey(), 200);
        let foreign = encoded_unsigned_transaction(&Pubkey::new_unique());
        *h.aggregator.swap_transaction.lock() = Some(foreign);

        let err = h
            .executor
            .execute_swap(USDC_MINT, SOL_MINT, 100, &Wallet::from(keypair), &SwapOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_SWAP_RESPONSE");
    }

    #[tokio::test]
    async fn test_create_and_simulate_do_not_submit() {
        let h = harness();
        let owner = Pubkey::new_unique();
        *h.aggregator.swap_transaction.lock() = Some(encoded_unsigned_transaction(&owner));

        let prepared = h
            .executor
            .create_swap_transaction(USDC_MINT, SOL_MINT, 100, &owner, &SwapOptions::default())
            .await
            .unwrap();
        assert_eq!(prepared.quote.out_amount, "612000000");
        assert_eq!(prepared.transaction.message.static_account_keys()[0], owner);

        let report = h
            .executor
            .simulate_swap(USDC_MINT, SOL_MINT, 100, &owner, &SwapOptions::default())
            .await
            .unwrap();
        assert!(report.success);
        assert_eq!(report.units_consumed, Some(42_000));
        assert!(h.ledger.sent.lock().is_empty());
    }
}
