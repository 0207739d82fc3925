use std::sync::Arc;

use jupflow_types::{
    EngineEvent, NewRecurringSwap, NewTrigger, RecurringSwapConfig, TriggerCondition,
};
use parking_lot::RwLock;
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;
use tokio::sync::broadcast;
use tracing::{info, instrument};

use crate::aggregator::{AggregatorApi, JupiterClient, QuoteResponse, TokenInfo};
use crate::automation::{
    Clock, CustomCondition, EventBus, KeyringRunner, LogNotifier, NeverFires, Notifier,
    PriceSource, Scheduler, SwapRunner, SystemClock, TriggerMonitor, TriggerServices,
};
use crate::config::Settings;
use crate::error::{Result, SwapError};
use crate::ledger::{LedgerRpc, SimulationReport, SolanaLedger};
use crate::monitoring::{check_aggregator, check_ledger};
use crate::swap::{
    BalanceCheck, PreparedSwap, QuoteGateway, QuoteRequest, RouteComparison, RouteFilter,
    RouteScorer, SwapExecutor, SwapOptions, SwapResult, Wallet,
};
use crate::tokens::TokenService;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatus {
    pub running: bool,
    pub scheduled_swap_count: usize,
    pub trigger_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub aggregator: bool,
    pub ledger: bool,
}

/// Client-side swap engine: quoting, route comparison, execution and
/// automation over one aggregator and one ledger.
pub struct SwapEngine {
    /// Quote requests against the aggregator
    gateway: QuoteGateway,
    /// Ranks candidate routes
    scorer: RouteScorer,
    /// Balance check, signing and submission
    executor: SwapExecutor,
    /// Token metadata and prices
    tokens: Arc<TokenService>,
    /// Wallets automated swaps may sign with
    keyring: Arc<KeyringRunner>,
    scheduler: Scheduler,
    triggers: TriggerMonitor,
    bus: EventBus,
    aggregator: Arc<dyn AggregatorApi>,
    ledger: Arc<dyn LedgerRpc>,
    /// Default signer for direct swaps
    wallet: RwLock<Option<Wallet>>,
}

/// Assembles a `SwapEngine` around an aggregator and a ledger.
pub struct SwapEngineBuilder {
    aggregator: Arc<dyn AggregatorApi>,
    ledger: Arc<dyn LedgerRpc>,
    settings: Settings,
    clock: Arc<dyn Clock>,
    bus: EventBus,
    wallet: Option<Wallet>,
    price_source: Option<Arc<dyn PriceSource>>,
    runner: Option<Arc<dyn SwapRunner>>,
    notifier: Arc<dyn Notifier>,
    custom_condition: Arc<dyn CustomCondition>,
}

impl SwapEngineBuilder {
    pub fn new(aggregator: Arc<dyn AggregatorApi>, ledger: Arc<dyn LedgerRpc>) -> Self {
        Self {
            aggregator,
            ledger,
            settings: Settings::default(),
            clock: Arc::new(SystemClock),
            bus: EventBus::default(),
            wallet: None,
            price_source: None,
            runner: None,
            notifier: Arc::new(LogNotifier),
            custom_condition: Arc::new(NeverFires),
        }
    }

    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn event_bus(mut self, bus: EventBus) -> Self {
        self.bus = bus;
        self
    }

    pub fn wallet(mut self, wallet: Wallet) -> Self {
        self.wallet = Some(wallet);
        self
    }

    /// Price feed for price triggers. Defaults to the token service.
    pub fn price_source(mut self, price_source: Arc<dyn PriceSource>) -> Self {
        self.price_source = Some(price_source);
        self
    }

    /// Executor of automated swaps. Defaults to the engine's keyring runner.
    pub fn swap_runner(mut self, runner: Arc<dyn SwapRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn custom_condition(mut self, custom_condition: Arc<dyn CustomCondition>) -> Self {
        self.custom_condition = custom_condition;
        self
    }

    pub fn build(self) -> SwapEngine {
        let settings = self.settings;
        let automation = settings.automation_config();

        let gateway = QuoteGateway::new(self.aggregator.clone(), settings.default_slippage_bps);
        let scorer = RouteScorer::new(
            gateway.clone(),
            settings.scorer_weights(),
            settings.comparison_slippage_bps,
        );
        let executor = SwapExecutor::new(gateway.clone(), self.ledger.clone())
            .with_retry_policy(settings.max_retries, settings.retry_backoff_ms);
        let tokens = Arc::new(TokenService::new(
            self.aggregator.clone(),
            settings.token_cache_ttl(),
        ));

        let keyring = Arc::new(KeyringRunner::new(executor.clone()));
        if let Some(wallet) = &self.wallet {
            keyring.add_wallet(wallet.clone());
        }
        let runner = self
            .runner
            .unwrap_or_else(|| keyring.clone() as Arc<dyn SwapRunner>);

        let scheduler = Scheduler::new(
            runner.clone(),
            self.bus.clone(),
            self.clock.clone(),
            &automation,
        );
        let triggers = TriggerMonitor::new(
            TriggerServices {
                prices: self
                    .price_source
                    .unwrap_or_else(|| tokens.clone() as Arc<dyn PriceSource>),
                balances: executor.balance_guard().clone(),
                runner,
                notifier: self.notifier,
                custom: self.custom_condition,
            },
            self.bus.clone(),
            self.clock,
            &automation,
        );

        SwapEngine {
            gateway,
            scorer,
            executor,
            tokens,
            keyring,
            scheduler,
            triggers,
            bus: self.bus,
            aggregator: self.aggregator,
            ledger: self.ledger,
            wallet: RwLock::new(self.wallet),
        }
    }
}

impl SwapEngine {
    pub fn builder(
        aggregator: Arc<dyn AggregatorApi>,
        ledger: Arc<dyn LedgerRpc>,
    ) -> SwapEngineBuilder {
        SwapEngineBuilder::new(aggregator, ledger)
    }

    /// Wires the Jupiter HTTP client, the Solana RPC client and the
    /// configured wallet, if any.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let aggregator = Arc::new(JupiterClient::from_settings(settings)?);
        let ledger = Arc::new(SolanaLedger::from_settings(settings)?);

        let mut builder = Self::builder(aggregator, ledger).settings(settings.clone());
        if let Some(keypair) = settings.wallet_keypair()? {
            builder = builder.wallet(Wallet::from(keypair));
        }
        Ok(builder.build())
    }

    // --- Quoting and execution ---

    pub async fn get_quote(
        &self,
        input_asset: &str,
        output_asset: &str,
        amount: u64,
        options: &SwapOptions,
    ) -> Result<QuoteResponse> {
        let request = QuoteRequest::new(input_asset, output_asset, amount).with_options(options);
        self.gateway.get_quote(&request).await
    }

    pub async fn get_route_options(
        &self,
        input_asset: &str,
        output_asset: &str,
        amount: u64,
        filter: Option<&RouteFilter>,
    ) -> Result<Vec<RouteComparison>> {
        self.scorer
            .compare_routes(input_asset, output_asset, amount, filter)
            .await
    }

    /// Executes a swap signed by the configured wallet.
    pub async fn execute_swap(
        &self,
        input_asset: &str,
        output_asset: &str,
        amount: u64,
        options: &SwapOptions,
    ) -> Result<SwapResult> {
        let wallet = self.wallet().ok_or(SwapError::WalletRequired)?;
        self.execute_swap_with(input_asset, output_asset, amount, &wallet, options)
            .await
    }

    pub async fn execute_swap_with(
        &self,
        input_asset: &str,
        output_asset: &str,
        amount: u64,
        wallet: &Wallet,
        options: &SwapOptions,
    ) -> Result<SwapResult> {
        self.executor
            .execute_swap(input_asset, output_asset, amount, wallet, options)
            .await
    }

    /// Unsigned swap transaction for `owner`, or for the configured wallet.
    pub async fn create_swap_transaction(
        &self,
        input_asset: &str,
        output_asset: &str,
        amount: u64,
        owner: Option<&Pubkey>,
        options: &SwapOptions,
    ) -> Result<PreparedSwap> {
        let owner = self.resolve_owner(owner)?;
        self.executor
            .create_swap_transaction(input_asset, output_asset, amount, &owner, options)
            .await
    }

    pub async fn simulate_swap(
        &self,
        input_asset: &str,
        output_asset: &str,
        amount: u64,
        owner: Option<&Pubkey>,
        options: &SwapOptions,
    ) -> Result<SimulationReport> {
        let owner = self.resolve_owner(owner)?;
        self.executor
            .simulate_swap(input_asset, output_asset, amount, &owner, options)
            .await
    }

    pub async fn check_balance(
        &self,
        wallet: &Wallet,
        asset: &str,
        required: u64,
    ) -> Result<BalanceCheck> {
        self.executor
            .balance_guard()
            .check_balance(&wallet.pubkey(), asset, required)
            .await
    }

    fn resolve_owner(&self, owner: Option<&Pubkey>) -> Result<Pubkey> {
        match owner {
            Some(owner) => Ok(*owner),
            None => self
                .wallet()
                .map(|wallet| wallet.pubkey())
                .ok_or(SwapError::WalletRequired),
        }
    }

    // --- Tokens ---

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub async fn supported_tokens(&self) -> Result<Vec<TokenInfo>> {
        self.tokens.supported_tokens().await
    }

    pub async fn token_metadata(&self, mint: &str) -> Result<TokenInfo> {
        self.tokens.token_metadata(mint).await
    }

    pub async fn token_price(&self, mint: &str) -> Result<f64> {
        self.tokens.token_price(mint).await
    }

    pub async fn sol_price(&self) -> Result<f64> {
        self.tokens.sol_price().await
    }

    pub async fn search_tokens(&self, query: &str) -> Result<Vec<TokenInfo>> {
        self.tokens.search_tokens(query).await
    }

    // --- Scheduled swaps ---

    pub fn schedule_recurring_swap(
        &self,
        request: NewRecurringSwap,
    ) -> Result<RecurringSwapConfig> {
        self.scheduler.schedule(request)
    }

    pub fn get_scheduled_swaps(&self) -> Vec<RecurringSwapConfig> {
        self.scheduler.list()
    }

    pub fn cancel_scheduled_swap(&self, id: &str) -> Result<()> {
        self.scheduler.cancel(id)
    }

    pub fn toggle_scheduled_swap(&self, id: &str, enabled: bool) -> Result<RecurringSwapConfig> {
        self.scheduler.toggle(id, enabled)
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    // --- Triggers ---

    pub fn set_trigger(&self, request: NewTrigger) -> Result<TriggerCondition> {
        self.triggers.set_trigger(request)
    }

    pub fn get_triggers(&self) -> Vec<TriggerCondition> {
        self.triggers.list()
    }

    pub fn remove_trigger(&self, id: &str) -> Result<()> {
        self.triggers.remove(id)
    }

    pub fn toggle_trigger(&self, id: &str, enabled: bool) -> Result<TriggerCondition> {
        self.triggers.toggle(id, enabled)
    }

    pub fn trigger_monitor(&self) -> &TriggerMonitor {
        &self.triggers
    }

    // --- Lifecycle ---

    /// Starts the scheduler and trigger drivers, clearing any earlier `stop`.
    /// Must run inside a tokio runtime.
    ///
    /// Drivers also start on their own with the first enabled registration,
    /// so calling this is only required after `stop`.
    #[instrument(skip(self))]
    pub fn start(&self) {
        let was_running = self.is_running();
        self.scheduler.start();
        self.triggers.start();
        if was_running {
            return;
        }
        info!(
            scheduled_swaps = self.scheduler.len(),
            triggers = self.triggers.len(),
            "Automation started"
        );
        self.bus.publish(EngineEvent::SchedulerStarted);
    }

    /// Pauses every schedule and trigger until the next `start`.
    /// Registrations are kept, and new ones stay idle while paused.
    #[instrument(skip(self))]
    pub fn stop(&self) {
        let was_running = self.is_running();
        self.scheduler.stop();
        self.triggers.stop();
        if !was_running {
            return;
        }
        info!("Automation stopped");
        self.bus.publish(EngineEvent::SchedulerStopped);
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running() || self.triggers.is_running()
    }

    pub fn get_status(&self) -> EngineStatus {
        EngineStatus {
            running: self.is_running(),
            scheduled_swap_count: self.scheduler.len(),
            trigger_count: self.triggers.len(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.bus.subscribe()
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.bus
    }

    pub async fn health_check(&self) -> HealthReport {
        let (aggregator, ledger) = futures::join!(
            check_aggregator(self.aggregator.as_ref()),
            check_ledger(self.ledger.as_ref())
        );
        HealthReport {
            aggregator: aggregator.is_ok(),
            ledger: ledger.is_ok(),
        }
    }

    // --- Wallet ---

    /// Sets the default signer and lets automated swaps sign for it.
    pub fn set_wallet(&self, wallet: Wallet) {
        info!(owner = %wallet.pubkey(), signable = wallet.can_sign(), "Wallet configured");
        self.keyring.add_wallet(wallet.clone());
        *self.wallet.write() = Some(wallet);
    }

    pub fn wallet(&self) -> Option<Wallet> {
        self.wallet.read().clone()
    }

    /// Registers an additional signer for automated swaps of its owner.
    pub fn add_automation_wallet(&self, wallet: Wallet) {
        self.keyring.add_wallet(wallet);
    }
}

impl Drop for SwapEngine {
    fn drop(&mut self) {
        self.scheduler.stop();
        self.triggers.stop();
    }
}
