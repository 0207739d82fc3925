// Public modules that are part of the API
pub mod aggregator;
pub mod automation;
pub mod config;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod monitoring;
pub mod swap;
pub mod tokens;

// Re-export common types
pub use aggregator::{AggregatorApi, JupiterClient, QuoteResponse, TokenInfo};

pub use automation::{
    AutomationConfig, Clock, CustomCondition, EventBus, ManualClock, Notifier, PriceSource,
    SwapOrder, SwapRunner, SystemClock,
};

pub use engine::{EngineStatus, HealthReport, SwapEngine, SwapEngineBuilder};

pub use error::{Result, SwapError};

pub use ledger::{LedgerRpc, SimulationReport, SolanaLedger};

pub use swap::{
    RiskLevel, RouteComparison, RouteFilter, RoutingMode, SwapOptions, SwapResult, Wallet,
};

pub use jupflow_types::{
    ActionParameters, ComparisonOperator, EngineEvent, NewRecurringSwap, NewTrigger,
    RecurringSwapConfig, SwapReceipt, TriggerAction, TriggerCondition, TriggerKind,
};
