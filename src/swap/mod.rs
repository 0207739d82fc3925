//! Quote, compare, guard and execute swaps.

mod balance;
mod executor;
mod quote;
mod scorer;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use balance::BalanceGuard;
pub use executor::SwapExecutor;
pub use quote::QuoteGateway;
pub use scorer::{RouteScorer, ScorerWeights};
pub use types::{
    lamports_to_sol, sol_to_lamports, BalanceCheck, PreparedSwap, QuoteRequest, RiskLevel,
    RouteComparison, RouteFilter, RoutingMode, SwapOptions, SwapResult, Wallet,
    DEFAULT_COMPARISON_SLIPPAGE_BPS, DEFAULT_SLIPPAGE_BPS, NATIVE_MINT,
};
