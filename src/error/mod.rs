use jupflow_types::{EventError, TriggerKind};
use thiserror::Error;

mod utils;
pub use utils::*;

#[derive(Error, Debug)]
pub enum SwapError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Failed to get quote: {message}")]
    QuoteFailed {
        message: String,
        status: Option<u16>,
    },

    #[error("Failed to get route options: {message}")]
    RouteOptionsFailed {
        message: String,
        status: Option<u16>,
    },

    #[error("Invalid swap transaction response: {0}")]
    InvalidSwapResponse(String),

    #[error("Failed to create swap transaction: {message}")]
    SwapTransactionFailed {
        message: String,
        status: Option<u16>,
    },

    #[error("Insufficient {asset} balance. Required: {required}, Available: {available}")]
    InsufficientBalance {
        asset: String,
        required: u64,
        available: u64,
    },

    #[error("Direct transaction signing requires a keypair. Use a wallet adapter for view-only wallets")]
    WalletSigningRequired,

    #[error("Wallet not configured")]
    WalletRequired,

    #[error("Transaction failed: {message}")]
    TransactionFailed {
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("Failed to check balance: {0}")]
    BalanceCheckFailed(String),

    #[error("Scheduled swap not found: {0}")]
    ScheduledSwapNotFound(String),

    #[error("Trigger not found: {0}")]
    TriggerNotFound(String),

    #[error("Token required for {0} condition")]
    TokenRequired(TriggerKind),

    #[error("Invalid cron expression '{expression}': {reason}")]
    InvalidCron { expression: String, reason: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid trigger action parameters: {0}")]
    InvalidActionParameters(String),

    #[error("Token not found: {0}")]
    TokenNotFound(String),

    #[error("Failed to get token metadata: {0}")]
    TokenMetadataFailed(String),

    #[error("Failed to get token price: {0}")]
    PriceFailed(String),

    #[error("Swap simulation failed: {0}")]
    SimulationFailed(String),

    #[error("API error: {service} - {message}")]
    Api {
        service: String,
        message: String,
        status: Option<u16>,
    },

    #[error("Solana RPC error: {0}")]
    SolanaRpc(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type Result<T> = std::result::Result<T, SwapError>;

impl SwapError {
    pub fn api(
        service: impl Into<String>,
        message: impl Into<String>,
        status: Option<u16>,
    ) -> Self {
        SwapError::Api {
            service: service.into(),
            message: message.into(),
            status,
        }
    }

    pub fn quote_failed(source: &SwapError) -> Self {
        SwapError::QuoteFailed {
            message: source.upstream_message(),
            status: source.status(),
        }
    }

    pub fn route_options_failed(source: &SwapError) -> Self {
        SwapError::RouteOptionsFailed {
            message: source.upstream_message(),
            status: source.status(),
        }
    }

    pub fn swap_transaction_failed(source: &SwapError) -> Self {
        SwapError::SwapTransactionFailed {
            message: source.upstream_message(),
            status: source.status(),
        }
    }

    /// Machine-readable code for callers and event listeners.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) | Self::ConfigError(_) => "CONFIG_ERROR",
            Self::QuoteFailed { .. } => "QUOTE_FAILED",
            Self::RouteOptionsFailed { .. } => "ROUTE_OPTIONS_FAILED",
            Self::InvalidSwapResponse(_) => "INVALID_SWAP_RESPONSE",
            Self::SwapTransactionFailed { .. } => "SWAP_TRANSACTION_FAILED",
            Self::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            Self::WalletSigningRequired => "WALLET_SIGNING_REQUIRED",
            Self::WalletRequired => "WALLET_REQUIRED",
            Self::TransactionFailed { .. } => "TRANSACTION_FAILED",
            Self::BalanceCheckFailed(_) => "BALANCE_CHECK_FAILED",
            Self::ScheduledSwapNotFound(_) => "SCHEDULED_SWAP_NOT_FOUND",
            Self::TriggerNotFound(_) => "TRIGGER_NOT_FOUND",
            Self::TokenRequired(_) => "TOKEN_REQUIRED",
            Self::InvalidCron { .. } => "INVALID_CRON",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::InvalidActionParameters(_) => "INVALID_ACTION_PARAMETERS",
            Self::TokenNotFound(_) => "TOKEN_NOT_FOUND",
            Self::TokenMetadataFailed(_) => "TOKEN_METADATA_FAILED",
            Self::PriceFailed(_) => "TOKEN_PRICE_FAILED",
            Self::SimulationFailed(_) => "SIMULATION_FAILED",
            Self::Api { .. } => "API_ERROR",
            Self::SolanaRpc(_) => "SOLANA_RPC_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP status of the upstream response, when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. }
            | Self::QuoteFailed { status, .. }
            | Self::RouteOptionsFailed { status, .. }
            | Self::SwapTransactionFailed { status, .. } => *status,
            _ => None,
        }
    }

    fn upstream_message(&self) -> String {
        match self {
            Self::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::SolanaRpc(_) | Self::BalanceCheckFailed(_) => true,
            Self::Api { status: None, .. } => true,
            other => other.status().map_or(false, |status| status >= 500),
        }
    }

    pub fn to_event_error(&self) -> EventError {
        EventError {
            code: self.code().to_string(),
            message: self.to_string(),
        }
    }
}

impl From<reqwest::Error> for SwapError {
    fn from(err: reqwest::Error) -> Self {
        SwapError::Api {
            service: "http".to_string(),
            status: err.status().map(|status| status.as_u16()),
            message: err.to_string(),
        }
    }
}
