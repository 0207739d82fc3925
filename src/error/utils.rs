use super::SwapError;
use tokio::time::{sleep, Duration};
use tracing::{error, warn};

/// Retries a fallible async operation with exponential backoff.
///
/// Only meant for idempotent reads (recent blockhash, balances). Quotes and
/// swap submissions are never retried here; callers own that policy.
///
/// # Arguments
/// * `operation` - An async closure that returns a Result
/// * `max_retries` - Maximum number of retry attempts
/// * `initial_delay_ms` - Initial delay in milliseconds, which doubles after each attempt
pub async fn retry_with_backoff<F, Fut, T>(
    operation: F,
    max_retries: u32,
    initial_delay_ms: u64,
) -> std::result::Result<T, SwapError>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = std::result::Result<T, SwapError>>,
{
    let mut current_retry = 0;
    let mut delay_ms = initial_delay_ms;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if current_retry >= max_retries || !e.is_retryable() {
                    return Err(e);
                }
                warn!(
                    delay_ms,
                    attempt = current_retry + 1,
                    error = %e,
                    "Operation failed, retrying"
                );
                sleep(Duration::from_millis(delay_ms)).await;
                current_retry += 1;
                delay_ms = delay_ms.saturating_mul(2);
            }
        }
    }
}

/// Logs an error with appropriate severity based on the error type.
///
/// # Arguments
/// * `error` - The SwapError to log
/// * `context` - Additional context about where/how the error occurred
pub fn log_error(error: &SwapError, context: &str) {
    match error {
        SwapError::InsufficientBalance { asset, required, available } => {
            warn!(asset = %asset, required, available, "{} - insufficient balance", context);
        }
        SwapError::QuoteFailed { status, .. }
        | SwapError::RouteOptionsFailed { status, .. }
        | SwapError::SwapTransactionFailed { status, .. } => {
            warn!(code = error.code(), status = ?status, "{} - {}", context, error);
        }
        SwapError::Api { service, status, message } => {
            if status.map_or(true, |s| s >= 500) {
                error!(service = %service, status = ?status, "{} - API error: {}", context, message);
            } else {
                warn!(service = %service, status = ?status, "{} - API error: {}", context, message);
            }
        }
        SwapError::TransactionFailed { message, details } => {
            error!(details = ?details, "{} - Transaction failed: {}", context, message);
        }
        SwapError::SolanaRpc(msg) | SwapError::BalanceCheckFailed(msg) => {
            warn!(code = error.code(), "{} - RPC error: {}", context, msg);
        }
        SwapError::ConfigError(msg) => {
            error!("{} - Configuration error: {}", context, msg);
        }
        SwapError::InternalError(msg) => {
            error!("{} - Internal error: {}", context, msg);
        }
        _ => error!(code = error.code(), "{} - {}", context, error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_retries_transient_errors_until_success() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(
            || {
                let attempt = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 2 {
                        Err(SwapError::SolanaRpc("node is behind".into()))
                    } else {
                        Ok(attempt)
                    }
                }
            },
            3,
            1,
        )
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_does_not_retry_permanent_errors() {
        let calls = AtomicU32::new(0);
        let result: std::result::Result<(), _> = retry_with_backoff(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(SwapError::WalletSigningRequired) }
            },
            3,
            1,
        )
        .await;

        assert!(matches!(result, Err(SwapError::WalletSigningRequired)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
