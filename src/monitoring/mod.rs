use std::path::Path;

use jupflow_types::EngineEvent;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::automation::EventBus;
use crate::error::{Result, SwapError};

mod health;
pub mod log_utils;

pub use health::{check_aggregator, check_ledger, ComponentHealth, ComponentStatus};

pub const LOG_FILE_NAME: &str = "jupflow.log";

/// Initializes the logging system (both console and file).
/// Returns a guard that must be kept alive for file logging to work.
pub fn init_logging(log_dir: &str, file_level: &str, console_level: &str) -> Result<WorkerGuard> {
    let log_path = Path::new(log_dir);
    if !log_path.exists() {
        std::fs::create_dir_all(log_path)?;
    }

    // --- File Logger ---
    let file_appender = rolling::daily(log_dir, LOG_FILE_NAME);
    let (non_blocking_appender, guard) = tracing_appender::non_blocking(file_appender);

    let file_filter = EnvFilter::try_new(file_level).map_err(|e| {
        SwapError::ConfigError(format!("Invalid file log level filter '{}': {}", file_level, e))
    })?;
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_appender)
        .with_ansi(false)
        .with_span_events(FmtSpan::CLOSE)
        .json()
        .with_filter(file_filter);

    // --- Console Logger ---
    let console_filter = EnvFilter::try_new(console_level).map_err(|e| {
        SwapError::ConfigError(format!(
            "Invalid console log level filter '{}': {}",
            console_level, e
        ))
    })?;
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(false)
        .with_filter(console_filter);

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| {
            SwapError::InternalError(format!("Failed to initialize tracing subscriber: {}", e))
        })?;

    Ok(guard)
}

/// Logs every engine event until the bus is dropped. Failures log at `warn`.
pub fn spawn_event_logger(bus: &EventBus) -> JoinHandle<()> {
    let mut events = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => log_event(&event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(target: "engine_events", skipped, "Event logger lagged behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
        debug!(target: "engine_events", "Event stream closed");
    })
}

fn log_event(event: &EngineEvent) {
    let name = event.name();
    match event {
        EngineEvent::SwapExecuted { config, receipt } => info!(
            target: "engine_events",
            event = name,
            id = %config.id,
            signature = %receipt.signature,
            output_amount = receipt.output_amount,
            "Scheduled swap executed"
        ),
        EngineEvent::SwapFailed { config, error } => warn!(
            target: "engine_events",
            event = name,
            id = %config.id,
            code = %error.code,
            "Scheduled swap failed: {}", error.message
        ),
        EngineEvent::TriggerFailed { condition, error }
        | EngineEvent::TriggerCheckFailed { condition, error } => warn!(
            target: "engine_events",
            event = name,
            id = %condition.id,
            code = %error.code,
            "Trigger failed: {}", error.message
        ),
        EngineEvent::TriggerExecuted { condition, receipt } => info!(
            target: "engine_events",
            event = name,
            id = %condition.id,
            signature = receipt.as_ref().map(|r| r.signature.as_str()).unwrap_or("-"),
            "Trigger executed"
        ),
        EngineEvent::SwapExecuting(_) | EngineEvent::TriggerExecuting(_) => {
            debug!(target: "engine_events", event = name)
        }
        _ => info!(target: "engine_events", event = name),
    }
}
