use dotenv::dotenv;
use jupflow::config::Settings;
use jupflow::monitoring::log_utils::{check_log_directory, prune_logs, MAX_LOG_FILES};
use jupflow::monitoring::{init_logging, spawn_event_logger};
use jupflow::{Result, SwapEngine};
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file first
    dotenv().ok();

    let settings = Settings::from_env()?;

    let console_level = std::env::var("RUST_LOG").unwrap_or_else(|_| settings.log_level.clone());
    let _guard = init_logging(&settings.log_dir, "debug", &console_level)?;

    let main_span = tracing::info_span!("main_execution");
    let _main_span_guard = main_span.enter();

    info!("Starting jupflow swap engine...");

    match check_log_directory(&settings.log_dir) {
        Ok(bytes) => info!(log_dir = %settings.log_dir, bytes, "Log directory ready"),
        Err(e) => warn!(error = %e, "Log directory check failed"),
    }
    if let Err(e) = prune_logs(&settings.log_dir, MAX_LOG_FILES) {
        warn!(error = %e, "Failed to prune old log files");
    }

    info!(
        rpc = %settings.solana_rpc_url,
        jupiter = %settings.jupiter_api_url,
        "Configuration loaded successfully"
    );

    let engine = SwapEngine::from_settings(&settings)?;
    match engine.wallet() {
        Some(wallet) => info!(owner = %wallet.pubkey(), "Wallet loaded"),
        None => warn!("No wallet configured; direct swaps are disabled"),
    }

    let health = engine.health_check().await;
    if !health.aggregator || !health.ledger {
        warn!(
            aggregator = health.aggregator,
            ledger = health.ledger,
            "Startup health check reported unreachable components"
        );
    }

    let event_logger = spawn_event_logger(engine.event_bus());
    engine.start();

    info!("Automation running. Press Ctrl+C to exit.");

    if let Err(e) = signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl+C");
    }

    info!("Shutting down...");
    engine.stop();
    event_logger.abort();

    info!(status = ?engine.get_status(), "Swap engine stopped");
    Ok(())
}
