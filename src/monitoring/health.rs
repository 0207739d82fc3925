use std::fmt;
use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

use crate::aggregator::AggregatorApi;
use crate::ledger::LedgerRpc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "lowercase")]
pub enum ComponentStatus {
    Ok,
    Error(String),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentHealth {
    pub name: String,
    pub status: ComponentStatus,
    pub latency_ms: u64,
}

impl ComponentHealth {
    pub fn is_ok(&self) -> bool {
        self.status == ComponentStatus::Ok
    }
}

impl fmt::Display for ComponentHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            ComponentStatus::Ok => write!(f, "{}: ok ({} ms)", self.name, self.latency_ms),
            ComponentStatus::Error(msg) => write!(f, "{}: error ({})", self.name, msg),
        }
    }
}

fn finish(name: &str, started: Instant, outcome: Result<(), String>) -> ComponentHealth {
    let latency_ms = started.elapsed().as_millis() as u64;
    let status = match outcome {
        Ok(()) => {
            info!(target: "health_check", component = name, latency_ms, "Health check passed");
            ComponentStatus::Ok
        }
        Err(msg) => {
            warn!(target: "health_check", component = name, message = %msg, "Health check failed");
            ComponentStatus::Error(msg)
        }
    };
    ComponentHealth {
        name: name.to_string(),
        status,
        latency_ms,
    }
}

/// Checks the aggregator answers HTTP requests.
pub async fn check_aggregator(aggregator: &dyn AggregatorApi) -> ComponentHealth {
    let started = Instant::now();
    let outcome = aggregator.health().await.map_err(|e| e.to_string());
    finish("Jupiter API", started, outcome)
}

/// Checks the ledger RPC returns the current slot.
pub async fn check_ledger(ledger: &dyn LedgerRpc) -> ComponentHealth {
    let started = Instant::now();
    let outcome = ledger
        .health()
        .await
        .map(|slot| tracing::debug!(target: "health_check", slot, "Ledger slot"))
        .map_err(|e| e.to_string());
    finish("Solana RPC", started, outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::swap::testing::{StubAggregator, StubLedger};

    #[tokio::test]
    async fn test_healthy_components() {
        let aggregator = StubAggregator::default();
        let ledger = StubLedger::default();

        let health = check_aggregator(&aggregator).await;
        assert!(health.is_ok());
        assert_eq!(health.name, "Jupiter API");

        assert!(check_ledger(&ledger).await.is_ok());
    }

    #[test]
    fn test_status_serialization() {
        let health = ComponentHealth {
            name: "Solana RPC".into(),
            status: ComponentStatus::Error("timeout".into()),
            latency_ms: 5,
        };
        let value = serde_json::to_value(&health).unwrap();
        assert_eq!(value["status"]["status"], "error");
        assert_eq!(value["status"]["message"], "timeout");
        assert_eq!(health.to_string(), "Solana RPC: error (timeout)");
    }
}
