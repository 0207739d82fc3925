//! Recurring swaps on cron schedules and condition-driven triggers.
//!
//! Both registries are driven by `tick()`: the background driver started by
//! `start()` calls it on a fixed period, and tests call it directly after
//! advancing a `ManualClock`. Every fire runs as its own task so a slow or
//! failing swap never holds up other entries.

use std::time::Duration;

use async_trait::async_trait;
use jupflow_types::TriggerCondition;
use tracing::info;

use crate::error::Result;
use crate::swap::DEFAULT_SLIPPAGE_BPS;

mod clock;
mod events;
mod latch;
mod pulse;
mod runner;
mod schedule;
mod scheduler;
mod triggers;

pub use clock::{Clock, ManualClock, SystemClock};
pub use events::EventBus;
pub use runner::{KeyringRunner, SwapOrder, SwapRunner};
pub use schedule::CronSchedule;
pub use scheduler::Scheduler;
pub use triggers::{TriggerMonitor, TriggerServices};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutomationConfig {
    /// How often each enabled trigger is checked.
    pub poll_interval: Duration,
    /// Period of the background driver.
    pub tick_interval: Duration,
    /// Slippage for scheduled swaps registered without one.
    pub default_slippage_bps: u16,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            tick_interval: Duration::from_secs(1),
            default_slippage_bps: DEFAULT_SLIPPAGE_BPS,
        }
    }
}

/// Current price of an asset, consumed by price triggers.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn price(&self, asset: &str) -> Result<f64>;
}

/// Side-effect-only callback for `notify` triggers.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, condition: &TriggerCondition) -> Result<()>;
}

/// Evaluates `custom` triggers.
#[async_trait]
pub trait CustomCondition: Send + Sync {
    async fn evaluate(&self, condition: &TriggerCondition) -> Result<bool>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, condition: &TriggerCondition) -> Result<()> {
        let message = condition
            .action_parameters
            .message
            .as_deref()
            .unwrap_or("trigger condition met");
        info!(id = %condition.id, kind = %condition.kind, "Trigger notification: {}", message);
        Ok(())
    }
}

/// Custom condition used when none is supplied; never fires.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverFires;

#[async_trait]
impl CustomCondition for NeverFires {
    async fn evaluate(&self, _condition: &TriggerCondition) -> Result<bool> {
        Ok(false)
    }
}
