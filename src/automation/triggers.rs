use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use jupflow_types::{
    EngineEvent, NewTrigger, SwapReceipt, TriggerAction, TriggerCondition, TriggerKind,
};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::clock::Clock;
use super::events::EventBus;
use super::latch::{BusyGuard, BusyLatch};
use super::pulse::Pulse;
use super::runner::{SwapOrder, SwapRunner};
use super::{AutomationConfig, CustomCondition, Notifier, PriceSource};
use crate::error::{log_error, Result, SwapError};
use crate::swap::BalanceGuard;

struct TriggerEntry {
    condition: TriggerCondition,
    next_poll: Option<DateTime<Utc>>,
    busy: BusyLatch,
}

impl TriggerEntry {
    fn arm(&mut self, now: DateTime<Utc>, interval: chrono::Duration) {
        self.next_poll = self.condition.enabled.then(|| now + interval);
    }
}

/// Collaborators a trigger check or action may reach.
#[derive(Clone)]
pub struct TriggerServices {
    pub prices: Arc<dyn PriceSource>,
    pub balances: BalanceGuard,
    pub runner: Arc<dyn SwapRunner>,
    pub notifier: Arc<dyn Notifier>,
    pub custom: Arc<dyn CustomCondition>,
}

#[derive(Clone)]
struct MonitorCore {
    entries: Arc<Mutex<HashMap<String, TriggerEntry>>>,
    services: TriggerServices,
    bus: EventBus,
    clock: Arc<dyn Clock>,
    poll_interval: chrono::Duration,
}

/// Registry of condition → action rules polled on a fixed interval.
///
/// Polling starts with the first enabled trigger when a tokio runtime is
/// available. `stop` pauses it until the next `start`.
pub struct TriggerMonitor {
    core: MonitorCore,
    pulse: Pulse,
    paused: AtomicBool,
    tick_interval: Duration,
}

impl TriggerMonitor {
    pub fn new(
        services: TriggerServices,
        bus: EventBus,
        clock: Arc<dyn Clock>,
        config: &AutomationConfig,
    ) -> Self {
        let poll_interval = chrono::Duration::from_std(config.poll_interval)
            .unwrap_or_else(|_| chrono::Duration::seconds(30));

        Self {
            core: MonitorCore {
                entries: Arc::new(Mutex::new(HashMap::new())),
                services,
                bus,
                clock,
                poll_interval,
            },
            pulse: Pulse::default(),
            paused: AtomicBool::new(false),
            tick_interval: config.tick_interval,
        }
    }

    pub fn poll_interval(&self) -> chrono::Duration {
        self.core.poll_interval
    }

    /// Validates and registers a trigger. Nothing is registered on error.
    #[instrument(skip(self, request), fields(kind = %request.kind, action = %request.action))]
    pub fn set_trigger(&self, request: NewTrigger) -> Result<TriggerCondition> {
        let condition = TriggerCondition {
            id: format!("trigger_{}", Uuid::new_v4().simple()),
            kind: request.kind,
            watched_asset: request
                .watched_asset
                .map(|asset| asset.trim().to_string())
                .filter(|asset| !asset.is_empty()),
            operator: request.operator,
            threshold: request.threshold,
            action: request.action,
            action_parameters: request.action_parameters,
            enabled: request.enabled,
            created_at: self.core.clock.now(),
        };
        validate(&condition)?;

        let mut entry = TriggerEntry {
            condition: condition.clone(),
            next_poll: None,
            busy: BusyLatch::default(),
        };
        if !self.is_paused() {
            entry.arm(condition.created_at, self.core.poll_interval);
        }

        info!(id = %condition.id, "Trigger set");
        self.core.entries.lock().insert(condition.id.clone(), entry);
        self.core.bus.publish(EngineEvent::TriggerSet(condition.clone()));
        if condition.enabled {
            self.ensure_driver();
        }
        Ok(condition)
    }

    /// Registered triggers, oldest first.
    pub fn list(&self) -> Vec<TriggerCondition> {
        let mut conditions: Vec<TriggerCondition> = self
            .core
            .entries
            .lock()
            .values()
            .map(|entry| entry.condition.clone())
            .collect();
        conditions.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        conditions
    }

    pub fn get(&self, id: &str) -> Option<TriggerCondition> {
        self.core.entries.lock().get(id).map(|entry| entry.condition.clone())
    }

    pub fn next_poll(&self, id: &str) -> Option<DateTime<Utc>> {
        self.core.entries.lock().get(id).and_then(|entry| entry.next_poll)
    }

    pub fn len(&self) -> usize {
        self.core.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn remove(&self, id: &str) -> Result<()> {
        self.core
            .entries
            .lock()
            .remove(id)
            .ok_or_else(|| SwapError::TriggerNotFound(id.to_string()))?;

        info!(id, "Trigger removed");
        self.core
            .bus
            .publish(EngineEvent::TriggerRemoved { id: id.to_string() });
        Ok(())
    }

    pub fn toggle(&self, id: &str, enabled: bool) -> Result<TriggerCondition> {
        let now = self.core.clock.now();
        let paused = self.is_paused();
        let condition = {
            let mut entries = self.core.entries.lock();
            let entry = entries
                .get_mut(id)
                .ok_or_else(|| SwapError::TriggerNotFound(id.to_string()))?;
            entry.condition.enabled = enabled;
            if paused {
                entry.next_poll = None;
            } else {
                entry.arm(now, self.core.poll_interval);
            }
            entry.condition.clone()
        };
        if enabled {
            self.ensure_driver();
        }

        info!(id, enabled, "Trigger toggled");
        self.core.bus.publish(EngineEvent::TriggerToggled {
            id: id.to_string(),
            enabled,
        });
        Ok(condition)
    }

    /// Checks every enabled trigger whose poll time has passed.
    ///
    /// A trigger is checked at most once per poll interval; triggers still
    /// busy with a previous check or action are skipped.
    pub fn tick(&self) -> Vec<JoinHandle<()>> {
        self.core.tick()
    }

    /// Clears a pause and starts polling, re-arming enabled triggers from now.
    pub fn start(&self) -> bool {
        self.paused.store(false, Ordering::SeqCst);
        let started = self.spawn_driver();
        if started {
            let now = self.core.clock.now();
            for entry in self.core.entries.lock().values_mut() {
                entry.arm(now, self.core.poll_interval);
            }
        }
        started
    }

    /// Stops polling. Triggers set before the next `start` stay unarmed.
    pub fn stop(&self) -> bool {
        self.paused.store(true, Ordering::SeqCst);
        let stopped = self.pulse.stop();
        for entry in self.core.entries.lock().values_mut() {
            entry.next_poll = None;
        }
        stopped
    }

    pub fn is_running(&self) -> bool {
        self.pulse.is_running()
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    fn spawn_driver(&self) -> bool {
        let core = self.core.clone();
        self.pulse.start("trigger-monitor", self.tick_interval, move || {
            core.tick();
        })
    }

    fn ensure_driver(&self) {
        if self.is_paused() || self.is_running() {
            return;
        }
        if tokio::runtime::Handle::try_current().is_err() {
            debug!("No tokio runtime, triggers wait for start()");
            return;
        }
        if self.spawn_driver() {
            debug!("Trigger monitor started on registration");
        }
    }
}

fn validate(condition: &TriggerCondition) -> Result<()> {
    if !condition.threshold.is_finite() {
        return Err(SwapError::InvalidRequest("threshold must be a finite number".into()));
    }

    match condition.kind {
        TriggerKind::Price | TriggerKind::Balance if condition.watched_asset.is_none() => {
            return Err(SwapError::TokenRequired(condition.kind));
        }
        TriggerKind::Balance if condition.action_parameters.owner.is_none() => {
            return Err(SwapError::InvalidActionParameters(
                "balance triggers require an owner".into(),
            ));
        }
        _ => {}
    }

    if condition.action != TriggerAction::Notify {
        swap_order(condition)?;
    }
    Ok(())
}

/// Resolves the swap a trigger performs. `sell` defaults its input and `buy`
/// its output to the watched asset.
fn swap_order(condition: &TriggerCondition) -> Result<SwapOrder> {
    let params = &condition.action_parameters;
    let watched = condition.watched_asset.clone();

    let (input_asset, output_asset) = match condition.action {
        TriggerAction::Sell => (
            params.input_asset.clone().or(watched),
            params.output_asset.clone(),
        ),
        TriggerAction::Buy => (
            params.input_asset.clone(),
            params.output_asset.clone().or(watched),
        ),
        TriggerAction::Swap | TriggerAction::Notify => {
            (params.input_asset.clone(), params.output_asset.clone())
        }
    };

    let missing = |what: &str| {
        SwapError::InvalidActionParameters(format!("{} action requires {}", condition.action, what))
    };

    Ok(SwapOrder {
        input_asset: input_asset.ok_or_else(|| missing("an input asset"))?,
        output_asset: output_asset.ok_or_else(|| missing("an output asset"))?,
        amount: params
            .amount
            .filter(|amount| *amount > 0)
            .ok_or_else(|| missing("a positive amount"))?,
        owner: params.owner.ok_or_else(|| missing("an owner"))?,
        slippage_bps: params.slippage_bps,
    })
}

impl MonitorCore {
    fn tick(&self) -> Vec<JoinHandle<()>> {
        let now = self.clock.now();
        let due: Vec<(TriggerCondition, BusyGuard)> = {
            let mut entries = self.entries.lock();
            entries
                .values_mut()
                .filter_map(|entry| {
                    let next_poll = entry.next_poll?;
                    if !entry.condition.enabled || next_poll > now {
                        return None;
                    }
                    entry.next_poll = Some(now + self.poll_interval);
                    match entry.busy.try_acquire() {
                        Some(guard) => Some((entry.condition.clone(), guard)),
                        None => {
                            debug!(
                                id = %entry.condition.id,
                                "Previous check still running, skipping poll"
                            );
                            None
                        }
                    }
                })
                .collect()
        };

        due.into_iter()
            .map(|(condition, guard)| {
                let core = self.clone();
                tokio::spawn(async move {
                    let _guard = guard;
                    core.check(condition).await;
                })
            })
            .collect()
    }

    fn is_registered(&self, id: &str) -> bool {
        self.entries.lock().contains_key(id)
    }

    async fn check(&self, condition: TriggerCondition) {
        match self.evaluate(&condition).await {
            Ok(true) => self.perform(condition).await,
            Ok(false) => debug!(id = %condition.id, "Trigger condition not met"),
            Err(e) => {
                if !self.is_registered(&condition.id) {
                    return;
                }
                log_error(&e, &format!("Trigger {} check failed", condition.id));
                self.bus.publish(EngineEvent::TriggerCheckFailed {
                    condition,
                    error: e.to_event_error(),
                });
            }
        }
    }

    async fn evaluate(&self, condition: &TriggerCondition) -> Result<bool> {
        let watched = || {
            condition
                .watched_asset
                .as_deref()
                .ok_or(SwapError::TokenRequired(condition.kind))
        };

        let observed = match condition.kind {
            TriggerKind::Price => self.services.prices.price(watched()?).await?,
            TriggerKind::Balance => {
                let owner = condition.action_parameters.owner.ok_or_else(|| {
                    SwapError::InvalidActionParameters("balance triggers require an owner".into())
                })?;
                self.services.balances.balance_of(&owner, watched()?).await? as f64
            }
            // Thresholds for time triggers are unix timestamps in milliseconds.
            TriggerKind::Time => self.clock.now().timestamp_millis() as f64,
            TriggerKind::Custom => return self.services.custom.evaluate(condition).await,
        };

        let holds = condition.operator.holds(observed, condition.threshold);
        debug!(
            id = %condition.id,
            observed,
            threshold = condition.threshold,
            holds,
            "Trigger evaluated"
        );
        Ok(holds)
    }

    async fn perform(&self, condition: TriggerCondition) {
        info!(id = %condition.id, action = %condition.action, "Trigger condition met");
        self.bus.publish(EngineEvent::TriggerExecuting(condition.clone()));

        let outcome: Result<Option<SwapReceipt>> = match condition.action {
            TriggerAction::Notify => self.services.notifier.notify(&condition).await.map(|_| None),
            TriggerAction::Swap | TriggerAction::Sell | TriggerAction::Buy => {
                match swap_order(&condition) {
                    Ok(order) => self.services.runner.run(order).await.map(Some),
                    Err(e) => Err(e),
                }
            }
        };

        if !self.is_registered(&condition.id) {
            debug!(id = %condition.id, "Trigger removed during execution, discarding outcome");
            return;
        }

        match outcome {
            Ok(receipt) => self.bus.publish(EngineEvent::TriggerExecuted { condition, receipt }),
            Err(e) => {
                log_error(&e, &format!("Trigger {} action failed", condition.id));
                self.bus.publish(EngineEvent::TriggerFailed {
                    condition,
                    error: e.to_event_error(),
                });
            }
        }
    }
}
