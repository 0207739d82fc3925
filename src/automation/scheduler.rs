use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use jupflow_types::{EngineEvent, NewRecurringSwap, RecurringSwapConfig};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::clock::Clock;
use super::events::EventBus;
use super::latch::{BusyGuard, BusyLatch};
use super::pulse::Pulse;
use super::runner::{SwapOrder, SwapRunner};
use super::schedule::CronSchedule;
use super::AutomationConfig;
use crate::error::{log_error, Result, SwapError};

struct ScheduledEntry {
    config: RecurringSwapConfig,
    schedule: CronSchedule,
    /// `None` while disabled or while the scheduler is stopped.
    next_fire: Option<DateTime<Utc>>,
    busy: BusyLatch,
}

impl ScheduledEntry {
    fn arm(&mut self, now: DateTime<Utc>) {
        self.next_fire = if self.config.enabled {
            self.schedule.next_after(now)
        } else {
            None
        };
    }
}

#[derive(Clone)]
struct SchedulerCore {
    entries: Arc<Mutex<HashMap<String, ScheduledEntry>>>,
    runner: Arc<dyn SwapRunner>,
    bus: EventBus,
    clock: Arc<dyn Clock>,
}

/// Registry of recurring swaps fired on their cron schedules.
///
/// The background driver starts with the first enabled registration when a
/// tokio runtime is available. `stop` pauses it until the next `start`.
pub struct Scheduler {
    core: SchedulerCore,
    pulse: Pulse,
    paused: AtomicBool,
    tick_interval: Duration,
    default_slippage_bps: u16,
}

impl Scheduler {
    pub fn new(
        runner: Arc<dyn SwapRunner>,
        bus: EventBus,
        clock: Arc<dyn Clock>,
        config: &AutomationConfig,
    ) -> Self {
        Self {
            core: SchedulerCore {
                entries: Arc::new(Mutex::new(HashMap::new())),
                runner,
                bus,
                clock,
            },
            pulse: Pulse::default(),
            paused: AtomicBool::new(false),
            tick_interval: config.tick_interval,
            default_slippage_bps: config.default_slippage_bps,
        }
    }

    /// Validates and registers a recurring swap. Nothing is registered on error.
    #[instrument(skip(self, request), fields(cron = %request.cron_schedule))]
    pub fn schedule(&self, request: NewRecurringSwap) -> Result<RecurringSwapConfig> {
        let schedule = CronSchedule::parse(&request.cron_schedule)?;
        if request.input_asset.trim().is_empty() || request.output_asset.trim().is_empty() {
            return Err(SwapError::InvalidRequest(
                "input and output assets are required".into(),
            ));
        }
        if request.amount == 0 {
            return Err(SwapError::InvalidRequest("amount must be positive".into()));
        }

        let now = self.core.clock.now();
        let config = RecurringSwapConfig {
            id: format!("swap_{}", Uuid::new_v4().simple()),
            cron_schedule: schedule.expression().to_string(),
            input_asset: request.input_asset,
            output_asset: request.output_asset,
            amount: request.amount,
            owner_account: request.owner_account,
            enabled: request.enabled,
            max_slippage_bps: request.max_slippage_bps.unwrap_or(self.default_slippage_bps),
            created_at: now,
            last_executed_at: None,
        };

        let mut entry = ScheduledEntry {
            config: config.clone(),
            schedule,
            next_fire: None,
            busy: BusyLatch::default(),
        };
        if !self.is_paused() {
            entry.arm(now);
        }

        info!(id = %config.id, next_fire = ?entry.next_fire, "Scheduled recurring swap");
        self.core.entries.lock().insert(config.id.clone(), entry);
        self.core.bus.publish(EngineEvent::SwapScheduled(config.clone()));
        if config.enabled {
            self.ensure_driver();
        }
        Ok(config)
    }

    /// Registered swaps, oldest first.
    pub fn list(&self) -> Vec<RecurringSwapConfig> {
        let mut configs: Vec<RecurringSwapConfig> = self
            .core
            .entries
            .lock()
            .values()
            .map(|entry| entry.config.clone())
            .collect();
        configs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        configs
    }

    pub fn get(&self, id: &str) -> Option<RecurringSwapConfig> {
        self.core.entries.lock().get(id).map(|entry| entry.config.clone())
    }

    pub fn next_fire(&self, id: &str) -> Option<DateTime<Utc>> {
        self.core.entries.lock().get(id).and_then(|entry| entry.next_fire)
    }

    pub fn len(&self) -> usize {
        self.core.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes the entry. A fire already in flight completes but its result is discarded.
    pub fn cancel(&self, id: &str) -> Result<()> {
        self.core
            .entries
            .lock()
            .remove(id)
            .ok_or_else(|| SwapError::ScheduledSwapNotFound(id.to_string()))?;

        info!(id, "Cancelled recurring swap");
        self.core
            .bus
            .publish(EngineEvent::SwapCancelled { id: id.to_string() });
        Ok(())
    }

    pub fn toggle(&self, id: &str, enabled: bool) -> Result<RecurringSwapConfig> {
        let now = self.core.clock.now();
        let paused = self.is_paused();
        let config = {
            let mut entries = self.core.entries.lock();
            let entry = entries
                .get_mut(id)
                .ok_or_else(|| SwapError::ScheduledSwapNotFound(id.to_string()))?;
            entry.config.enabled = enabled;
            if paused {
                entry.next_fire = None;
            } else {
                entry.arm(now);
            }
            entry.config.clone()
        };
        if enabled {
            self.ensure_driver();
        }

        info!(id, enabled, "Toggled recurring swap");
        self.core.bus.publish(EngineEvent::SwapToggled {
            id: id.to_string(),
            enabled,
        });
        Ok(config)
    }

    /// Fires every enabled entry whose next fire time has passed.
    ///
    /// Each due entry fires at most once per call and is re-armed for its next
    /// occurrence after now, so fires missed while stopped are not replayed.
    /// Entries still running a previous fire are skipped.
    pub fn tick(&self) -> Vec<JoinHandle<()>> {
        self.core.tick()
    }

    /// Clears a pause, starts the background driver and re-arms enabled
    /// entries from now. Returns false if the driver was already running.
    pub fn start(&self) -> bool {
        self.paused.store(false, Ordering::SeqCst);
        let started = self.spawn_driver();
        if started {
            let now = self.core.clock.now();
            for entry in self.core.entries.lock().values_mut() {
                entry.arm(now);
            }
        }
        started
    }

    /// Stops the driver and disarms every entry. Registrations are kept, and
    /// swaps registered before the next `start` stay unarmed.
    pub fn stop(&self) -> bool {
        self.paused.store(true, Ordering::SeqCst);
        let stopped = self.pulse.stop();
        for entry in self.core.entries.lock().values_mut() {
            entry.next_fire = None;
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
        self.pulse.start("scheduler", self.tick_interval, move || {
            core.tick();
        })
    }

    fn ensure_driver(&self) {
        if self.is_paused() || self.is_running() {
            return;
        }
        if tokio::runtime::Handle::try_current().is_err() {
            debug!("No tokio runtime, scheduled swaps wait for start()");
            return;
        }
        if self.spawn_driver() {
            debug!("Scheduler driver started on registration");
        }
    }
}

impl SchedulerCore {
    fn tick(&self) -> Vec<JoinHandle<()>> {
        let now = self.clock.now();
        let due: Vec<(RecurringSwapConfig, BusyGuard)> = {
            let mut entries = self.entries.lock();
            entries
                .values_mut()
                .filter_map(|entry| {
                    let next_fire = entry.next_fire?;
                    if !entry.config.enabled || next_fire > now {
                        return None;
                    }
                    entry.next_fire = entry.schedule.next_after(now);
                    match entry.busy.try_acquire() {
                        Some(guard) => Some((entry.config.clone(), guard)),
                        None => {
                            debug!(
                                id = %entry.config.id,
                                "Previous execution still running, skipping fire"
                            );
                            None
                        }
                    }
                })
                .collect()
        };

        due.into_iter()
            .map(|(config, guard)| {
                let core = self.clone();
                tokio::spawn(async move {
                    let _guard = guard;
                    core.fire(config).await;
                })
            })
            .collect()
    }

    async fn fire(&self, config: RecurringSwapConfig) {
        debug!(id = %config.id, "Executing scheduled swap");
        self.bus.publish(EngineEvent::SwapExecuting(config.clone()));

        match self.runner.run(SwapOrder::from(&config)).await {
            Ok(receipt) => {
                let executed_at = self.clock.now();
                let updated = self.entries.lock().get_mut(&config.id).map(|entry| {
                    entry.config.last_executed_at = Some(executed_at);
                    entry.config.clone()
                });

                match updated {
                    Some(config) => {
                        info!(
                            id = %config.id,
                            signature = %receipt.signature,
                            "Scheduled swap executed"
                        );
                        self.bus.publish(EngineEvent::SwapExecuted { config, receipt });
                    }
                    None => debug!(
                        id = %config.id,
                        "Swap cancelled during execution, discarding result"
                    ),
                }
            }
            Err(e) => {
                if !self.entries.lock().contains_key(&config.id) {
                    debug!(id = %config.id, "Swap cancelled during execution, discarding failure");
                    return;
                }
                log_error(&e, &format!("Scheduled swap {} failed", config.id));
                self.bus.publish(EngineEvent::SwapFailed {
                    config,
                    error: e.to_event_error(),
                });
            }
        }
    }
}
