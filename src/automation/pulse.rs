use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Background task calling a tick function at a fixed period.
#[derive(Debug, Default)]
pub(crate) struct Pulse {
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Pulse {
    /// Starts ticking. Returns false if already running.
    pub(crate) fn start<F>(&self, name: &'static str, period: Duration, mut tick: F) -> bool
    where
        F: FnMut() + Send + 'static,
    {
        let mut handle = self.handle.lock();
        if handle.as_ref().is_some_and(|h| !h.is_finished()) {
            return false;
        }

        *handle = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            debug!(name, ?period, "Pulse started");
            loop {
                interval.tick().await;
                tick();
            }
        }));
        true
    }

    /// Stops ticking. Fires already spawned by a tick keep running.
    pub(crate) fn stop(&self) -> bool {
        match self.handle.lock().take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Pulse {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.get_mut().take() {
            handle.abort();
        }
    }
}
