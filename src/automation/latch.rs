use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Marks a registry entry as having a fire in flight.
#[derive(Debug, Clone, Default)]
pub(crate) struct BusyLatch(Arc<AtomicBool>);

impl BusyLatch {
    /// Returns a guard if the entry was idle. The latch resets when the guard drops.
    pub(crate) fn try_acquire(&self) -> Option<BusyGuard> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard(self.0.clone()))
    }

    pub(crate) fn is_busy(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
pub(crate) struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
