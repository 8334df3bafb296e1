//! Shared hardware bus with a try-or-defer discipline.
//!
//! The display and the motion sensor share one bus. Code on the control loop
//! or in timer context must never block on it: it calls `try_enter()`, and on
//! contention marks its work pending through a `DeferredTask` and retries on a
//! later tick. Only setup code may use the blocking `enter()`.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};

#[derive(Debug, Clone, Default)]
pub struct SharedBus {
    lock: Arc<Mutex<()>>,
    contended: Arc<AtomicU64>,
}

/// Held bus access; released on drop.
pub struct BusGuard<'a> {
    _guard: MutexGuard<'a, ()>,
}

impl SharedBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocking acquire. Not for use from the control loop or timer context.
    pub fn enter(&self) -> BusGuard<'_> {
        // The bus guards no data, so a poisoned lock is still usable.
        let guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        BusGuard { _guard: guard }
    }

    /// Non-blocking acquire. Returns `None` if another holder has the bus.
    pub fn try_enter(&self) -> Option<BusGuard<'_>> {
        match self.lock.try_lock() {
            Ok(guard) => Some(BusGuard { _guard: guard }),
            Err(TryLockError::Poisoned(e)) => Some(BusGuard {
                _guard: e.into_inner(),
            }),
            Err(TryLockError::WouldBlock) => {
                self.contended.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Number of `try_enter()` calls that found the bus busy.
    pub fn contention_count(&self) -> u64 {
        self.contended.load(Ordering::Relaxed)
    }
}

/// Pending flag for work that needs the bus but could not get it.
#[derive(Debug, Default)]
pub struct DeferredTask {
    pending: AtomicBool,
}

impl DeferredTask {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_pending(&self) {
        self.pending.store(true, Ordering::Release);
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Run `work` with the bus if it can be taken right now.
    ///
    /// Returns `true` when the work ran. On contention the task stays (or
    /// becomes) pending and `work` is not called.
    pub fn run_or_defer<F: FnOnce()>(&self, bus: &SharedBus, work: F) -> bool {
        match bus.try_enter() {
            Some(_guard) => {
                self.pending.store(false, Ordering::Release);
                work();
                true
            }
            None => {
                log::trace!(target: "bus", "bus busy, deferring");
                self.mark_pending();
                false
            }
        }
    }
}
