//! Coalesced "please redraw soon" signal from the core to the display layer.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Fire-and-forget refresh request. Any number of `request()` calls before the
/// next `take()` count as one. Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct RefreshSignal {
    pending: Arc<AtomicBool>,
    requests: Arc<AtomicU64>,
}

impl RefreshSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.pending.store(true, Ordering::Release);
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Consume the pending request, if any.
    pub fn take(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Total number of `request()` calls, coalesced or not.
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }
}
