use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters for the scheduler loop: shared, lock-free, cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct SchedulerMetrics {
    inner: Arc<Counters>,
}

#[derive(Debug, Default)]
struct Counters {
    finalized: AtomicU64,
    requeued: AtomicU64,
    dropped: AtomicU64,
}

impl SchedulerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_finalized(&self) {
        self.inner.finalized.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_requeued(&self) {
        self.inner.requeued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.inner.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Total conversions finalized so far.
    pub fn finalized(&self) -> u64 {
        self.inner.finalized.load(Ordering::Relaxed)
    }

    /// Total not-yet-due requeue cycles so far.
    pub fn requeued(&self) -> u64 {
        self.inner.requeued.load(Ordering::Relaxed)
    }

    /// Conversions dropped because the finalize call failed.
    pub fn dropped(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }
}
