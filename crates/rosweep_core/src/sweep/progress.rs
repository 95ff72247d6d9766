use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Progress tracking shared between sweep workers and an observer
#[derive(Debug, Clone)]
pub struct SweepProgress {
    /// Completed combinations counter
    completed: Arc<AtomicUsize>,
    /// Failed combinations counter
    failed: Arc<AtomicUsize>,
    /// Total combinations
    total: Arc<AtomicUsize>,
    /// Cancellation flag
    cancelled: Arc<AtomicBool>,
}

impl SweepProgress {
    #[must_use]
    pub fn new(total: usize) -> Self {
        Self {
            completed: Arc::new(AtomicUsize::new(0)),
            failed: Arc::new(AtomicUsize::new(0)),
            total: Arc::new(AtomicUsize::new(total)),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }

    /// Record one finished combination
    pub fn record(&self, success: bool) {
        if !success {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Reset counters for a new run of `total` combinations
    pub fn reset(&self, total: usize) {
        self.completed.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
        self.total.store(total, Ordering::Relaxed);
    }

    /// Add combinations to the expected total (differential stages)
    pub fn extend(&self, additional: usize) {
        self.total.fetch_add(additional, Ordering::Relaxed);
    }

    /// Ask workers to stop before their next combination
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Completed fraction in `[0, 1]`
    #[must_use]
    pub fn fraction(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.completed() as f64 / total as f64
    }
}

impl Default for SweepProgress {
    fn default() -> Self {
        Self::new(0)
    }
}
