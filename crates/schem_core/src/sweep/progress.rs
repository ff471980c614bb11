use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Progress tracking for a sweep, shareable across threads
#[derive(Debug, Clone)]
pub struct SweepProgress {
    /// Trials handed to a worker
    dispatched: Arc<AtomicUsize>,
    /// Trials whose local grid has been folded
    completed: Arc<AtomicUsize>,
    total: Arc<AtomicUsize>,
}

impl SweepProgress {
    #[must_use]
    pub fn new(total: usize) -> Self {
        Self {
            dispatched: Arc::new(AtomicUsize::new(0)),
            completed: Arc::new(AtomicUsize::new(0)),
            total: Arc::new(AtomicUsize::new(total)),
        }
    }

    #[must_use]
    pub fn dispatched(&self) -> usize {
        self.dispatched.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }

    pub fn mark_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn mark_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Reset the counters for a new sweep
    pub fn reset(&self, total: usize) {
        self.dispatched.store(0, Ordering::Relaxed);
        self.completed.store(0, Ordering::Relaxed);
        self.total.store(total, Ordering::Relaxed);
    }

    /// Completed fraction in `[0, 1]`
    #[must_use]
    pub fn fraction(&self) -> f64 {
        match self.total() {
            0 => 1.0,
            total => self.completed() as f64 / total as f64,
        }
    }
}

impl Default for SweepProgress {
    fn default() -> Self {
        Self::new(0)
    }
}
