use std::sync::atomic::{AtomicUsize, Ordering};

/// Number of tasks that are queued or running for one search.
#[derive(Debug, Default)]
pub struct ActiveTaskCounter {
    active: AtomicUsize,
}

impl ActiveTaskCounter {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            active: AtomicUsize::new(0),
        }
    }

    #[inline]
    pub fn increment(&self) {
        self.active.fetch_add(1, Ordering::AcqRel);
    }

    /// Returns true exactly when this decrement brought the count to zero.
    #[inline]
    pub fn decrement_and_check(&self) -> bool {
        let previous = self.active.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "active task counter underflow");
        previous == 1
    }

    #[inline]
    pub fn current(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }
}
