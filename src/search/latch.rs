use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::{Duration, Instant},
};

use parking_lot::{Condvar, Mutex};

use super::CancelToken;

// Waiters holding a cancel token re-check it at this interval.
const CANCEL_POLL: Duration = Duration::from_millis(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LatchWait<T> {
    Ready(T),
    TimedOut,
    Cancelled,
}

impl<T> LatchWait<T> {
    pub fn ready(self) -> Option<T> {
        match self {
            Self::Ready(value) => Some(value),
            Self::TimedOut | Self::Cancelled => None,
        }
    }
}

/// Single-assignment cell whose readers block until a value is stored.
pub struct ResultLatch<T> {
    value: Mutex<Option<T>>,
    ready: Condvar,
    is_set: AtomicBool,
}

impl<T> Default for ResultLatch<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ResultLatch<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            value: Mutex::new(None),
            ready: Condvar::new(),
            is_set: AtomicBool::new(false),
        }
    }

    /// Stores `value` unless a value is already present. Returns whether this
    /// call performed the store.
    pub fn try_set(&self, value: T) -> bool {
        let mut slot = self.value.lock();
        if slot.is_some() {
            return false;
        }
        *slot = Some(value);
        self.is_set.store(true, Ordering::Release);
        drop(slot);
        self.ready.notify_all();
        true
    }

    #[inline]
    pub fn is_set(&self) -> bool {
        self.is_set.load(Ordering::Acquire)
    }
}

impl<T: Clone> ResultLatch<T> {
    #[must_use]
    pub fn peek(&self) -> Option<T> {
        if !self.is_set() {
            return None;
        }
        self.value.lock().clone()
    }

    #[must_use]
    pub fn get(&self) -> T {
        let mut slot = self.value.lock();
        loop {
            if let Some(value) = slot.as_ref() {
                return value.clone();
            }
            self.ready.wait(&mut slot);
        }
    }

    #[must_use]
    pub fn get_timeout(&self, timeout: Duration) -> Option<T> {
        self.wait(Some(Instant::now() + timeout), None).ready()
    }

    /// Blocks until the latch is set, `deadline` passes, or `cancel` fires.
    /// A value that is already present wins over an expired deadline or a
    /// cancelled token.
    pub fn wait(&self, deadline: Option<Instant>, cancel: Option<&CancelToken>) -> LatchWait<T> {
        let mut slot = self.value.lock();
        loop {
            if let Some(value) = slot.as_ref() {
                return LatchWait::Ready(value.clone());
            }
            if cancel.is_some_and(CancelToken::is_cancelled) {
                return LatchWait::Cancelled;
            }
            let now = Instant::now();
            if deadline.is_some_and(|d| now >= d) {
                return LatchWait::TimedOut;
            }
            let wake_at = match (deadline, cancel) {
                (Some(d), Some(_)) => Some(d.min(now + CANCEL_POLL)),
                (Some(d), None) => Some(d),
                (None, Some(_)) => Some(now + CANCEL_POLL),
                (None, None) => None,
            };
            match wake_at {
                Some(at) => {
                    let _ = self.ready.wait_until(&mut slot, at);
                }
                None => self.ready.wait(&mut slot),
            }
        }
    }
}
