use std::{
    io,
    panic::{self, AssertUnwindSafe},
    sync::{
        Arc,
        atomic::{AtomicU8, AtomicU64, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use parking_lot::{Condvar, Mutex, RwLock};

use crate::utils::panic_message;

pub type Task = Box<dyn FnOnce() + Send + 'static>;

pub const DEFAULT_MAX_THREADS: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PoolState {
    Running,
    ShuttingDown,
    Terminated,
}

impl PoolState {
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Running,
            1 => Self::ShuttingDown,
            _ => Self::Terminated,
        }
    }
}

#[must_use]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Submission {
    Accepted,
    /// The pool no longer accepts work; the task was dropped without running.
    Discarded,
    QueueFull,
}

#[derive(Clone, Debug)]
pub struct PoolConfig {
    pub threads: usize,
    pub max_threads: usize,
    pub queue_capacity: Option<usize>,
    pub thread_name: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            threads: 1,
            max_threads: DEFAULT_MAX_THREADS,
            queue_capacity: None,
            thread_name: "search-worker".to_string(),
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub const fn effective_threads(&self) -> usize {
        let cap = if self.max_threads == 0 { 1 } else { self.max_threads };
        let threads = if self.threads == 0 { 1 } else { self.threads };
        if threads > cap { cap } else { threads }
    }
}

struct PoolShared {
    sender: RwLock<Option<Sender<Task>>>,
    receiver: Receiver<Task>,
    state: AtomicU8,
    live_workers: Mutex<usize>,
    terminated: Condvar,
    completed_tasks: AtomicU64,
    failed_tasks: AtomicU64,
}

impl PoolShared {
    fn state(&self) -> PoolState {
        PoolState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn submit(&self, task: Task) -> Submission {
        // Rejected tasks are dropped after the read guard is released: their
        // destructors may call back into `shutdown`.
        let (rejected, status) = {
            let guard = self.sender.read();
            match guard.as_ref() {
                None => (task, Submission::Discarded),
                Some(sender) => match sender.try_send(task) {
                    Ok(()) => return Submission::Accepted,
                    Err(TrySendError::Full(task)) => (task, Submission::QueueFull),
                    Err(TrySendError::Disconnected(task)) => (task, Submission::Discarded),
                },
            }
        };
        drop(rejected);
        status
    }

    fn shutdown(&self) {
        let _ = self.state.compare_exchange(
            PoolState::Running as u8,
            PoolState::ShuttingDown as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        let sender = self.sender.write().take();
        if sender.is_some() {
            tracing::debug!("worker pool stopped accepting tasks");
        }
    }

    fn run_task(&self, task: Task) {
        match panic::catch_unwind(AssertUnwindSafe(task)) {
            Ok(()) => {
                self.completed_tasks.fetch_add(1, Ordering::Relaxed);
            }
            Err(payload) => {
                self.failed_tasks.fetch_add(1, Ordering::Relaxed);
                let current = thread::current();
                tracing::error!(
                    thread = current.name().unwrap_or("unnamed"),
                    "task panicked: {}",
                    panic_message(payload.as_ref())
                );
            }
        }
    }

    fn worker_exited(&self) {
        let mut live = self.live_workers.lock();
        *live = live.saturating_sub(1);
        if *live == 0 {
            self.state
                .store(PoolState::Terminated as u8, Ordering::Release);
            self.terminated.notify_all();
        }
    }
}

fn worker_loop(shared: &PoolShared, receiver: &Receiver<Task>) {
    while let Ok(task) = receiver.recv() {
        shared.run_task(task);
    }
    shared.worker_exited();
}

/// Cloneable handle that submits tasks to a [`WorkerPool`] without owning its threads.
#[derive(Clone)]
pub struct Submitter {
    shared: Arc<PoolShared>,
}

impl Submitter {
    pub fn submit(&self, task: impl FnOnce() + Send + 'static) -> Submission {
        self.shared.submit(Box::new(task))
    }

    pub fn shutdown(&self) {
        self.shared.shutdown();
    }

    pub fn state(&self) -> PoolState {
        self.shared.state()
    }
}

pub struct WorkerPool {
    shared: Arc<PoolShared>,
    handles: Vec<thread::JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(config: &PoolConfig) -> io::Result<Self> {
        let threads = config.effective_threads();
        let (sender, receiver) = match config.queue_capacity {
            Some(capacity) => crossbeam_channel::bounded(capacity.max(1)),
            None => crossbeam_channel::unbounded(),
        };
        let shared = Arc::new(PoolShared {
            sender: RwLock::new(Some(sender)),
            receiver,
            state: AtomicU8::new(PoolState::Running as u8),
            live_workers: Mutex::new(threads),
            terminated: Condvar::new(),
            completed_tasks: AtomicU64::new(0),
            failed_tasks: AtomicU64::new(0),
        });
        let mut pool = Self {
            shared,
            handles: Vec::with_capacity(threads),
        };
        for id in 0..threads {
            let shared = Arc::clone(&pool.shared);
            let receiver = pool.shared.receiver.clone();
            let spawned = thread::Builder::new()
                .name(format!("{}-{id}", config.thread_name))
                .spawn(move || worker_loop(&shared, &receiver));
            match spawned {
                Ok(handle) => pool.handles.push(handle),
                Err(err) => {
                    let missing = threads - id;
                    for _ in 0..missing {
                        pool.shared.worker_exited();
                    }
                    return Err(err);
                }
            }
        }
        tracing::debug!(threads, queue_capacity = ?config.queue_capacity, "worker pool started");
        Ok(pool)
    }

    #[must_use]
    pub fn submitter(&self) -> Submitter {
        Submitter {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn submit(&self, task: impl FnOnce() + Send + 'static) -> Submission {
        self.shared.submit(Box::new(task))
    }

    /// Stops accepting tasks. Already queued tasks still run.
    pub fn shutdown(&self) {
        self.shared.shutdown();
    }

    /// Stops accepting tasks and drops every queued task that has not started.
    pub fn shutdown_now(&self) -> usize {
        self.shared.shutdown();
        let discarded = self.shared.receiver.try_iter().count();
        if discarded > 0 {
            tracing::debug!(discarded, "dropped queued tasks");
        }
        discarded
    }

    /// Waits for every worker to exit. Only returns true after `shutdown`.
    pub fn await_termination(&self, timeout: Option<Duration>) -> bool {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut live = self.shared.live_workers.lock();
        while *live > 0 {
            match deadline {
                Some(deadline) => {
                    if self
                        .shared
                        .terminated
                        .wait_until(&mut live, deadline)
                        .timed_out()
                    {
                        return *live == 0;
                    }
                }
                None => self.shared.terminated.wait(&mut live),
            }
        }
        true
    }

    /// Stops accepting tasks and lets running workers finish on their own
    /// without joining them.
    pub fn detach(mut self) {
        self.shared.shutdown();
        self.handles.clear();
    }

    pub fn state(&self) -> PoolState {
        self.shared.state()
    }

    pub fn completed_tasks(&self) -> u64 {
        self.shared.completed_tasks.load(Ordering::Relaxed)
    }

    pub fn failed_tasks(&self) -> u64 {
        self.shared.failed_tasks.load(Ordering::Relaxed)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shared.shutdown();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Barrier,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;

    fn pool(threads: usize, queue_capacity: Option<usize>) -> WorkerPool {
        WorkerPool::new(&PoolConfig {
            threads,
            queue_capacity,
            ..PoolConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_runs_all_accepted_tasks() {
        let pool = pool(4, None);
        let ran = Arc::new(AtomicUsize::new(0));
        for _ in 0..100 {
            let ran = Arc::clone(&ran);
            assert_eq!(
                pool.submit(move || {
                    ran.fetch_add(1, Ordering::SeqCst);
                }),
                Submission::Accepted
            );
        }
        pool.shutdown();
        assert!(pool.await_termination(Some(Duration::from_secs(5))));
        assert_eq!(ran.load(Ordering::SeqCst), 100);
        assert_eq!(pool.completed_tasks(), 100);
        assert_eq!(pool.state(), PoolState::Terminated);
    }

    #[test]
    fn test_submit_after_shutdown_is_discarded() {
        let pool = pool(2, None);
        pool.shutdown();
        assert_ne!(pool.state(), PoolState::Running);
        assert_eq!(pool.submit(|| {}), Submission::Discarded);
        assert_eq!(pool.submitter().submit(|| {}), Submission::Discarded);
        assert!(pool.await_termination(Some(Duration::from_secs(5))));
    }

    #[test]
    fn test_panicking_task_is_isolated() {
        let pool = pool(1, None);
        let ran = Arc::new(AtomicUsize::new(0));
        let _ = pool.submit(|| panic!("task failure"));
        for _ in 0..3 {
            let ran = Arc::clone(&ran);
            let _ = pool.submit(move || {
                ran.fetch_add(1, Ordering::SeqCst);
            });
        }
        pool.shutdown();
        assert!(pool.await_termination(Some(Duration::from_secs(5))));
        assert_eq!(ran.load(Ordering::SeqCst), 3);
        assert_eq!(pool.failed_tasks(), 1);
        assert_eq!(pool.completed_tasks(), 3);
    }

    #[test]
    fn test_bounded_queue_reports_full() {
        let pool = pool(1, Some(1));
        let gate = Arc::new(Barrier::new(2));
        let started = Arc::new(Barrier::new(2));
        {
            let gate = Arc::clone(&gate);
            let started = Arc::clone(&started);
            let _ = pool.submit(move || {
                started.wait();
                gate.wait();
            });
        }
        started.wait();
        assert_eq!(pool.submit(|| {}), Submission::Accepted);
        assert_eq!(pool.submit(|| {}), Submission::QueueFull);
        gate.wait();
        pool.shutdown();
        assert!(pool.await_termination(Some(Duration::from_secs(5))));
    }

    #[test]
    fn test_await_termination_times_out_while_running() {
        let pool = pool(1, None);
        assert!(!pool.await_termination(Some(Duration::from_millis(20))));
        assert_eq!(pool.state(), PoolState::Running);
    }

    #[test]
    fn test_shutdown_now_drops_queued_tasks() {
        let pool = pool(1, None);
        let gate = Arc::new(Barrier::new(2));
        let started = Arc::new(Barrier::new(2));
        let ran = Arc::new(AtomicUsize::new(0));
        {
            let gate = Arc::clone(&gate);
            let started = Arc::clone(&started);
            let _ = pool.submit(move || {
                started.wait();
                gate.wait();
            });
        }
        started.wait();
        for _ in 0..5 {
            let ran = Arc::clone(&ran);
            let _ = pool.submit(move || {
                ran.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(pool.shutdown_now(), 5);
        gate.wait();
        assert!(pool.await_termination(Some(Duration::from_secs(5))));
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_thread_count_is_capped() {
        let config = PoolConfig {
            threads: 500,
            max_threads: 8,
            ..PoolConfig::default()
        };
        assert_eq!(config.effective_threads(), 8);
        let config = PoolConfig {
            threads: 0,
            ..PoolConfig::default()
        };
        assert_eq!(config.effective_threads(), 1);
    }
}
