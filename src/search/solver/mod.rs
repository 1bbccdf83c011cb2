use std::{
    io,
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use shared_search::{SearchLimits, SharedSearch, Verdict};

use super::{
    CancelToken, LatchWait, Node, StatsSnapshot, VisitedSet,
    pool::{PoolConfig, WorkerPool},
};
use crate::{
    config::SolverConfig,
    error::SolveError,
    problem::Problem,
};

mod logging;
mod shared_search;
mod task;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchState {
    Ready,
    Running,
    Solved,
    Exhausted,
    Cancelled,
    TimedOut,
    /// Ended by an error: resource exhaustion or an escalated collaborator failure.
    Aborted,
}

impl SearchState {
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Ready,
            1 => Self::Running,
            2 => Self::Solved,
            3 => Self::Exhausted,
            4 => Self::Cancelled,
            5 => Self::TimedOut,
            _ => Self::Aborted,
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Ready | Self::Running)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome<M> {
    Solved(Vec<M>),
    Exhausted,
    Cancelled,
    TimedOut,
}

impl<M> Outcome<M> {
    #[must_use]
    pub const fn is_solved(&self) -> bool {
        matches!(self, Self::Solved(_))
    }

    #[must_use]
    pub fn moves(&self) -> Option<&[M]> {
        match self {
            Self::Solved(moves) => Some(moves),
            Self::Exhausted | Self::Cancelled | Self::TimedOut => None,
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Solved(_) => "solved",
            Self::Exhausted => "exhausted",
            Self::Cancelled => "cancelled",
            Self::TimedOut => "timed out",
        }
    }
}

#[derive(Debug)]
pub struct SolveReport<M> {
    pub result: Result<Outcome<M>, SolveError>,
    pub state: SearchState,
    pub stats: StatsSnapshot,
    pub visited: usize,
    pub elapsed: Duration,
}

impl<M> SolveReport<M> {
    fn aborted(err: SolveError, elapsed: Duration) -> Self {
        Self {
            result: Err(err),
            state: SearchState::Aborted,
            stats: StatsSnapshot::default(),
            visited: 0,
            elapsed,
        }
    }
}

pub struct Solver<P: Problem> {
    problem: Arc<P>,
    config: SolverConfig,
}

impl<P: Problem> Solver<P> {
    #[must_use]
    pub fn new(problem: P, config: SolverConfig) -> Self {
        Self::from_arc(Arc::new(problem), config)
    }

    #[must_use]
    pub const fn from_arc(problem: Arc<P>, config: SolverConfig) -> Self {
        Self { problem, config }
    }

    #[must_use]
    pub const fn config(&self) -> &SolverConfig {
        &self.config
    }

    #[must_use]
    pub fn problem(&self) -> &P {
        &self.problem
    }

    pub fn solve(&self) -> Result<Outcome<P::Move>, SolveError> {
        self.solve_with_cancel(&CancelToken::new())
    }

    pub fn solve_with_cancel(&self, cancel: &CancelToken) -> Result<Outcome<P::Move>, SolveError> {
        self.solve_with_report(cancel).result
    }

    /// Runs one search. Every piece of shared state (pool, visited set,
    /// latch, counter) is created here and dropped before returning.
    pub fn solve_with_report(&self, cancel: &CancelToken) -> SolveReport<P::Move> {
        let start_time = Instant::now();
        let threads = self.config.resolved_threads();
        let pool = match WorkerPool::new(&PoolConfig {
            threads,
            max_threads: self.config.max_threads,
            queue_capacity: self.config.max_queued,
            ..PoolConfig::default()
        }) {
            Ok(pool) => pool,
            Err(err) => {
                tracing::error!("failed to start worker pool: {err}");
                return SolveReport::aborted(
                    SolveError::WorkerSpawn(err.to_string()),
                    start_time.elapsed(),
                );
            }
        };
        let search = Arc::new(SharedSearch::new(
            Arc::clone(&self.problem),
            VisitedSet::new(threads, self.config.max_visited),
            cancel.clone(),
            pool.submitter(),
            SearchLimits {
                policy: self.config.failure_policy,
                max_queued: self.config.max_queued,
            },
        ));
        let logger = self
            .config
            .verbose
            .then(|| logging::spawn_logger(Arc::clone(&search), self.config.log_interval()));

        start(&search);

        let deadline = self.config.timeout().map(|timeout| start_time + timeout);
        let verdict = match search.latch.wait(deadline, Some(cancel)) {
            LatchWait::Ready(verdict) => verdict,
            LatchWait::TimedOut => {
                search.conclude(Verdict::TimedOut);
                search.latch.get()
            }
            LatchWait::Cancelled => {
                search.conclude(Verdict::Cancelled);
                search.latch.get()
            }
        };

        let discarded = pool.shutdown_now();
        if pool.await_termination(Some(self.config.drain_timeout())) {
            tracing::debug!(
                discarded,
                completed = pool.completed_tasks(),
                panicked = pool.failed_tasks(),
                "worker pool drained"
            );
            drop(pool);
        } else {
            tracing::warn!(
                drain_timeout_ms = self.config.drain_timeout_ms,
                "workers still running after drain timeout, detaching them"
            );
            pool.detach();
        }
        if let Some((log_tx, log_handle)) = logger {
            let _ = log_tx.send(());
            let _ = log_handle.join();
        }

        let report = SolveReport {
            state: verdict.state(),
            result: verdict.into_result(),
            stats: search.stats.snapshot(),
            visited: search.visited.len(),
            elapsed: start_time.elapsed(),
        };
        logging::log_summary(&report);
        report
    }

    /// Runs the search on its own thread and hands the report to `on_complete`.
    pub fn spawn<F>(self, cancel: CancelToken, on_complete: F) -> io::Result<thread::JoinHandle<()>>
    where
        F: FnOnce(SolveReport<P::Move>) + Send + 'static,
    {
        thread::Builder::new()
            .name("solver".to_string())
            .spawn(move || on_complete(self.solve_with_report(&cancel)))
    }
}

fn start<P: Problem>(search: &Arc<SharedSearch<P>>) {
    if !search.mark_running() {
        return;
    }
    if search.cancel.is_cancelled() {
        search.conclude(Verdict::Cancelled);
        return;
    }
    // Held until the root is queued so the counter cannot hit zero early.
    let bootstrap = task::Ticket::issue(search);
    let root = Node::root(search.problem.initial_position());
    match search.visited.try_mark_visited(&root.position) {
        Ok(_) => {
            task::spawn(search, root);
        }
        Err(err) => search.visited_full(err.limit),
    }
    drop(bootstrap);
}

/// Solves `problem` with default settings, an optional overall timeout and an
/// optional cancellation token.
pub fn solve<P: Problem>(
    problem: P,
    timeout: Option<Duration>,
    cancel: Option<&CancelToken>,
) -> Result<Outcome<P::Move>, SolveError> {
    let mut config = SolverConfig::default();
    if let Some(timeout) = timeout {
        config = config.with_timeout(timeout);
    }
    let solver = Solver::new(problem, config);
    match cancel {
        Some(cancel) => solver.solve_with_cancel(cancel),
        None => solver.solve(),
    }
}
