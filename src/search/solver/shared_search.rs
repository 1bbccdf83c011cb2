use std::{
    panic::{self, AssertUnwindSafe},
    sync::{
        Arc,
        atomic::{AtomicU8, Ordering},
    },
};

use super::{Outcome, SearchState};
use crate::{
    config::FailurePolicy,
    error::{ProblemError, Resource, SolveError},
    problem::Problem,
    search::{
        ActiveTaskCounter, CancelToken, NodeRef, ResultLatch, SearchStats, VisitedSet,
        pool::Submitter,
    },
    utils::panic_message,
};

pub(super) type SearchNode<P> = NodeRef<<P as Problem>::Position, <P as Problem>::Move>;

pub(super) enum Verdict<P: Problem> {
    Solved(SearchNode<P>),
    Exhausted,
    Cancelled,
    TimedOut,
    ResourceExhausted(Resource),
    Failed(ProblemError),
}

impl<P: Problem> Clone for Verdict<P> {
    fn clone(&self) -> Self {
        match self {
            Self::Solved(node) => Self::Solved(Arc::clone(node)),
            Self::Exhausted => Self::Exhausted,
            Self::Cancelled => Self::Cancelled,
            Self::TimedOut => Self::TimedOut,
            Self::ResourceExhausted(resource) => Self::ResourceExhausted(*resource),
            Self::Failed(err) => Self::Failed(err.clone()),
        }
    }
}

impl<P: Problem> Verdict<P> {
    pub(super) const fn state(&self) -> SearchState {
        match self {
            Self::Solved(_) => SearchState::Solved,
            Self::Exhausted => SearchState::Exhausted,
            Self::Cancelled => SearchState::Cancelled,
            Self::TimedOut => SearchState::TimedOut,
            Self::ResourceExhausted(_) | Self::Failed(_) => SearchState::Aborted,
        }
    }

    pub(super) fn into_result(self) -> Result<Outcome<P::Move>, SolveError> {
        match self {
            Self::Solved(node) => Ok(Outcome::Solved(node.path_from_root())),
            Self::Exhausted => Ok(Outcome::Exhausted),
            Self::Cancelled => Ok(Outcome::Cancelled),
            Self::TimedOut => Ok(Outcome::TimedOut),
            Self::ResourceExhausted(resource) => Err(SolveError::ResourceExhausted(resource)),
            Self::Failed(err) => Err(SolveError::Collaborator(err)),
        }
    }
}

pub(super) struct SearchLimits {
    pub(super) policy: FailurePolicy,
    pub(super) max_queued: Option<usize>,
}

/// Per-invocation state shared by every task of one solve.
pub(super) struct SharedSearch<P: Problem> {
    pub(super) problem: Arc<P>,
    pub(super) visited: VisitedSet<P::Position>,
    pub(super) latch: ResultLatch<Verdict<P>>,
    pub(super) counter: ActiveTaskCounter,
    pub(super) cancel: CancelToken,
    pub(super) submitter: Submitter,
    pub(super) limits: SearchLimits,
    pub(super) stats: SearchStats,
    state: AtomicU8,
}

impl<P: Problem> SharedSearch<P> {
    pub(super) fn new(
        problem: Arc<P>,
        visited: VisitedSet<P::Position>,
        cancel: CancelToken,
        submitter: Submitter,
        limits: SearchLimits,
    ) -> Self {
        Self {
            problem,
            visited,
            latch: ResultLatch::new(),
            counter: ActiveTaskCounter::new(),
            cancel,
            submitter,
            limits,
            stats: SearchStats::new(),
            state: AtomicU8::new(SearchState::Ready as u8),
        }
    }

    pub(super) fn state(&self) -> SearchState {
        SearchState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(super) fn mark_running(&self) -> bool {
        self.state
            .compare_exchange(
                SearchState::Ready as u8,
                SearchState::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    #[inline]
    pub(super) fn should_stop(&self) -> bool {
        self.latch.is_set() || self.cancel.is_cancelled()
    }

    /// Publishes the terminal verdict. Only the first caller wins; the pool
    /// stops accepting tasks as soon as a verdict exists.
    pub(super) fn conclude(&self, verdict: Verdict<P>) -> bool {
        let state = verdict.state();
        if !self.latch.try_set(verdict) {
            return false;
        }
        self.state.store(state as u8, Ordering::Release);
        self.submitter.shutdown();
        tracing::debug!(?state, visited = self.visited.len(), "search concluded");
        true
    }

    /// Bookkeeping for a finished (or discarded) task.
    pub(super) fn task_finished(&self) {
        if self.counter.decrement_and_check() {
            let verdict = if self.cancel.is_cancelled() {
                Verdict::Cancelled
            } else {
                Verdict::Exhausted
            };
            self.conclude(verdict);
        }
    }

    /// Runs a collaborator call, turning a panic into a `ProblemError`.
    pub(super) fn guarded<T>(
        &self,
        call: impl FnOnce() -> Result<T, ProblemError>,
    ) -> Result<T, ProblemError> {
        panic::catch_unwind(AssertUnwindSafe(call)).unwrap_or_else(|payload| {
            Err(ProblemError::Panicked(panic_message(payload.as_ref())))
        })
    }

    /// Applies the failure policy. Returns true when the search may continue.
    pub(super) fn collaborator_failed(&self, node: &SearchNode<P>, err: ProblemError) -> bool {
        SearchStats::bump(&self.stats.collaborator_failures);
        match self.limits.policy {
            FailurePolicy::SkipBranch => {
                tracing::warn!(depth = node.depth, "skipping failed branch: {err}");
                true
            }
            FailurePolicy::Abort => {
                tracing::error!(depth = node.depth, "aborting search: {err}");
                self.conclude(Verdict::Failed(err));
                false
            }
        }
    }

    pub(super) fn queue_full(&self) {
        let limit = self.limits.max_queued.unwrap_or(0);
        tracing::error!(limit, "task queue bound exceeded");
        self.conclude(Verdict::ResourceExhausted(Resource::TaskQueue { limit }));
    }

    pub(super) fn visited_full(&self, limit: usize) {
        tracing::error!(limit, "visited set bound exceeded");
        self.conclude(Verdict::ResourceExhausted(Resource::VisitedSet { limit }));
    }
}
