use std::sync::Arc;

use super::shared_search::{SearchNode, SharedSearch, Verdict};
use crate::{
    error::CapacityError,
    problem::Problem,
    search::{Node, SearchStats, pool::Submission},
};

/// Counter bookkeeping wrapped around one unit of work. Issuing a ticket
/// increments the active-task counter; dropping it decrements, whether the
/// task ran, panicked or was discarded by the pool.
pub(super) struct Ticket<P: Problem> {
    search: Arc<SharedSearch<P>>,
}

impl<P: Problem> Ticket<P> {
    pub(super) fn issue(search: &Arc<SharedSearch<P>>) -> Self {
        search.counter.increment();
        Self {
            search: Arc::clone(search),
        }
    }

    fn run(self, node: SearchNode<P>) {
        let search = &self.search;
        SearchStats::bump(&search.stats.tasks_run);
        if search.should_stop() {
            SearchStats::bump(&search.stats.cancelled_tasks);
            if search.cancel.is_cancelled() {
                search.submitter.shutdown();
            }
            return;
        }
        SearchStats::bump(&search.stats.goal_checks);
        match search.guarded(|| Ok(search.problem.is_goal(&node.position))) {
            Ok(true) => {
                tracing::debug!(depth = node.depth, "goal reached");
                search.conclude(Verdict::Solved(node));
            }
            Ok(false) => expand(search, &node),
            Err(err) => {
                search.collaborator_failed(&node, err);
            }
        }
    }
}

impl<P: Problem> Drop for Ticket<P> {
    fn drop(&mut self) {
        self.search.task_finished();
    }
}

/// Submits a task for `node`. The child's ticket is issued before this
/// returns, so callers holding their own ticket keep the counter above zero.
pub(super) fn spawn<P: Problem>(search: &Arc<SharedSearch<P>>, node: SearchNode<P>) -> bool {
    let ticket = Ticket::issue(search);
    match search.submitter.submit(move || ticket.run(node)) {
        Submission::Accepted => true,
        Submission::Discarded => false,
        Submission::QueueFull => {
            search.queue_full();
            false
        }
    }
}

fn expand<P: Problem>(search: &Arc<SharedSearch<P>>, node: &SearchNode<P>) {
    let problem = &search.problem;
    let moves = match search.guarded(|| problem.legal_moves(&node.position)) {
        Ok(moves) => moves,
        Err(err) => {
            search.collaborator_failed(node, err);
            return;
        }
    };
    SearchStats::bump(&search.stats.expansions);
    for mov in moves {
        let position = match search.guarded(|| problem.apply_move(&node.position, &mov)) {
            Ok(position) => position,
            Err(err) => {
                if search.collaborator_failed(node, err) {
                    continue;
                }
                return;
            }
        };
        match search.visited.try_mark_visited(&position) {
            Ok(true) => {}
            Ok(false) => {
                SearchStats::bump(&search.stats.duplicates_pruned);
                continue;
            }
            Err(CapacityError { limit }) => {
                search.visited_full(limit);
                return;
            }
        }
        SearchStats::bump(&search.stats.children_generated);
        if !spawn(search, Node::child(node, mov, position)) {
            return;
        }
    }
}
