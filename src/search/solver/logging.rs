use std::{
    sync::{Arc, mpsc},
    thread,
    time::{Duration, Instant},
};

use super::{SearchState, SolveReport, shared_search::SharedSearch};
use crate::{problem::Problem, search::StatsSnapshot, utils::duration_to_ms};

struct Progress {
    stats: StatsSnapshot,
    visited: usize,
    active: usize,
    timestamp: Instant,
}

fn capture<P: Problem>(search: &SharedSearch<P>) -> Progress {
    Progress {
        stats: search.stats.snapshot(),
        visited: search.visited.len(),
        active: search.counter.current(),
        timestamp: Instant::now(),
    }
}

fn rate(count: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        f64::from(u32::try_from(count).unwrap_or(u32::MAX)) / secs
    } else {
        0.0
    }
}

fn print_progress(state: SearchState, current: &Progress, previous: &Progress) {
    let delta = current.stats.delta_since(&previous.stats);
    let elapsed = current.timestamp.duration_since(previous.timestamp);
    tracing::info!(
        ?state,
        visited = current.visited,
        active = current.active,
        expansions = current.stats.expansions,
        expansions_per_sec = rate(delta.expansions, elapsed).round(),
        duplicates = delta.duplicates_pruned,
        failures = current.stats.collaborator_failures,
        "search progress"
    );
}

pub(super) fn spawn_logger<P: Problem>(
    search: Arc<SharedSearch<P>>,
    interval: Duration,
) -> (mpsc::Sender<()>, thread::JoinHandle<()>) {
    let (log_tx, log_rx) = mpsc::channel::<()>();
    let handle = thread::spawn(move || {
        let mut last = capture(&search);
        while !search.latch.is_set() {
            if log_rx.recv_timeout(interval).is_ok() {
                break;
            }
            if search.latch.is_set() {
                break;
            }
            let current = capture(&search);
            print_progress(search.state(), &current, &last);
            last = current;
        }
    });
    (log_tx, handle)
}

pub(super) fn log_summary<M>(report: &SolveReport<M>) {
    let stats = &report.stats;
    let outcome = match &report.result {
        Ok(outcome) => outcome.label().to_string(),
        Err(err) => err.to_string(),
    };
    tracing::info!(
        state = ?report.state,
        elapsed_ms = duration_to_ms(report.elapsed),
        visited = report.visited,
        tasks = stats.tasks_run,
        expansions = stats.expansions,
        children = stats.children_generated,
        duplicates = stats.duplicates_pruned,
        failures = stats.collaborator_failures,
        skipped = stats.cancelled_tasks,
        "search finished: {outcome}"
    );
}
