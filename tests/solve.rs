use std::{
    collections::{HashMap, HashSet},
    thread,
    time::{Duration, Instant},
};

use frontier::{
    CancelToken, FailurePolicy, Outcome, Problem, ProblemError, Resource, SearchState, SolveError,
    Solver, SolverConfig,
    problem::replay_reaches_goal,
    puzzle::{Board, SlidingPuzzle},
    solve,
};
use rand::{Rng, SeedableRng, rngs::StdRng};

/// Directed graph over integer vertices.
struct Graph {
    start: u32,
    goals: HashSet<u32>,
    edges: HashMap<u32, Vec<u32>>,
}

impl Graph {
    fn new(start: u32, goals: &[u32], edges: &[(u32, u32)]) -> Self {
        let mut map: HashMap<u32, Vec<u32>> = HashMap::new();
        for &(from, to) in edges {
            map.entry(from).or_default().push(to);
        }
        Self {
            start,
            goals: goals.iter().copied().collect(),
            edges: map,
        }
    }

    fn random_dag(rng: &mut StdRng, vertices: u32) -> Self {
        let mut edges = Vec::new();
        for from in 0..vertices {
            for to in from + 1..vertices {
                if rng.random_bool(0.08) {
                    edges.push((from, to));
                }
            }
        }
        let goal = rng.random_range(vertices / 2..vertices);
        Self::new(0, &[goal], &edges)
    }
}

impl Problem for Graph {
    type Position = u32;
    type Move = u32;

    fn initial_position(&self) -> u32 {
        self.start
    }

    fn is_goal(&self, position: &u32) -> bool {
        self.goals.contains(position)
    }

    fn legal_moves(&self, position: &u32) -> Result<Vec<u32>, ProblemError> {
        Ok(self.edges.get(position).cloned().unwrap_or_default())
    }

    fn apply_move(&self, position: &u32, target: &u32) -> Result<u32, ProblemError> {
        if self.edges.get(position).is_some_and(|targets| targets.contains(target)) {
            Ok(*target)
        } else {
            Err(ProblemError::msg(format!("no edge {position} -> {target}")))
        }
    }
}

/// Unbounded counter: every position has a successor and none is a goal.
struct Endless;

impl Problem for Endless {
    type Position = u64;
    type Move = ();

    fn initial_position(&self) -> u64 {
        0
    }

    fn is_goal(&self, _position: &u64) -> bool {
        false
    }

    fn legal_moves(&self, _position: &u64) -> Result<Vec<()>, ProblemError> {
        thread::sleep(Duration::from_micros(50));
        Ok(vec![()])
    }

    fn apply_move(&self, position: &u64, _mov: &()) -> Result<u64, ProblemError> {
        Ok(position + 1)
    }
}

/// Ternary tree whose `apply_move` panics on one branch of the root.
struct Panicky;

impl Problem for Panicky {
    type Position = u32;
    type Move = u32;

    fn initial_position(&self) -> u32 {
        1
    }

    fn is_goal(&self, position: &u32) -> bool {
        *position == 40
    }

    fn legal_moves(&self, position: &u32) -> Result<Vec<u32>, ProblemError> {
        if *position > 64 {
            return Ok(Vec::new());
        }
        Ok(vec![0, 1, 2])
    }

    fn apply_move(&self, position: &u32, mov: &u32) -> Result<u32, ProblemError> {
        assert!(!(*position == 1 && *mov == 2), "bad branch");
        Ok(position * 3 + mov - 2)
    }
}

fn workers(threads: usize) -> SolverConfig {
    SolverConfig::default().with_threads(threads)
}

#[test]
fn test_line_graph_two_workers() {
    let graph = Graph::new(0, &[3], &[(0, 1), (1, 2), (2, 3)]);
    let outcome = Solver::new(graph, workers(2)).solve().unwrap();
    assert_eq!(outcome, Outcome::Solved(vec![1, 2, 3]));
}

#[test]
fn test_random_graph_paths_replay_to_goal() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for _ in 0..20 {
        let graph = Graph::random_dag(&mut rng, 60);
        let solver = Solver::new(graph, workers(4));
        match solver.solve().unwrap() {
            Outcome::Solved(moves) => {
                assert!(replay_reaches_goal(solver.problem(), &moves).unwrap());
            }
            Outcome::Exhausted => {}
            other => panic!("unexpected outcome {other:?}"),
        }
    }
}

#[test]
fn test_unreachable_goal_is_exhausted() {
    let graph = Graph::new(0, &[9], &[(0, 1), (0, 2), (1, 3), (2, 3), (3, 4)]);
    let report = Solver::new(graph, workers(3)).solve_with_report(&CancelToken::new());
    assert_eq!(report.result, Ok(Outcome::Exhausted));
    assert_eq!(report.visited, 5);
    assert_eq!(report.stats.expansions, 5);
    assert_eq!(report.stats.duplicates_pruned, 1);
}

#[test]
fn test_cycle_without_goal_is_exhausted() {
    let graph = Graph::new(0, &[], &[(0, 1), (1, 2), (2, 0), (2, 1)]);
    let outcome = Solver::new(graph, workers(4)).solve().unwrap();
    assert_eq!(outcome, Outcome::Exhausted);
}

#[test]
fn test_cancel_before_start() {
    let cancel = CancelToken::new();
    cancel.cancel();
    let graph = Graph::new(0, &[1], &[(0, 1)]);
    let report = Solver::new(graph, workers(2)).solve_with_report(&cancel);
    assert_eq!(report.result, Ok(Outcome::Cancelled));
    assert_eq!(report.stats.tasks_run, 0);
    assert_eq!(report.visited, 0);
}

#[test]
fn test_cancel_during_search() {
    let cancel = CancelToken::new();
    let canceller = cancel.clone();
    let trigger = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        canceller.cancel();
    });
    let started = Instant::now();
    let report = Solver::new(Endless, workers(2)).solve_with_report(&cancel);
    trigger.join().unwrap();
    assert_eq!(report.result, Ok(Outcome::Cancelled));
    assert_eq!(report.state, SearchState::Cancelled);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn test_timeout_on_endless_space() {
    let config = workers(2).with_timeout(Duration::from_millis(100));
    let report = Solver::new(Endless, config).solve_with_report(&CancelToken::new());
    assert_eq!(report.result, Ok(Outcome::TimedOut));
    assert_eq!(report.state, SearchState::TimedOut);
    assert!(report.elapsed >= Duration::from_millis(100));
}

#[test]
fn test_visited_bound_is_resource_exhaustion() {
    let config = workers(2).with_max_visited(1_000);
    let result = Solver::new(Endless, config).solve();
    assert_eq!(
        result,
        Err(SolveError::ResourceExhausted(Resource::VisitedSet { limit: 1_000 }))
    );
}

#[test]
fn test_panicking_collaborator_is_skipped() {
    // A single worker finishes the root expansion before any child runs.
    let config = workers(1).with_failure_policy(FailurePolicy::SkipBranch);
    let report = Solver::new(Panicky, config).solve_with_report(&CancelToken::new());
    let Ok(Outcome::Solved(moves)) = &report.result else {
        panic!("expected a solution, got {:?}", report.result);
    };
    assert!(replay_reaches_goal(&Panicky, moves).unwrap());
    assert_eq!(report.stats.collaborator_failures, 1);
}

#[test]
fn test_panicking_collaborator_aborts() {
    let config = workers(1).with_failure_policy(FailurePolicy::Abort);
    let result = Solver::new(Panicky, config).solve();
    assert_eq!(
        result,
        Err(SolveError::Collaborator(ProblemError::Panicked("bad branch".into())))
    );
}

#[test]
fn test_sliding_puzzle_end_to_end() {
    let start = Board::scrambled(3, 3, 30, &mut StdRng::seed_from_u64(3)).unwrap();
    let solver = Solver::new(SlidingPuzzle::new(start), workers(4));
    let outcome = solver.solve().unwrap();
    let moves = outcome.moves().unwrap();
    assert!(replay_reaches_goal(solver.problem(), moves).unwrap());
}

#[test]
fn test_free_function_with_timeout_and_token() {
    let graph = Graph::new(0, &[2], &[(0, 1), (1, 2)]);
    let cancel = CancelToken::new();
    let outcome = solve(graph, Some(Duration::from_secs(10)), Some(&cancel)).unwrap();
    assert_eq!(outcome, Outcome::Solved(vec![1, 2]));
    assert!(!cancel.is_cancelled());

    let outcome = solve(Endless, Some(Duration::from_millis(50)), None).unwrap();
    assert_eq!(outcome, Outcome::TimedOut);
}
