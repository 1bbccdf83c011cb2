use mimalloc::MiMalloc;
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;
use std::{process::ExitCode, thread, time::Duration};

use frontier::{
    CancelToken, Outcome, SolveReport, Solver,
    config::Config,
    puzzle::{Board, Slide, SlidingPuzzle},
    utils::available_memory_bytes,
};
use rand::{SeedableRng, rngs::StdRng};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn spawn_memory_watchdog(cancel: CancelToken, config: &Config) {
    let min_available_memory_mb = config.solver.min_available_memory_mb;
    let min_available_memory_bytes = min_available_memory_mb.saturating_mul(1024 * 1024);
    let poll_interval = Duration::from_millis(config.solver.memory_check_interval_ms.max(1));
    thread::spawn(move || {
        while !cancel.is_cancelled() {
            if let Some(available) = available_memory_bytes()
                && available < min_available_memory_bytes
            {
                tracing::error!(
                    available_mb = available / (1024 * 1024),
                    "available memory below {min_available_memory_mb}MB, cancelling search"
                );
                cancel.cancel();
                return;
            }
            thread::sleep(poll_interval);
        }
    });
}

fn load_config() -> Config {
    match Config::load() {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("{err}; using default configuration");
            Config::default()
        }
    }
}

fn print_report(start: &Board, report: &SolveReport<Slide>) {
    match &report.result {
        Ok(Outcome::Solved(moves)) => {
            println!("solved in {} moves:", moves.len());
            let line: Vec<String> = moves.iter().map(ToString::to_string).collect();
            println!("{}", line.join(" "));
        }
        Ok(outcome) => println!("no solution: {}", outcome.label()),
        Err(err) => println!("search failed: {err}"),
    }
    println!(
        "visited {} positions in {:.3}s from\n{start}",
        report.visited,
        report.elapsed.as_secs_f64()
    );
    if let Ok(stats) = serde_yaml::to_string(&report.stats) {
        print!("{stats}");
    }
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_config();
    let cancel = CancelToken::new();
    let on_interrupt = cancel.clone();
    if let Err(err) = ctrlc::set_handler(move || {
        on_interrupt.cancel();
        eprintln!("\ninterrupted, stopping search...");
    }) {
        tracing::warn!("failed to install Ctrl+C handler: {err}");
    }
    spawn_memory_watchdog(cancel.clone(), &config);

    let puzzle = &config.puzzle;
    let mut rng = puzzle
        .seed
        .map_or_else(|| StdRng::from_rng(&mut rand::rng()), StdRng::seed_from_u64);
    let start = match Board::scrambled(puzzle.width, puzzle.height, puzzle.scramble_moves, &mut rng) {
        Ok(board) => board,
        Err(err) => {
            eprintln!("cannot build puzzle: {err}");
            return ExitCode::FAILURE;
        }
    };
    println!("{start}\n");

    let solver = Solver::new(SlidingPuzzle::new(start.clone()), config.solver.clone());
    let report = solver.solve_with_report(&cancel);
    cancel.cancel();
    print_report(&start, &report);
    if report.result.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
