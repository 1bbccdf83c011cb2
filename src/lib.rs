pub mod config;
pub mod error;
pub mod problem;
pub mod puzzle;
pub mod search;
pub mod utils;

pub use config::{Config, FailurePolicy, SolverConfig};
pub use error::{BoardError, ConfigError, ProblemError, Resource, SolveError};
pub use problem::Problem;
pub use search::{CancelToken, Outcome, SearchState, SolveReport, Solver, solve};
