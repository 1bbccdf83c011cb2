pub mod cancel;
pub mod counter;
pub mod latch;
pub mod node;
pub mod pool;
pub mod solver;
pub mod stats;
pub mod visited;

pub use cancel::CancelToken;
pub use counter::ActiveTaskCounter;
pub use latch::{LatchWait, ResultLatch};
pub use node::{Node, NodeRef};
pub use pool::{PoolConfig, PoolState, Submission, Submitter, WorkerPool};
pub use solver::{Outcome, SearchState, SolveReport, Solver, solve};
pub use stats::{SearchStats, StatsSnapshot};
pub use visited::VisitedSet;
