use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;

use crate::{
    error::ConfigError,
    search::pool::DEFAULT_MAX_THREADS,
    utils::{available_parallelism, duration_to_ms},
};

pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// A failing branch yields no moves and the search continues.
    #[default]
    SkipBranch,
    /// The first failure ends the whole search with an error.
    Abort,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub num_threads: usize,
    pub max_threads: usize,
    pub timeout_ms: Option<u64>,
    pub max_visited: Option<usize>,
    pub max_queued: Option<usize>,
    pub failure_policy: FailurePolicy,
    pub drain_timeout_ms: u64,
    pub verbose: bool,
    pub log_interval_ms: u64,
    pub min_available_memory_mb: u64,
    pub memory_check_interval_ms: u64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            num_threads: 0,
            max_threads: DEFAULT_MAX_THREADS,
            timeout_ms: None,
            max_visited: None,
            max_queued: None,
            failure_policy: FailurePolicy::SkipBranch,
            drain_timeout_ms: 1_000,
            verbose: false,
            log_interval_ms: 1_000,
            min_available_memory_mb: 256,
            memory_check_interval_ms: 500,
        }
    }
}

impl SolverConfig {
    #[must_use]
    pub const fn with_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(duration_to_ms(timeout));
        self
    }

    #[must_use]
    pub const fn with_max_visited(mut self, limit: usize) -> Self {
        self.max_visited = Some(limit);
        self
    }

    #[must_use]
    pub const fn with_max_queued(mut self, limit: usize) -> Self {
        self.max_queued = Some(limit);
        self
    }

    #[must_use]
    pub const fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    #[must_use]
    pub const fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Worker count after resolving `0` to the machine's parallelism and
    /// applying the `max_threads` cap.
    #[must_use]
    pub fn resolved_threads(&self) -> usize {
        let requested = if self.num_threads == 0 {
            available_parallelism()
        } else {
            self.num_threads
        };
        requested.clamp(1, self.max_threads.max(1))
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    #[must_use]
    pub const fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }

    #[must_use]
    pub fn log_interval(&self) -> Duration {
        Duration::from_millis(self.log_interval_ms.max(1))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_threads == 0 {
            return Err(ConfigError::Invalid("solver.max_threads must be positive".into()));
        }
        if self.max_queued == Some(0) {
            return Err(ConfigError::Invalid("solver.max_queued must be positive".into()));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PuzzleConfig {
    pub width: usize,
    pub height: usize,
    pub scramble_moves: usize,
    pub seed: Option<u64>,
}

impl Default for PuzzleConfig {
    fn default() -> Self {
        Self {
            width: 3,
            height: 3,
            scramble_moves: 40,
            seed: None,
        }
    }
}

impl PuzzleConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width < 2 || self.height < 2 {
            return Err(ConfigError::Invalid(format!(
                "puzzle must be at least 2x2 (got {}x{})",
                self.width, self.height
            )));
        }
        if self.width.saturating_mul(self.height) > usize::from(u8::MAX) {
            return Err(ConfigError::Invalid(format!(
                "puzzle {}x{} has too many tiles",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub solver: SolverConfig,
    pub puzzle: PuzzleConfig,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config_str = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: PathBuf::from(path),
            source,
        })?;
        let config: Self = serde_yaml::from_str(&config_str).map_err(|source| ConfigError::Parse {
            path: PathBuf::from(path),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.solver.validate()?;
        self.puzzle.validate()
    }
}
