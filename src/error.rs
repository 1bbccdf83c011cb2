use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProblemError {
    #[error("{0}")]
    Message(String),
    #[error("collaborator panicked: {0}")]
    Panicked(String),
}

impl ProblemError {
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Resource {
    #[error("visited set exceeded its bound of {limit} positions")]
    VisitedSet { limit: usize },
    #[error("task queue exceeded its bound of {limit} tasks")]
    TaskQueue { limit: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolveError {
    #[error("resource exhausted: {0}")]
    ResourceExhausted(Resource),
    #[error("search aborted by collaborator failure: {0}")]
    Collaborator(#[source] ProblemError),
    #[error("failed to start worker pool: {0}")]
    WorkerSpawn(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("visited set is full ({limit} positions)")]
pub struct CapacityError {
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("board must be at least 2x2 with at most 255 cells (got {width}x{height})")]
    Dimensions { width: usize, height: usize },
    #[error("expected {expected} tiles, got {got}")]
    Length { expected: usize, got: usize },
    #[error("tiles must be a permutation of 0..{cells}")]
    NotPermutation { cells: usize },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
