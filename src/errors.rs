// src/errors.rs

//! Crate-wide error type and `Result` alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TasklabError {
    /// Missing or out-of-range parameter. The offending operation aborts
    /// without mutating any state.
    #[error("configuration error: {0}")]
    Config(String),

    /// An operation required a graph but none is loaded. Non-fatal.
    #[error("no task graph loaded")]
    EmptyGraph,

    /// A graph failed structural validation (corrupt or hand-built input).
    #[error("graph invariant violated: {0}")]
    Invariant(String),

    /// Save/restore/plot could not reach its target. Non-fatal; the
    /// in-memory graph is untouched.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// A required runtime could not be resolved. Fatal for the current run.
    #[error("runtime binding error: {0}")]
    RuntimeBind(String),

    /// One or more task bodies observed a false predecessor output.
    #[error("scheduler violated dependencies of tasks {0:?}")]
    SchedulerViolation(Vec<u32>),

    /// `watch`/`deliver` called with a kind outside the closed event set.
    #[error("unsupported event kind: {0}")]
    UnsupportedEvent(u8),

    /// A wire-level dependency mode code outside {1, 2, 3}.
    #[error("unsupported dependency mode code: {0}")]
    UnsupportedMode(u8),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, TasklabError>;
