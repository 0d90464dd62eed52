//! Error types for simulation.

use thiserror::Error;

/// Errors that can occur while simulating a plan.
#[derive(Error, Debug)]
pub enum SimError {
    /// No robot could advance although some were still waiting.
    #[error("deadlock at tick {tick}: chunks {waiting:?} wait on chunks that never finish")]
    Deadlock {
        /// Tick at which nothing moved.
        tick: usize,
        /// Chunks at the head of each waiting robot's queue.
        waiting: Vec<usize>,
    },

    /// A chunk depends on a chunk no robot owns.
    #[error("chunk {chunk} depends on unknown chunk {dependency}")]
    MissingDependency {
        /// Dependent chunk.
        chunk: usize,
        /// Unknown prerequisite.
        dependency: usize,
    },

    /// The dependency graph loops back on `chunk`.
    #[error("dependency cycle through chunk {chunk}")]
    DependencyCycle {
        /// A chunk on the cycle.
        chunk: usize,
    },

    /// Invalid simulation settings.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Reading or writing a file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for simulation operations.
pub type Result<T> = std::result::Result<T, SimError>;
