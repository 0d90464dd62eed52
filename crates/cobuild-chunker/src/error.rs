//! Error types for chunking.

use cobuild_interface::{InterfaceError, LayerError};
use cobuild_kernel_mesh::MeshError;
use thiserror::Error;

/// Errors that can occur while building or checking a chunk plan.
#[derive(Error, Debug)]
pub enum ChunkerError {
    /// Robot or chunking settings are out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The dependency graph has a cycle through these chunks.
    #[error("dependency cycle through chunks {0:?}")]
    DependencyCycle(Vec<usize>),

    /// A chunk depends on a chunk that does not exist.
    #[error("chunk {chunk} depends on unknown chunk {dependency}")]
    MissingDependency {
        /// Dependent chunk.
        chunk: usize,
        /// Missing prerequisite.
        dependency: usize,
    },

    /// The same chunk number was issued twice.
    #[error("chunk number {0} is used more than once")]
    DuplicateChunk(usize),

    /// A chunk is owned by a different robot than it names.
    #[error("chunk {chunk} names robot {named} but is queued on robot {owner}")]
    RobotMismatch {
        /// Offending chunk.
        chunk: usize,
        /// Robot recorded on the chunk.
        named: usize,
        /// Robot whose queue holds it.
        owner: usize,
    },

    /// Vertical layer search failed.
    #[error(transparent)]
    Layer(#[from] LayerError),

    /// Interface sampling failed.
    #[error(transparent)]
    Interface(#[from] InterfaceError),

    /// Mesh input failed.
    #[error(transparent)]
    Mesh(#[from] MeshError),
}

/// Result type for chunking operations.
pub type Result<T> = std::result::Result<T, ChunkerError>;
