//! Error types for interface analysis and layer search.

use thiserror::Error;

/// Errors raised while sampling or analysing a cut interface.
#[derive(Error, Debug)]
pub enum InterfaceError {
    /// A parameter is out of range.
    #[error("invalid alignment parameters: {0}")]
    InvalidParameters(String),

    /// There is nothing to sample.
    #[error("cannot sample an empty mesh")]
    EmptyMesh,
}

/// Errors raised by the vertical layer optimizer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayerError {
    /// No subset of candidate cuts keeps every layer within reach.
    #[error("no layer split keeps every layer under {max_reach_z} mm (height {height} mm)")]
    Infeasible {
        /// Total model height.
        height: f64,
        /// Largest printable layer thickness.
        max_reach_z: f64,
    },

    /// Exhaustive search was asked to enumerate too many cuts.
    #[error("{candidates} candidate cuts exceeds the brute-force limit of {limit}")]
    TooManyCandidates {
        /// Candidate cut count.
        candidates: usize,
        /// Configured limit.
        limit: usize,
    },

    /// Settings cannot produce a candidate set.
    #[error("invalid layer settings: {0}")]
    InvalidParameters(String),
}

/// Result type for interface analysis.
pub type Result<T> = std::result::Result<T, InterfaceError>;
