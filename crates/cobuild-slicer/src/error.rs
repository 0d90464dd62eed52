//! Error types for the slicer.

use thiserror::Error;

/// Errors that can occur during slicing.
#[derive(Error, Debug)]
pub enum SlicerError {
    /// Mesh has no triangles.
    #[error("mesh is empty")]
    EmptyMesh,

    /// Invalid slice settings.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// Boundary segments could not be chained into rings.
    #[error("boundary of {segments} segments has {degree} segments meeting at one point")]
    MalformedRing {
        /// Segments in the boundary.
        segments: usize,
        /// Segments sharing the busiest endpoint.
        degree: usize,
    },
}

/// Result type for slicer operations.
pub type Result<T> = std::result::Result<T, SlicerError>;
