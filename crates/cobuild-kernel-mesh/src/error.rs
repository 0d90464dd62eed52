//! Error types for mesh construction and I/O.

use thiserror::Error;

/// Errors raised while reading, writing or building meshes.
#[derive(Error, Debug)]
pub enum MeshError {
    /// Underlying file system error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The STL data could not be parsed.
    #[error("malformed STL: {0}")]
    MalformedStl(String),

    /// An operation needed triangles but the mesh has none.
    #[error("mesh is empty")]
    EmptyMesh,
}

/// Result type for mesh operations.
pub type Result<T> = std::result::Result<T, MeshError>;
