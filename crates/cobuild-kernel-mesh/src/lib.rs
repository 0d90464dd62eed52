#![warn(missing_docs)]

//! Triangle meshes for the cobuild kernel.
//!
//! Provides the geometric primitives the chunker and slicer are built on:
//! planes, line segments, triangles with plane intersection, an owned
//! triangle mesh with running bounds, plane bisection with capped cuts,
//! grid-accelerated ray casting and STL I/O.
//!
//! # Example
//!
//! ```ignore
//! use cobuild_kernel_mesh::{shapes, split, Plane};
//! use cobuild_kernel_math::Point3;
//!
//! let cube = shapes::cuboid(Point3::origin(), Point3::new(10.0, 10.0, 10.0));
//! let halves = split(&cube, &Plane::horizontal(4.0));
//! assert!(!halves.negative.is_empty());
//! ```

pub mod cap;
mod error;
pub mod mesh;
pub mod plane;
pub mod raycast;
pub mod segment;
pub mod shapes;
pub mod split;
pub mod stl;
pub mod triangle;

pub use error::{MeshError, Result};
pub use mesh::TriangleMesh;
pub use plane::Plane;
pub use raycast::{MeshRaycaster, Ray, RayHit};
pub use segment::LineSegment;
pub use split::{split, split_with_tolerance, SplitResult};
pub use triangle::{PlaneIntersection, Triangle};
