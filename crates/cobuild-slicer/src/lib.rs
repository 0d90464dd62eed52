#![warn(missing_docs)]

//! Layer slicing for cobuild chunks.
//!
//! Each chunk mesh is cut by horizontal planes one slice thickness apart.
//! The unordered intersection segments of a layer are chained into closed
//! rings, and the region the rings bound is filled with a solid zig-zag
//! infill swept along X.
//! The resulting paths land in [`Chunk::slices`](cobuild_chunker::Chunk).
//!
//! # Example
//!
//! ```ignore
//! use cobuild_slicer::{slice_chunks, SliceSettings};
//!
//! let report = slice_chunks(plan.robots.iter_mut().flat_map(|r| r.chunks.iter_mut()), &SliceSettings::default())?;
//! println!("{} layers, {} paths", report.layers, report.paths);
//! ```

mod error;
pub mod infill;
pub mod ring;
pub mod slice;

pub use error::{Result, SlicerError};
pub use infill::{build_path, fill_ring, fill_rings, generate_infill, generate_region_infill};
pub use ring::sort_boundary;
pub use slice::{layer_heights, slice_chunk, slice_chunks, slice_mesh, SliceLayer, SliceReport};

use serde::{Deserialize, Serialize};

/// Slicing parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SliceSettings {
    /// Layer thickness (mm).
    pub slice_thickness: f64,
    /// Infill line spacing and wall inset, as a fraction of the thickness.
    pub infill_inset_ratio: f64,
}

impl Default for SliceSettings {
    fn default() -> Self {
        Self {
            slice_thickness: 0.5,
            infill_inset_ratio: 0.75,
        }
    }
}

impl SliceSettings {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if !(self.slice_thickness > 0.0) {
            return Err(SlicerError::InvalidSettings(
                "slice_thickness must be positive".into(),
            ));
        }
        if !(self.infill_inset_ratio > 0.0) {
            return Err(SlicerError::InvalidSettings(
                "infill_inset_ratio must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Infill spacing and inset (mm).
    pub fn inset(&self) -> f64 {
        self.slice_thickness * self.infill_inset_ratio
    }
}
