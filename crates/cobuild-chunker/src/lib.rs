#![warn(missing_docs)]

//! Chunking of meshes for cooperative 3D printing.
//!
//! A model too large for one robot is cut into chunks along sloped planes:
//! rows along Y, columns along X and, for tall models, horizontal layers.
//! Every chunk gets a global number, a robot, a color and the chunks it must
//! wait for. The result is a [`ChunkPlan`] whose robot queues respect one
//! global topological order of the dependency graph.
//!
//! # Example
//!
//! ```ignore
//! use cobuild_chunker::{chunk_model, ChunkMode, ChunkingConfig, RobotParameters};
//! use cobuild_interface::AgParameters;
//!
//! let plan = chunk_model(
//!     &model,
//!     ChunkMode::Scaled,
//!     &RobotParameters::default(),
//!     &ChunkingConfig::default(),
//!     &AgParameters::default(),
//!     2,
//! )?;
//! for (robot, queue) in plan.machine_chunks().iter().enumerate() {
//!     println!("robot {robot}: {queue:?}");
//! }
//! ```

pub mod chunk;
pub mod columns;
pub mod config;
mod error;
pub mod graph;
pub mod layers;
pub mod plan;
pub mod prepare;
pub mod robot;
pub mod rows;
pub mod scaled;
pub mod toolpath;

use cobuild_interface::AgParameters;
use cobuild_kernel_mesh::TriangleMesh;
use serde::{Deserialize, Serialize};

pub use chunk::{AlignmentFeature, Chunk, ChunkGeometry, FeatureKind};
pub use config::{BuildPlate, ChunkingConfig, ColumnStrategy, RowStrategy};
pub use error::{ChunkerError, Result};
pub use graph::DependencyGraph;
pub use layers::{plan_layers, start_scaled_layers, vertical_layers};
pub use plan::ChunkPlan;
pub use robot::{Robot, RobotParameters, MAX_PRINTHEAD_SLOPE, MIN_PRINTHEAD_SLOPE};
pub use rows::{make_rows, ChunkerResult};
pub use scaled::{start_scaled, start_scaled_one_sided, start_single};
pub use toolpath::{ChunkFrame, Command, Material, Path, Slice};

/// Top-level chunking strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkMode {
    /// Rows and columns from the configured strategies.
    #[default]
    Scaled,
    /// Origin band at the max-Y end, rows growing toward −Y.
    OneSided,
    /// Horizontal layers, each chunked as [`ChunkMode::Scaled`].
    Layers,
}

/// Chunk `model` with `mode`.
///
/// `ag` only matters for [`ChunkMode::Layers`].
pub fn chunk_model(
    model: &TriangleMesh,
    mode: ChunkMode,
    robot: &RobotParameters,
    config: &ChunkingConfig,
    ag: &AgParameters,
    robots: usize,
) -> Result<ChunkPlan> {
    match mode {
        ChunkMode::Scaled => start_scaled(model, robot, config, robots),
        ChunkMode::OneSided => start_scaled_one_sided(model, robot, config, robots),
        ChunkMode::Layers => start_scaled_layers(model, robot, config, ag, robots),
    }
}
