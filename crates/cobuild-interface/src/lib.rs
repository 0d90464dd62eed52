#![warn(missing_docs)]

//! Interface analysis for vertical chunking.
//!
//! A horizontal cut through a model leaves a cross-section that the layer
//! above is printed onto. This crate samples that section into an occupancy
//! grid by vertical ray casts, finds where alignment pegs fit, counts the
//! disconnected islands the cut creates, and searches for the set of cut
//! heights that keeps every layer within reach while creating the fewest
//! islands.
//!
//! # Example
//!
//! ```ignore
//! use cobuild_interface::{ag_locations, ray_grid, AgParameters, GridSettings};
//!
//! let params = AgParameters::default();
//! let grid = ray_grid(&upper_piece, cut_z, &GridSettings::with_density(params.grid_density), true)?;
//! for site in ag_locations(&grid, &params) {
//!     println!("peg r={} at ({}, {})", site.radius, site.x, site.y);
//! }
//! ```

mod error;
pub mod grid;
pub mod interface;
pub mod islands;
pub mod layers;
pub mod placement;

pub use error::{InterfaceError, LayerError, Result};
pub use grid::{ray_grid, GridSettings, OccupancyGrid};
pub use interface::{interface_check, CodedGrid};
pub use islands::{count_islands, IslandMap};
pub use layers::{
    optimize, optimize_bruteforce, optimize_dp, CutMetrics, LayerPlan, LayerScore, LayerSettings,
};
pub use placement::{ag_locations, AgParameters, AlignmentSite};
