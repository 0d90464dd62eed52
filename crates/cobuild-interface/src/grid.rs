//! Occupancy grids sampled by vertical ray casts.

use serde::{Deserialize, Serialize};

use cobuild_kernel_mesh::{MeshRaycaster, TriangleMesh};

use crate::error::{InterfaceError, Result};

/// Sampling parameters for [`ray_grid`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSettings {
    /// Target spacing between samples in mm.
    pub density: f64,
    /// A hit counts when it lands this close to the interface height.
    pub tolerance: f64,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            density: 1.0,
            tolerance: 1.0,
        }
    }
}

impl GridSettings {
    /// Settings for models pre-scaled into `[-1, 1]`.
    pub fn normalized() -> Self {
        Self {
            density: 0.02,
            tolerance: 0.1,
        }
    }

    /// Grid spacing `density` with the default tolerance.
    pub fn with_density(density: f64) -> Self {
        Self {
            density,
            ..Self::default()
        }
    }
}

/// Boolean grid over regular XY sample positions.
///
/// Cells are addressed `(ix, iy)`; `xs[ix]` and `ys[iy]` hold the sample
/// coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct OccupancyGrid {
    xs: Vec<f64>,
    ys: Vec<f64>,
    cells: Vec<bool>,
    x_extreme: f64,
    y_extreme: f64,
}

impl OccupancyGrid {
    /// Grid with every cell unoccupied.
    ///
    /// The extremes default to the largest absolute sample coordinate.
    pub fn new(xs: Vec<f64>, ys: Vec<f64>) -> Self {
        let extreme = |v: &[f64]| v.iter().fold(0.0f64, |m, c| m.max(c.abs()));
        let x_extreme = extreme(&xs);
        let y_extreme = extreme(&ys);
        let cells = vec![false; xs.len() * ys.len()];
        Self {
            xs,
            ys,
            cells,
            x_extreme,
            y_extreme,
        }
    }

    /// Grid of `nx × ny` samples starting at `origin` with unit spacing,
    /// filled from `occupied(ix, iy)`.
    pub fn from_fn(
        nx: usize,
        ny: usize,
        origin: [f64; 2],
        step: f64,
        mut occupied: impl FnMut(usize, usize) -> bool,
    ) -> Self {
        let xs = (0..nx).map(|i| origin[0] + i as f64 * step).collect();
        let ys = (0..ny).map(|j| origin[1] + j as f64 * step).collect();
        let mut grid = Self::new(xs, ys);
        for ix in 0..nx {
            for iy in 0..ny {
                grid.set(ix, iy, occupied(ix, iy));
            }
        }
        grid
    }

    /// Override the clearance extremes.
    pub fn with_extremes(mut self, x_extreme: f64, y_extreme: f64) -> Self {
        self.x_extreme = x_extreme;
        self.y_extreme = y_extreme;
        self
    }

    /// Samples along X.
    pub fn nx(&self) -> usize {
        self.xs.len()
    }

    /// Samples along Y.
    pub fn ny(&self) -> usize {
        self.ys.len()
    }

    /// Sample X coordinates.
    pub fn xs(&self) -> &[f64] {
        &self.xs
    }

    /// Sample Y coordinates.
    pub fn ys(&self) -> &[f64] {
        &self.ys
    }

    /// `max(|x_min|, |x_max|)` of the sampled section.
    pub fn x_extreme(&self) -> f64 {
        self.x_extreme
    }

    /// `max(|y_min|, |y_max|)` of the sampled section.
    pub fn y_extreme(&self) -> f64 {
        self.y_extreme
    }

    /// Spacing between X samples.
    pub fn step_x(&self) -> f64 {
        step(&self.xs)
    }

    /// Spacing between Y samples.
    pub fn step_y(&self) -> f64 {
        step(&self.ys)
    }

    /// Cell state; out-of-range cells are unoccupied.
    pub fn get(&self, ix: usize, iy: usize) -> bool {
        ix < self.nx() && iy < self.ny() && self.cells[self.index(ix, iy)]
    }

    /// Set a cell.
    pub fn set(&mut self, ix: usize, iy: usize, occupied: bool) {
        if ix < self.nx() && iy < self.ny() {
            let i = self.index(ix, iy);
            self.cells[i] = occupied;
        }
    }

    /// Number of occupied cells.
    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    fn index(&self, ix: usize, iy: usize) -> usize {
        iy * self.xs.len() + ix
    }
}

fn step(samples: &[f64]) -> f64 {
    match samples {
        [a, b, ..] => b - a,
        _ => 1.0,
    }
}

/// Sample positions from `min` toward `max`.
///
/// The count comes from the symmetric extent `2 · max(|min|, |max|)`, which
/// fixes the spacing; sampling stops once past `max`.
fn samples(min: f64, max: f64, density: f64) -> Vec<f64> {
    let extreme = min.abs().max(max.abs());
    let n = ((2.0 * extreme) / density).ceil() as usize;
    let step = if n > 1 {
        2.0 * extreme / (n - 1) as f64
    } else {
        density
    };
    let mut out = Vec::new();
    let mut i = 0usize;
    loop {
        let v = min + i as f64 * step;
        if v > max + 1e-9 {
            break;
        }
        out.push(v);
        i += 1;
    }
    out
}

/// Occupancy of the section of `mesh` at height `layer_z`.
///
/// Each sample casts vertically through the mesh: `upward` finds the lowest
/// surface, downward the highest. A cell is occupied when that surface lies
/// within `settings.tolerance` of `layer_z`; misses stay unoccupied.
pub fn ray_grid(
    mesh: &TriangleMesh,
    layer_z: f64,
    settings: &GridSettings,
    upward: bool,
) -> Result<OccupancyGrid> {
    if mesh.is_empty() {
        return Err(InterfaceError::EmptyMesh);
    }
    if !(settings.density > 0.0) {
        return Err(InterfaceError::InvalidParameters(format!(
            "grid density must be positive, got {}",
            settings.density
        )));
    }

    let bounds = mesh.bounds();
    let caster = MeshRaycaster::new(mesh, settings.density * 4.0);
    let xs = samples(bounds.min.x, bounds.max.x, settings.density);
    let ys = samples(bounds.min.y, bounds.max.y, settings.density);

    let mut grid = OccupancyGrid::new(xs, ys).with_extremes(
        bounds.min.x.abs().max(bounds.max.x.abs()),
        bounds.min.y.abs().max(bounds.max.y.abs()),
    );
    for ix in 0..grid.nx() {
        for iy in 0..grid.ny() {
            let hit = caster.cast_vertical(grid.xs[ix], grid.ys[iy], upward);
            if let Some(hit) = hit {
                if (hit.point.z - layer_z).abs() <= settings.tolerance {
                    grid.set(ix, iy, true);
                }
            }
        }
    }

    tracing::debug!(
        nx = grid.nx(),
        ny = grid.ny(),
        occupied = grid.occupied_count(),
        layer_z,
        upward,
        "sampled interface grid"
    );
    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cobuild_kernel_math::Point3;
    use cobuild_kernel_mesh::shapes::cuboid;

    #[test]
    fn test_samples_cover_symmetric_range() {
        let s = samples(-5.0, 5.0, 1.0);
        assert_relative_eq!(s[0], -5.0);
        assert_relative_eq!(*s.last().unwrap(), 5.0, epsilon = 1e-9);
        assert_eq!(s.len(), 10);
    }

    #[test]
    fn test_samples_offset_range_stop_at_max() {
        let s = samples(2.0, 6.0, 1.0);
        assert!(s.iter().all(|&v| (2.0..=6.0 + 1e-9).contains(&v)));
        assert_relative_eq!(s[1] - s[0], 12.0 / 11.0, epsilon = 1e-12);
    }

    #[test]
    fn test_upward_grid_finds_bottom_face() {
        let cube = cuboid(Point3::new(-4.0, -4.0, 10.0), Point3::new(4.0, 4.0, 20.0));
        let grid = ray_grid(&cube, 10.0, &GridSettings::default(), true).unwrap();
        assert_eq!(grid.occupied_count(), grid.nx() * grid.ny());

        let miss = ray_grid(&cube, 15.0, &GridSettings::default(), true).unwrap();
        assert_eq!(miss.occupied_count(), 0);
    }

    #[test]
    fn test_downward_grid_finds_top_face() {
        let cube = cuboid(Point3::new(-4.0, -4.0, 0.0), Point3::new(4.0, 4.0, 6.0));
        let grid = ray_grid(&cube, 6.0, &GridSettings::default(), false).unwrap();
        assert!(grid.occupied_count() > 0);
        assert_relative_eq!(grid.x_extreme(), 4.0);
    }

    #[test]
    fn test_empty_mesh_rejected() {
        assert!(matches!(
            ray_grid(&TriangleMesh::new(), 0.0, &GridSettings::default(), true),
            Err(InterfaceError::EmptyMesh)
        ));
    }
}
