//! Cutting a model into rows along Y.
//!
//! Every row wall is a plane leaning by the printhead slope, so a chunk
//! printed later never has to reach under one printed earlier.

use cobuild_kernel_math::{Point3, Vec3};
use cobuild_kernel_mesh::{split, Plane, TriangleMesh};

use crate::config::{ChunkingConfig, RowStrategy};
use crate::error::{ChunkerError, Result};
use crate::robot::RobotParameters;

/// Rows produced by a row strategy, innermost first.
#[derive(Debug, Clone, Default)]
pub struct ChunkerResult {
    /// Row printed first.
    pub origin: TriangleMesh,
    /// Rows toward +Y.
    pub north: Vec<TriangleMesh>,
    /// Rows toward −Y.
    pub south: Vec<TriangleMesh>,
}

impl ChunkerResult {
    /// Whole model as the only row.
    pub fn single(model: &TriangleMesh) -> Self {
        Self {
            origin: model.clone(),
            ..Self::default()
        }
    }

    /// Number of rows including the origin.
    pub fn row_count(&self) -> usize {
        1 + self.north.len() + self.south.len()
    }
}

/// Cut `model` into rows with `config.rows`.
pub fn make_rows(
    model: &TriangleMesh,
    robot: &RobotParameters,
    config: &ChunkingConfig,
) -> Result<ChunkerResult> {
    make_rows_with(model, robot, config, config.rows)
}

/// Cut `model` into rows with an explicit strategy.
pub fn make_rows_with(
    model: &TriangleMesh,
    robot: &RobotParameters,
    config: &ChunkingConfig,
    strategy: RowStrategy,
) -> Result<ChunkerResult> {
    let result = match strategy {
        RowStrategy::Symmetric => symmetric_rows(model, robot)?,
        RowStrategy::Buildplate => buildplate_rows(model, robot, config),
        RowStrategy::OneSided => one_sided_rows(model, robot, config)?,
    };
    tracing::debug!(
        ?strategy,
        north = result.north.len(),
        south = result.south.len(),
        "cut rows"
    );
    Ok(result)
}

/// Two-robot rows: an origin row of width
/// `min(build_depth, 2·printhead_depth + 2·sw)` centred on the model, then
/// rows of `build_depth − sw` outward on both sides.
pub fn symmetric_rows(model: &TriangleMesh, robot: &RobotParameters) -> Result<ChunkerResult> {
    let b = model.bounds();
    if b.size().y < robot.build_depth {
        return Ok(ChunkerResult::single(model));
    }

    let run = robot.slope_run();
    let sw = b.height() * run;
    let step = robot.build_depth - sw;
    if step <= 0.0 {
        return Err(ChunkerError::InvalidConfig(format!(
            "model height {:.3} leaves no printable depth (slope width {sw:.3} ≥ build depth {})",
            b.height(),
            robot.build_depth
        )));
    }
    let w0 = robot.build_depth.min(2.0 * robot.printhead_depth + 2.0 * sw);
    let yc = b.center().y;

    let (origin, north_piece, south_piece) = cut_origin(model, yc + w0 / 2.0, yc - w0 / 2.0, run, b.min.z);
    let north = march(north_piece, yc + w0 / 2.0 + step, step, b.max.y, run, b.min.z, true);
    let south = march(south_piece, yc - w0 / 2.0 - step, step, b.min.y, run, b.min.z, false);
    Ok(ChunkerResult {
        origin,
        north,
        south,
    })
}

/// Rows sized to build plates: a centre row of `±center`, then rows of one
/// plate depth starting `noncenter` past it.
pub fn buildplate_rows(
    model: &TriangleMesh,
    robot: &RobotParameters,
    config: &ChunkingConfig,
) -> ChunkerResult {
    let plate = &config.build_plate;
    let b = model.bounds();
    let center = plate.center();
    if b.size().y < 2.0 * center {
        return ChunkerResult::single(model);
    }

    let run = robot.slope_run();
    let yc = b.center().y;
    let (origin, north_piece, south_piece) = cut_origin(model, yc + center, yc - center, run, b.min.z);
    let first = center + plate.noncenter();
    let north = march(north_piece, yc + first, plate.plate, b.max.y, run, b.min.z, true);
    let south = march(south_piece, yc - first, plate.plate, b.min.y, run, b.min.z, false);
    ChunkerResult {
        origin,
        north,
        south,
    }
}

/// Origin band of `origin_width` at the max-Y end; rows step toward −Y.
pub fn one_sided_rows(
    model: &TriangleMesh,
    robot: &RobotParameters,
    config: &ChunkingConfig,
) -> Result<ChunkerResult> {
    let b = model.bounds();
    if b.size().y < robot.build_depth {
        return Ok(ChunkerResult::single(model));
    }

    let run = robot.slope_run();
    let sw = b.height() * run;
    let step = robot.build_depth - sw;
    if step <= 0.0 {
        return Err(ChunkerError::InvalidConfig(format!(
            "model height {:.3} leaves no printable depth (slope width {sw:.3} ≥ build depth {})",
            b.height(),
            robot.build_depth
        )));
    }

    let origin_y = b.max.y - config.origin_width;
    let south_normal = Vec3::new(0.0, -1.0, run);
    let plane = Plane::from_point_normal(&Point3::new(0.0, origin_y, b.min.z), &south_normal);
    let (origin, rest) = split(model, &plane).into_pair();

    let first = origin_y - config.build_plate.plate - sw;
    let south = march(rest, first, step, b.min.y, run, b.min.z, false);
    Ok(ChunkerResult {
        origin,
        north: Vec::new(),
        south,
    })
}

/// Split off the origin between `north_y` and `south_y`; returns
/// `(origin, north remainder, south remainder)`.
fn cut_origin(
    model: &TriangleMesh,
    north_y: f64,
    south_y: f64,
    run: f64,
    z0: f64,
) -> (TriangleMesh, TriangleMesh, TriangleMesh) {
    let north_plane = Plane::from_point_normal(&Point3::new(0.0, north_y, z0), &Vec3::new(0.0, 1.0, run));
    let south_plane = Plane::from_point_normal(&Point3::new(0.0, south_y, z0), &Vec3::new(0.0, -1.0, run));
    let (inner, north_piece) = split(model, &north_plane).into_pair();
    let (origin, south_piece) = split(&inner, &south_plane).into_pair();
    (origin, north_piece, south_piece)
}

/// Peel rows off `remaining` with planes from `start` stepping by `step`
/// until `limit` is passed; a non-empty remainder becomes the last row.
fn march(
    mut remaining: TriangleMesh,
    start: f64,
    step: f64,
    limit: f64,
    run: f64,
    z0: f64,
    northward: bool,
) -> Vec<TriangleMesh> {
    let mut rows = Vec::new();
    if remaining.is_empty() {
        return rows;
    }
    let normal = if northward {
        Vec3::new(0.0, 1.0, run)
    } else {
        Vec3::new(0.0, -1.0, run)
    };
    let mut y = start;
    while (northward && y < limit) || (!northward && y > limit) {
        let plane = Plane::from_point_normal(&Point3::new(0.0, y, z0), &normal);
        let (row, rest) = split(&remaining, &plane).into_pair();
        rows.push(row);
        remaining = rest;
        y = if northward { y + step } else { y - step };
    }
    if !remaining.is_empty() {
        rows.push(remaining);
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cobuild_kernel_mesh::shapes::cuboid;

    fn vertical_robot() -> RobotParameters {
        RobotParameters {
            printhead_slope: std::f64::consts::FRAC_PI_2,
            build_depth: 100.0,
            printhead_depth: 20.0,
            ..Default::default()
        }
    }

    fn slab(depth: f64) -> TriangleMesh {
        cuboid(
            Point3::new(-10.0, -depth / 2.0, 0.0),
            Point3::new(10.0, depth / 2.0, 10.0),
        )
    }

    fn total_volume(r: &ChunkerResult) -> f64 {
        r.origin.signed_volume()
            + r.north.iter().map(TriangleMesh::signed_volume).sum::<f64>()
            + r.south.iter().map(TriangleMesh::signed_volume).sum::<f64>()
    }

    #[test]
    fn test_shallow_model_is_one_row() {
        let r = symmetric_rows(&slab(50.0), &vertical_robot()).unwrap();
        assert_eq!(r.row_count(), 1);
        assert_eq!(r.origin.triangle_count(), 12);
    }

    #[test]
    fn test_symmetric_rows_with_vertical_walls() {
        // w0 = min(100, 40) = 40; rows of 100 on each side.
        let model = slab(300.0);
        let r = symmetric_rows(&model, &vertical_robot()).unwrap();
        let ob = r.origin.bounds();
        assert_relative_eq!(ob.min.y, -20.0, epsilon = 1e-9);
        assert_relative_eq!(ob.max.y, 20.0, epsilon = 1e-9);
        assert_eq!(r.north.len(), 2);
        assert_eq!(r.south.len(), 2);
        assert_relative_eq!(r.north[0].bounds().max.y, 120.0, epsilon = 1e-9);
        assert_relative_eq!(r.south[0].bounds().min.y, -120.0, epsilon = 1e-9);
        assert_relative_eq!(total_volume(&r), model.signed_volume(), epsilon = 1e-6);
    }

    #[test]
    fn test_symmetric_rows_centre_on_model() {
        let mut model = slab(300.0);
        model.translate(&Vec3::new(0.0, 500.0, 0.0));
        let r = symmetric_rows(&model, &vertical_robot()).unwrap();
        let ob = r.origin.bounds();
        assert_relative_eq!(ob.center().y, 500.0, epsilon = 1e-9);
    }

    #[test]
    fn test_sloped_walls_lean_inward() {
        let robot = RobotParameters {
            printhead_slope: std::f64::consts::FRAC_PI_4,
            ..vertical_robot()
        };
        let r = symmetric_rows(&slab(300.0), &robot).unwrap();
        // sw = 10, w0 = min(100, 60) = 60: the origin is 60 deep at the base, 40 at the top.
        let ob = r.origin.bounds();
        assert_relative_eq!(ob.max.y, 30.0, epsilon = 1e-9);
        let top: Vec<f64> = r
            .origin
            .triangles()
            .iter()
            .flat_map(|t| t.vertices)
            .filter(|v| (v.z - 10.0).abs() < 1e-9)
            .map(|v| v.y)
            .collect();
        let top_max = top.iter().cloned().fold(f64::MIN, f64::max);
        assert_relative_eq!(top_max, 20.0, epsilon = 1e-9);
    }

    #[test]
    fn test_too_tall_for_slope_is_rejected() {
        let robot = RobotParameters {
            printhead_slope: 0.35,
            build_depth: 100.0,
            ..Default::default()
        };
        let tall = cuboid(Point3::new(-10.0, -200.0, 0.0), Point3::new(10.0, 200.0, 80.0));
        assert!(matches!(
            symmetric_rows(&tall, &robot),
            Err(ChunkerError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_buildplate_rows() {
        let model = slab(800.0);
        let r = buildplate_rows(&model, &vertical_robot(), &ChunkingConfig::xy_reference());
        let ob = r.origin.bounds();
        assert_relative_eq!(ob.min.y, -150.0, epsilon = 1e-9);
        assert_relative_eq!(ob.max.y, 150.0, epsilon = 1e-9);
        // First row band 150..200, then the 200..400 remainder.
        assert_relative_eq!(r.north[0].bounds().max.y, 200.0, epsilon = 1e-9);
        assert_eq!(r.north.len(), 2);
        assert_relative_eq!(total_volume(&r), model.signed_volume(), epsilon = 1e-6);
    }

    #[test]
    fn test_one_sided_rows() {
        let model = slab(1000.0);
        let config = ChunkingConfig::xy_reference();
        let r = one_sided_rows(&model, &vertical_robot(), &config).unwrap();
        let ob = r.origin.bounds();
        assert_relative_eq!(ob.max.y, 500.0, epsilon = 1e-9);
        assert_relative_eq!(ob.min.y, 200.0, epsilon = 1e-9);
        assert!(r.north.is_empty());
        // First south plane at 200 − 300 = −100, then every 100.
        assert_relative_eq!(r.south[0].bounds().min.y, -100.0, epsilon = 1e-9);
        assert_relative_eq!(total_volume(&r), model.signed_volume(), epsilon = 1e-6);
    }
}
