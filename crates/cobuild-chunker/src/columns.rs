//! Cutting a row into columns along X.

use cobuild_kernel_math::{Aabb3, Point3, Vec3};
use cobuild_kernel_mesh::{split, Plane, TriangleMesh};

use crate::chunk::ChunkGeometry;
use crate::config::{ChunkingConfig, ColumnStrategy};
use crate::robot::RobotParameters;

/// Cut `row` into columns with `config.columns`.
///
/// `model` is the bounds of the whole model; the column layout follows the
/// model width, not the row's own.
pub fn make_columns(
    row: &TriangleMesh,
    model: &Aabb3,
    robot: &RobotParameters,
    config: &ChunkingConfig,
    pieces: Option<usize>,
) -> Vec<ChunkGeometry> {
    match config.columns {
        ColumnStrategy::Alternating => subdivide_row(row, model, robot, pieces),
        ColumnStrategy::Stepped => stepped_columns(row, model, robot, config, pieces),
    }
}

/// Centred columns with walls alternately leaning east and west.
///
/// With `pieces == Some(2)` the row is returned whole. Otherwise `chunks`
/// is half the piece count, or enough robot widths to cover half the model.
/// Cuts sit at `x_c + i·(pw + sw/2)` for `i` in `(1 − chunks)..chunks`; each
/// cut emits the piece on its low-X side.
pub fn subdivide_row(
    row: &TriangleMesh,
    model: &Aabb3,
    robot: &RobotParameters,
    pieces: Option<usize>,
) -> Vec<ChunkGeometry> {
    let frame = RowFrame::new(row, model);
    if pieces == Some(2) {
        return vec![ChunkGeometry::from_mesh(row.clone(), frame.anchor(model.center().x))];
    }

    let run = robot.slope_run();
    let sw = frame.height * run;
    let width = model.size().x;
    let chunks = match pieces {
        Some(p) => (p / 2).max(1),
        None => ((width / 2.0) / (robot.width + sw / 2.0)).ceil().max(1.0) as usize,
    };
    let pw = match pieces {
        Some(p) => robot.width.max(width / p as f64),
        None => robot.width.max(width / (2 * chunks) as f64),
    };
    let xc = model.center().x;
    let pitch = pw + sw / 2.0;
    let east = Vec3::new(1.0, 0.0, run);
    let west = Vec3::new(-1.0, 0.0, run);

    let mut out = Vec::new();
    let mut remaining = row.clone();
    let mut facing_east = true;
    let first = 1 - chunks as i64;
    for i in first..chunks as i64 {
        let x = xc + i as f64 * pitch;
        let co = Point3::new(x, frame.mid_y, frame.z0);
        if facing_east {
            let (low, high) = split(&remaining, &Plane::from_point_normal(&co, &east)).into_pair();
            out.push(ChunkGeometry::from_mesh(low, frame.anchor(x + sw / 2.0)));
            remaining = high;
        } else {
            let (high, low) = split(&remaining, &Plane::from_point_normal(&co, &west)).into_pair();
            out.push(ChunkGeometry::from_mesh(low, frame.anchor(x - sw / 2.0 - pw)));
            remaining = high;
        }
        facing_east = !facing_east;
    }
    out.push(ChunkGeometry::from_mesh(
        remaining,
        frame.anchor(xc + chunks as f64 * pitch),
    ));
    out
}

/// Fixed-width columns from the row's min X.
///
/// Pieces are `min(max_reach_x, rest)` wide; cuts sit at `x_min + i·piece`
/// for `i` in `1..chunks`. West-facing walls are also raked in Y by
/// `slope_y_dir`.
pub fn stepped_columns(
    row: &TriangleMesh,
    model: &Aabb3,
    robot: &RobotParameters,
    config: &ChunkingConfig,
    pieces: Option<usize>,
) -> Vec<ChunkGeometry> {
    let frame = RowFrame::new(row, model);
    if pieces == Some(2) {
        return vec![ChunkGeometry::from_mesh(row.clone(), frame.anchor(frame.x_min))];
    }

    let run = robot.slope_run();
    let sw = frame.height * run;
    let width = model.size().x;
    let piece = config.max_reach_x.min(config.rest);
    let chunks = match pieces {
        Some(p) => (p / 2).max(1),
        None => (width / config.rest).ceil().max(1.0) as usize,
    };
    let east = Vec3::new(1.0, 0.0, run);
    let west = Vec3::new(-1.0, config.slope_y_dir.tan(), run);

    let mut out = Vec::new();
    let mut remaining = row.clone();
    let mut facing_east = true;
    for i in 1..chunks {
        let x = frame.x_min + i as f64 * piece;
        let co = Point3::new(x, frame.mid_y, frame.z0);
        if facing_east {
            let (low, high) = split(&remaining, &Plane::from_point_normal(&co, &east)).into_pair();
            out.push(ChunkGeometry::from_mesh(low, frame.anchor(x)));
            remaining = high;
        } else {
            let (high, low) = split(&remaining, &Plane::from_point_normal(&co, &west)).into_pair();
            out.push(ChunkGeometry::from_mesh(low, frame.anchor(x - sw)));
            remaining = high;
        }
        facing_east = !facing_east;
    }
    out.push(ChunkGeometry::from_mesh(
        remaining,
        frame.anchor(frame.x_min + chunks as f64 * piece),
    ));
    out
}

/// Where placeholders of a row go.
struct RowFrame {
    x_min: f64,
    mid_y: f64,
    z0: f64,
    height: f64,
}

impl RowFrame {
    /// Row bounds, or the model's when the row is empty.
    fn new(row: &TriangleMesh, model: &Aabb3) -> Self {
        let b = if row.is_empty() { *model } else { row.bounds() };
        Self {
            x_min: b.min.x,
            mid_y: 0.5 * (b.min.y + b.max.y),
            z0: b.min.z,
            height: b.max.z - b.min.z,
        }
    }

    fn anchor(&self, x: f64) -> Point3 {
        Point3::new(x, self.mid_y, self.z0)
    }
}
