//! Numbering, robot assignment and dependencies for row/column chunking.

use cobuild_kernel_math::{Point3, Vec3};
use cobuild_kernel_mesh::{split, MeshError, Plane, TriangleMesh};

use crate::chunk::{Chunk, ChunkGeometry};
use crate::columns::make_columns;
use crate::config::{ChunkingConfig, RowStrategy};
use crate::error::{ChunkerError, Result};
use crate::plan::ChunkPlan;
use crate::robot::{Robot, RobotParameters};
use crate::rows::{make_rows, make_rows_with};

/// Chunk colors in issue order.
///
/// A two-color palette alternates per chunk and swaps at the start of every
/// row after the origin; longer palettes color whole rows.
struct ColorCursor {
    palette: Vec<[u8; 3]>,
    row: i32,
    flips: usize,
}

impl ColorCursor {
    fn new(palette: &[[u8; 3]]) -> Self {
        Self {
            palette: palette.to_vec(),
            row: 0,
            flips: 0,
        }
    }

    fn start_row(&mut self, row: i32) {
        self.row = row;
        if self.palette.len() == 2 && row != 0 {
            self.flips += 1;
        }
    }

    fn next(&mut self) -> [u8; 3] {
        match self.palette.len() {
            0 => [255, 255, 255],
            2 => {
                let c = self.palette[self.flips % 2];
                self.flips += 1;
                c
            }
            n => self.palette[(-self.row).rem_euclid(n as i32) as usize],
        }
    }
}

/// Accumulates chunks into robot queues while numbering them globally.
pub(crate) struct PlanBuilder<'a> {
    pub(crate) robot: &'a RobotParameters,
    pub(crate) config: &'a ChunkingConfig,
    pub(crate) robots: Vec<Robot>,
    next: usize,
    colors: ColorCursor,
    layer: usize,
    below: Vec<usize>,
    current: Vec<usize>,
}

impl<'a> PlanBuilder<'a> {
    pub(crate) fn new(robot: &'a RobotParameters, config: &'a ChunkingConfig, count: usize) -> Self {
        Self {
            robot,
            config,
            robots: Robot::fleet(robot, count),
            next: 0,
            colors: ColorCursor::new(&config.palette),
            layer: 0,
            below: Vec::new(),
            current: Vec::new(),
        }
    }

    /// Start vertical layer `layer`; its chunks depend on everything issued
    /// for the previous layer.
    pub(crate) fn begin_layer(&mut self, layer: usize) {
        if layer > 0 && !self.current.is_empty() {
            self.below = std::mem::take(&mut self.current);
        }
        self.layer = layer;
    }

    fn robot_count(&self) -> usize {
        self.robots.len()
    }

    /// Issue one row of chunks and return their numbers.
    ///
    /// Every chunk depends on `previous`; odd columns also depend on both
    /// neighbours.
    fn emit_row(
        &mut self,
        pieces: Vec<ChunkGeometry>,
        row: i32,
        previous: &[usize],
        robot_of: impl Fn(usize, usize) -> usize,
    ) -> Vec<usize> {
        self.colors.start_row(row);
        let n = pieces.len();
        let base = self.next;
        let mut numbers = Vec::with_capacity(n);
        for (i, geometry) in pieces.into_iter().enumerate() {
            let number = base + i;
            let mut chunk = Chunk::new(number, geometry);
            chunk.row = row;
            chunk.layer = self.layer;
            chunk.robot = robot_of(i, n) % self.robots.len();
            chunk.color = self.colors.next();
            chunk.add_dependencies(previous.iter().copied());
            chunk.add_dependencies(self.below.iter().copied());
            if i % 2 == 1 {
                chunk.add_dependency(number - 1);
                if i + 1 < n {
                    chunk.add_dependency(number + 1);
                }
            }
            tracing::trace!(chunk = number, robot = chunk.robot, row, empty = chunk.is_empty(), "issued chunk");
            self.robots[chunk.robot].chunks.push(chunk);
            numbers.push(number);
        }
        self.next += n;
        self.current.extend_from_slice(&numbers);
        numbers
    }

    /// Order queues, validate and wrap up.
    pub(crate) fn finish(self, layer_tops: Vec<f64>) -> Result<ChunkPlan> {
        let mut plan = ChunkPlan {
            robots: self.robots,
            layer_tops,
        };
        plan.order_queues()?;
        plan.validate()?;
        tracing::info!(
            chunks = plan.chunk_count(),
            robots = plan.robots.len(),
            layers = plan.layer_count(),
            empty = plan.empty_chunks().len(),
            "chunk plan ready"
        );
        Ok(plan)
    }
}

/// Chunk `model` for `robots` robots: rows by `config.rows`, each row cut
/// into columns.
///
/// The origin row is numbered first, then the south rows outward, then the
/// north rows. With two robots the origin row is split between them down
/// the middle; otherwise columns go round-robin.
#[tracing::instrument(skip(model, robot, config))]
pub fn start_scaled(
    model: &TriangleMesh,
    robot: &RobotParameters,
    config: &ChunkingConfig,
    robots: usize,
) -> Result<ChunkPlan> {
    config.validate_for(robot, robots)?;
    ensure_solid(model)?;
    let mut builder = PlanBuilder::new(robot, config, robots);
    scaled_into(&mut builder, model)?;
    builder.finish(vec![model.bounds().max.z])
}

/// Chunk `model` for one robot: a single plane swept from max Y to min Y,
/// each chunk depending on the one before.
#[tracing::instrument(skip_all)]
pub fn start_single(
    model: &TriangleMesh,
    robot: &RobotParameters,
    config: &ChunkingConfig,
) -> Result<ChunkPlan> {
    config.validate_for(robot, 1)?;
    ensure_solid(model)?;
    let mut builder = PlanBuilder::new(robot, config, 1);
    single_into(&mut builder, model)?;
    builder.finish(vec![model.bounds().max.z])
}

/// Chunk `model` with the origin band at the max-Y end.
///
/// Column `i` of every row goes to robot `i mod robots`; the origin row is
/// split into one piece per robot.
#[tracing::instrument(skip(model, robot, config))]
pub fn start_scaled_one_sided(
    model: &TriangleMesh,
    robot: &RobotParameters,
    config: &ChunkingConfig,
    robots: usize,
) -> Result<ChunkPlan> {
    config.validate_for(robot, robots)?;
    ensure_solid(model)?;
    let mut builder = PlanBuilder::new(robot, config, robots);
    if robots == 1 {
        single_into(&mut builder, model)?;
    } else {
        one_sided_into(&mut builder, model)?;
    }
    builder.finish(vec![model.bounds().max.z])
}

pub(crate) fn ensure_solid(model: &TriangleMesh) -> Result<()> {
    if model.is_empty() {
        return Err(ChunkerError::Mesh(MeshError::EmptyMesh));
    }
    Ok(())
}

pub(crate) fn scaled_into(b: &mut PlanBuilder<'_>, model: &TriangleMesh) -> Result<()> {
    let count = b.robot_count();
    if count == 1 {
        return single_into(b, model);
    }
    let rows = make_rows(model, b.robot, b.config)?;
    let bounds = model.bounds();
    let pieces = b.config.column_pieces;

    let origin_pieces = make_columns(&rows.origin, &bounds, b.robot, b.config, pieces);
    let origin = b.emit_row(origin_pieces, 0, &[], |i, n| {
        if count == 2 {
            usize::from(i >= n.div_ceil(2))
        } else {
            i
        }
    });

    let mut previous = origin.clone();
    for (k, row) in rows.south.iter().enumerate() {
        let cols = make_columns(row, &bounds, b.robot, b.config, pieces);
        previous = b.emit_row(cols, -(k as i32 + 1), &previous, |i, _| i - i % 2 + 1);
    }
    let mut previous = origin;
    for (k, row) in rows.north.iter().enumerate() {
        let cols = make_columns(row, &bounds, b.robot, b.config, pieces);
        previous = b.emit_row(cols, k as i32 + 1, &previous, |i, _| i - i % 2);
    }
    Ok(())
}

fn one_sided_into(b: &mut PlanBuilder<'_>, model: &TriangleMesh) -> Result<()> {
    let count = b.robot_count();
    let rows = make_rows_with(model, b.robot, b.config, RowStrategy::OneSided)?;
    let bounds = model.bounds();

    let origin_pieces = make_columns(&rows.origin, &bounds, b.robot, b.config, Some(count));
    let mut previous = b.emit_row(origin_pieces, 0, &[], |i, _| i);
    for (k, row) in rows.south.iter().enumerate() {
        let cols = make_columns(row, &bounds, b.robot, b.config, b.config.column_pieces);
        previous = b.emit_row(cols, -(k as i32 + 1), &previous, |i, _| i);
    }
    Ok(())
}

pub(crate) fn single_into(b: &mut PlanBuilder<'_>, model: &TriangleMesh) -> Result<()> {
    let bounds = model.bounds();
    let run = b.robot.slope_run();
    let sw = bounds.height() * run;
    let step = b.robot.build_depth - sw;
    if step <= 0.0 {
        return Err(ChunkerError::InvalidConfig(format!(
            "model height {:.3} leaves no printable depth (slope width {sw:.3} ≥ build depth {})",
            bounds.height(),
            b.robot.build_depth
        )));
    }

    let normal = Vec3::new(0.0, -1.0, run);
    let xc = bounds.center().x;
    let mut y = bounds.max.y - b.robot.build_depth;
    let mut remaining = model.clone();
    let mut pieces = Vec::new();
    while y > bounds.min.y - sw {
        let plane = Plane::from_point_normal(&Point3::new(0.0, y, bounds.min.z), &normal);
        let (piece, rest) = split(&remaining, &plane).into_pair();
        pieces.push(ChunkGeometry::from_mesh(piece, Point3::new(xc, y, bounds.min.z)));
        remaining = rest;
        y -= step;
    }
    if !remaining.is_empty() || pieces.is_empty() {
        pieces.push(ChunkGeometry::from_mesh(
            remaining,
            Point3::new(xc, bounds.min.y, bounds.min.z),
        ));
    }

    let mut previous: Vec<usize> = Vec::new();
    for (k, piece) in pieces.into_iter().enumerate() {
        previous = b.emit_row(vec![piece], -(k as i32), &previous, |_, _| 0);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cobuild_kernel_mesh::shapes::cuboid;

    fn robot() -> RobotParameters {
        RobotParameters {
            printhead_slope: 1.5,
            build_depth: 100.0,
            printhead_depth: 20.0,
            width: 40.0,
            ..Default::default()
        }
    }

    fn symmetric() -> ChunkingConfig {
        ChunkingConfig {
            rows: RowStrategy::Symmetric,
            ..ChunkingConfig::xy_reference()
        }
    }

    #[test]
    fn test_two_color_cursor_alternates_and_swaps_per_row() {
        let mut c = ColorCursor::new(&[[0, 0, 255], [255, 0, 0]]);
        c.start_row(0);
        assert_eq!(c.next(), [0, 0, 255]);
        assert_eq!(c.next(), [255, 0, 0]);
        c.start_row(-1);
        assert_eq!(c.next(), [255, 0, 0]);
    }

    #[test]
    fn test_three_color_cursor_colors_rows() {
        let palette = [[1, 0, 0], [2, 0, 0], [3, 0, 0]];
        let mut c = ColorCursor::new(&palette);
        c.start_row(0);
        assert_eq!(c.next(), [1, 0, 0]);
        c.start_row(-1);
        assert_eq!(c.next(), [2, 0, 0]);
        assert_eq!(c.next(), [2, 0, 0]);
        c.start_row(1);
        assert_eq!(c.next(), [3, 0, 0]);
    }

    #[test]
    fn test_single_robot_chain() {
        let model = cuboid(Point3::new(-10.0, -120.0, 0.0), Point3::new(10.0, 120.0, 5.0));
        let plan = start_single(&model, &robot(), &symmetric()).unwrap();
        let chunks: Vec<&Chunk> = plan.chunks().collect();
        assert!(chunks.len() >= 3);
        for (k, c) in chunks.iter().enumerate() {
            assert_eq!(c.number, k);
            if k > 0 {
                assert_eq!(c.dependencies, vec![k - 1]);
            } else {
                assert!(c.dependencies.is_empty());
            }
        }
    }

    #[test]
    fn test_single_chunk_when_model_fits() {
        let model = cuboid(Point3::new(-10.0, -10.0, 0.0), Point3::new(10.0, 10.0, 5.0));
        let r = RobotParameters {
            printhead_slope: crate::robot::MAX_PRINTHEAD_SLOPE,
            ..robot()
        };
        let plan = start_single(&model, &r, &symmetric()).unwrap();
        assert_eq!(plan.chunk_count(), 1);
        assert!(!plan.robots[0].chunks[0].is_empty());
    }

    #[test]
    fn test_scaled_two_robots_split_origin_row() {
        let model = cuboid(Point3::new(-100.0, -40.0, 0.0), Point3::new(100.0, 40.0, 5.0));
        let plan = start_scaled(&model, &robot(), &symmetric(), 2).unwrap();
        let origin: Vec<&Chunk> = plan.chunks().filter(|c| c.row == 0).collect();
        let n = origin.len();
        assert!(n >= 2);
        for c in &origin {
            let expected = usize::from(c.number >= n.div_ceil(2));
            assert_eq!(c.robot, expected, "chunk {}", c.number);
        }
        assert!(plan.validate().is_ok());
    }

    #[test]
    fn test_empty_model_is_rejected() {
        let err = start_scaled(&TriangleMesh::new(), &robot(), &symmetric(), 2).unwrap_err();
        assert!(matches!(err, ChunkerError::Mesh(MeshError::EmptyMesh)));
    }
}
