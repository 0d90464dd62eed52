//! Per-chunk print data: slices, the command stream and simulation frames.
//!
//! The chunker only creates empty containers for these; the slicer fills
//! [`Slice`]s and the simulator fills [`Command`]s and [`ChunkFrame`]s.

use cobuild_kernel_math::Point3;
use serde::{Deserialize, Serialize};

/// An ordered polyline followed by the tool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Path {
    /// Vertices in print order.
    pub points: Vec<Point3>,
}

impl Path {
    /// Path through `points`.
    pub fn new(points: Vec<Point3>) -> Self {
        Self { points }
    }

    /// Path holding one point.
    pub fn single(point: Point3) -> Self {
        Self {
            points: vec![point],
        }
    }

    /// Whether the path has no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Summed segment length.
    pub fn length(&self) -> f64 {
        self.points.windows(2).map(|w| (w[1] - w[0]).norm()).sum()
    }

    /// Shift every point by `dz`.
    pub fn offset_z(&mut self, dz: f64) {
        for p in &mut self.points {
            p.z += dz;
        }
    }
}

/// One horizontal layer of toolpaths.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Slice {
    /// Height of the slicing plane.
    pub z: f64,
    /// Paths in print order. In a filled ring the perimeter comes first.
    pub paths: Vec<Path>,
}

/// One step of a robot program.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Command {
    /// Straight move to `to` at `speed` (mm/s).
    Move {
        /// Target, already scaled.
        to: Point3,
        /// Feed rate.
        speed: f64,
    },
    /// Start extruding.
    ToolOn,
    /// Stop extruding.
    ToolOff,
    /// The next slice begins.
    NewLayer,
}

impl Command {
    /// Move to `to` scaled by `model_scale`.
    pub fn move_to(to: Point3, speed: f64, model_scale: f64) -> Self {
        Command::Move {
            to: Point3::from(to.coords * model_scale),
            speed,
        }
    }

    /// Seconds needed to execute the command starting at `from`.
    ///
    /// Only moves take time.
    pub fn duration(&self, from: &Point3) -> f64 {
        match self {
            Command::Move { to, speed } => (to - from).norm() / speed,
            _ => 0.0,
        }
    }
}

/// Material laid down during one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Polyline traced with the tool on.
    pub points: Vec<Point3>,
    /// Chunk color.
    pub color: [u8; 3],
}

/// Robot position at the end of a frame and what it printed during it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkFrame {
    /// Tool location.
    pub location: Point3,
    /// Materials completed in this frame.
    pub materials: Vec<Material>,
}

impl ChunkFrame {
    /// Frame with no material.
    pub fn at(location: Point3) -> Self {
        Self {
            location,
            materials: Vec::new(),
        }
    }

    /// Whether anything was printed in this frame.
    pub fn has_material(&self) -> bool {
        !self.materials.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_move_is_scaled_on_creation() {
        let cmd = Command::move_to(Point3::new(1.0, 2.0, 3.0), 10.0, 2.0);
        match cmd {
            Command::Move { to, speed } => {
                assert_relative_eq!(to.x, 2.0);
                assert_relative_eq!(to.z, 6.0);
                assert_relative_eq!(speed, 10.0);
            }
            other => panic!("expected a move, got {other:?}"),
        }
    }

    #[test]
    fn test_duration() {
        let cmd = Command::move_to(Point3::new(3.0, 4.0, 0.0), 5.0, 1.0);
        assert_relative_eq!(cmd.duration(&Point3::origin()), 1.0);
        assert_relative_eq!(Command::ToolOn.duration(&Point3::origin()), 0.0);
    }

    #[test]
    fn test_path_length_and_offset() {
        let mut p = Path::new(vec![
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(1.0, 0.0, 1.0),
            Point3::new(1.0, 1.0, 1.0),
        ]);
        assert_relative_eq!(p.length(), 2.0);
        p.offset_z(-1.0);
        assert!(p.points.iter().all(|q| q.z == 0.0));
    }
}
