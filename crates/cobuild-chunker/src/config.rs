//! Chunking presets.

use cobuild_interface::LayerSettings;
use serde::{Deserialize, Serialize};

use crate::error::{ChunkerError, Result};
use crate::robot::RobotParameters;

/// How the model is cut into rows along Y.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowStrategy {
    /// Origin row centred on the model, rows stepping outward by the
    /// reachable depth.
    Symmetric,
    /// Rows sized to fixed build plates.
    Buildplate,
    /// Origin row at the max-Y end, rows stepping toward −Y.
    OneSided,
}

/// How a row is cut into columns along X.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnStrategy {
    /// Centred columns with alternating east/west slopes.
    Alternating,
    /// Fixed-width columns from the row's min X, west faces raked in Y.
    Stepped,
}

/// Build plate dimensions used by [`RowStrategy::Buildplate`] and
/// [`RowStrategy::OneSided`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildPlate {
    /// Plate size along Y (mm).
    pub plate: f64,
    /// Reach past the plate edge into the neighbouring plate (mm).
    pub adjacent_reach: f64,
    /// Narrowest top of the centre chunk (mm).
    pub min_top: f64,
    /// Horizontal run of a sloped chunk wall (mm).
    pub wing_slope: f64,
}

impl Default for BuildPlate {
    fn default() -> Self {
        Self {
            plate: 300.0,
            adjacent_reach: 25.0,
            min_top: 50.0,
            wing_slope: 50.0,
        }
    }
}

impl BuildPlate {
    /// Half-width of the centre chunk: `2·wing + min_top`.
    pub fn center(&self) -> f64 {
        2.0 * self.wing_slope + self.min_top
    }

    /// Width of the first row outside the centre chunk.
    pub fn noncenter(&self) -> f64 {
        0.5 * (self.plate + 2.0 * self.adjacent_reach - (self.center() + 2.0 * self.wing_slope))
    }
}

/// Everything that shapes a chunk plan apart from the robots themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Preset name.
    pub name: String,
    /// Row strategy.
    pub rows: RowStrategy,
    /// Column strategy.
    pub columns: ColumnStrategy,
    /// Chunk colors. Two colors alternate per chunk, three or more per row.
    pub palette: Vec<[u8; 3]>,
    /// Rake of stepped west faces in the Y direction (radians).
    pub slope_y_dir: f64,
    /// Build plate dimensions.
    pub build_plate: BuildPlate,
    /// Depth of the one-sided origin band (mm).
    pub origin_width: f64,
    /// Farthest a robot reaches along X (mm).
    pub max_reach_x: f64,
    /// Stepped column width (mm).
    pub rest: f64,
    /// Widest robot the planner accepts (mm).
    pub max_width: f64,
    /// Explicit pieces per row; automatic when absent.
    pub column_pieces: Option<usize>,
    /// Vertical layering.
    pub layers: LayerSettings,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self::xy_reference()
    }
}

impl ChunkingConfig {
    /// Row/column chunking on build plates.
    pub fn xy_reference() -> Self {
        Self {
            name: "XY reference".into(),
            rows: RowStrategy::Buildplate,
            columns: ColumnStrategy::Alternating,
            palette: vec![[255, 10, 27], [0, 30, 83], [255, 255, 255]],
            slope_y_dir: 145f64.to_radians(),
            build_plate: BuildPlate::default(),
            origin_width: 300.0,
            max_reach_x: 425.0,
            rest: 300.0,
            max_width: 350.0,
            column_pieces: None,
            layers: LayerSettings::default(),
        }
    }

    /// Symmetric rows and stepped columns, used with vertical layering.
    pub fn z_reference() -> Self {
        Self {
            name: "Z reference".into(),
            rows: RowStrategy::Symmetric,
            columns: ColumnStrategy::Stepped,
            palette: vec![[0, 0, 255], [255, 0, 0]],
            slope_y_dir: 160f64.to_radians(),
            ..Self::xy_reference()
        }
    }

    /// Built-in presets.
    pub fn all_presets() -> Vec<Self> {
        vec![Self::xy_reference(), Self::z_reference()]
    }

    /// Check the preset on its own.
    pub fn validate(&self) -> Result<()> {
        if self.palette.is_empty() {
            return Err(ChunkerError::InvalidConfig("palette must not be empty".into()));
        }
        let positive = [
            ("origin_width", self.origin_width),
            ("max_reach_x", self.max_reach_x),
            ("rest", self.rest),
            ("max_width", self.max_width),
            ("build_plate.plate", self.build_plate.plate),
            ("layers.max_reach_z", self.layers.max_reach_z),
        ];
        for (name, value) in positive {
            if !(value > 0.0) {
                return Err(ChunkerError::InvalidConfig(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        if self.build_plate.noncenter() <= 0.0 {
            return Err(ChunkerError::InvalidConfig(
                "build plate leaves no room outside the centre chunk".into(),
            ));
        }
        if self.column_pieces == Some(0) {
            return Err(ChunkerError::InvalidConfig(
                "column_pieces must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Check the preset together with the robots that will use it.
    pub fn validate_for(&self, robot: &RobotParameters, robots: usize) -> Result<()> {
        self.validate()?;
        robot.validate()?;
        if robot.width > self.max_width {
            return Err(ChunkerError::InvalidConfig(
                "The maximum width of the chunk is larger than the reach of the printing robot"
                    .into(),
            ));
        }
        if robots == 0 {
            return Err(ChunkerError::InvalidConfig(
                "at least one robot is required".into(),
            ));
        }
        Ok(())
    }
}
