//! JSON output: the simulation file and the plan side files.
//!
//! A simulation file looks like
//!
//! ```json
//! {"init":{"machines":[{"n":0,"v":[0.0,0.0,0.0],"r":0.0}]},
//!  "frames":[{"machines":[...],"printeds":[[[0.0,0.0,0.5],[2.5,0.0,0.5]]]}]}
//! ```
//!
//! with every coordinate rounded to 6 decimals.

use std::fs;
use std::path::{Path, PathBuf};

use cobuild_chunker::{ChunkPlan, Material};
use cobuild_kernel_math::{round_to, Point3};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::scheduler::{MachineSnapshot, SimulationTrace};

/// Decimal places kept in exported coordinates.
pub const EXPORT_PLACES: u32 = 6;

/// `[x, y, z]` rounded for export.
pub fn describe_point(p: &Point3) -> [f64; 3] {
    [
        round_to(p.x, EXPORT_PLACES),
        round_to(p.y, EXPORT_PLACES),
        round_to(p.z, EXPORT_PLACES),
    ]
}

/// One robot in a simulation file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationMachine {
    /// Robot id.
    pub n: usize,
    /// Tool location.
    pub v: [f64; 3],
    /// Heading about Z (radians).
    pub r: f64,
}

impl From<&MachineSnapshot> for SimulationMachine {
    fn from(m: &MachineSnapshot) -> Self {
        Self {
            n: m.number,
            v: describe_point(&m.location),
            r: round_to(m.rotation, EXPORT_PLACES),
        }
    }
}

/// Initial robot placement.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SimulationInit {
    /// Robots sorted by id.
    pub machines: Vec<SimulationMachine>,
}

/// Robots and printed material for one tick.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SimulationFrame {
    /// Robot positions after the tick.
    pub machines: Vec<SimulationMachine>,
    /// Polylines printed during the tick.
    pub printeds: Vec<Vec<[f64; 3]>>,
}

/// A replayable simulation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Simulation {
    /// Start state.
    pub init: SimulationInit,
    /// One entry per tick.
    pub frames: Vec<SimulationFrame>,
}

fn machines(snapshots: &[MachineSnapshot]) -> Vec<SimulationMachine> {
    let mut out: Vec<SimulationMachine> = snapshots.iter().map(SimulationMachine::from).collect();
    out.sort_by_key(|m| m.n);
    out
}

fn printed(material: &Material) -> Vec<[f64; 3]> {
    material.points.iter().map(describe_point).collect()
}

impl Simulation {
    /// Convert a scheduling trace.
    pub fn from_trace(trace: &SimulationTrace) -> Self {
        Self {
            init: SimulationInit {
                machines: machines(&trace.start),
            },
            frames: trace
                .frames
                .iter()
                .map(|f| SimulationFrame {
                    machines: machines(&f.machines),
                    printeds: f.materials.iter().map(printed).collect(),
                })
                .collect(),
        }
    }

    /// Number of robots.
    pub fn robot_count(&self) -> usize {
        self.init.machines.len()
    }

    /// Number of frames.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Encode as JSON.
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }

    /// Decode from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write to `path`.
    pub fn save(&self, path: impl AsRef<Path>, pretty: bool) -> Result<()> {
        fs::write(path, self.to_json(pretty)?)?;
        Ok(())
    }

    /// Read from `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }
}

/// `simulation_data_{unix_ts}.json`.
pub fn simulation_file_name(unix_ts: u64) -> String {
    format!("simulation_data_{unix_ts}.json")
}

fn write_json<T: Serialize + ?Sized>(dir: &Path, name: &str, value: &T) -> Result<PathBuf> {
    let path = dir.join(name);
    fs::write(&path, serde_json::to_string(value)?)?;
    Ok(path)
}

/// Write the plan summaries next to the chunk files.
///
/// Produces `machine_chunks.json`, `chunk_dependencies.json`,
/// `empty_chunks.json`, `vertical_layer_information.json` and
/// `alignment_features.json`. Returns the written paths.
pub fn write_side_files(dir: impl AsRef<Path>, plan: &ChunkPlan) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    let empty: std::collections::BTreeMap<usize, [f64; 3]> = plan
        .empty_chunks()
        .iter()
        .map(|(&n, p)| (n, describe_point(p)))
        .collect();
    let paths = vec![
        write_json(dir, "machine_chunks.json", &plan.machine_chunks())?,
        write_json(dir, "chunk_dependencies.json", &plan.dependencies())?,
        write_json(dir, "empty_chunks.json", &empty)?,
        write_json(
            dir,
            "vertical_layer_information.json",
            &plan.layer_information(),
        )?,
        write_json(dir, "alignment_features.json", &plan.alignment_features())?,
    ];
    tracing::debug!(dir = %dir.display(), files = paths.len(), "wrote side files");
    Ok(paths)
}

/// Record a configuration error as a JSON string in `dir/error_logs`.
pub fn write_error_log(dir: impl AsRef<Path>, message: &str) -> Result<PathBuf> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    write_json(dir, "error_logs", message)
}
