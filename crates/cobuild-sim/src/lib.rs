#![warn(missing_docs)]

//! Simulation of cooperating print robots.
//!
//! Sliced chunks become robot programs ([`generate_commands`]), programs are
//! cut into fixed-duration frames ([`generate_frames`]), and the
//! [`Scheduler`] runs every robot's queue in lock step, holding a robot back
//! until the chunks it depends on are finished. The result can be written
//! as a replayable JSON [`Simulation`].
//!
//! # Example
//!
//! ```ignore
//! use cobuild_sim::{simulate, SimSettings, Simulation};
//!
//! let trace = simulate(&mut plan.robots, &SimSettings::default())?;
//! Simulation::from_trace(&trace).save("simulation.json", false)?;
//! ```

pub mod commands;
mod error;
pub mod estimate;
pub mod export;
pub mod frames;
pub mod scheduler;

pub use commands::generate_commands;
pub use error::{Result, SimError};
pub use estimate::{estimate_execution_time, ExecutionEstimate};
pub use export::{
    simulation_file_name, write_error_log, write_side_files, Simulation, SimulationFrame,
    SimulationInit, SimulationMachine,
};
pub use frames::generate_frames;
pub use scheduler::{MachineSnapshot, RobotState, Scheduler, SimulationTrace, TraceFrame};

use cobuild_chunker::Robot;
use serde::{Deserialize, Serialize};

/// Simulation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimSettings {
    /// Scale applied to every move target.
    pub model_scale: f64,
    /// Frames per second of simulated time.
    pub frames_per_second: f64,
    /// How far the tool lifts when travelling between chunks (mm).
    pub travel_lift: f64,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            model_scale: 1.0,
            frames_per_second: 4.0,
            travel_lift: 0.05,
        }
    }
}

impl SimSettings {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if !(self.model_scale > 0.0) {
            return Err(SimError::InvalidSettings(
                "model_scale must be positive".into(),
            ));
        }
        if !(self.frames_per_second > 0.0) {
            return Err(SimError::InvalidSettings(
                "frames_per_second must be positive".into(),
            ));
        }
        if self.travel_lift < 0.0 {
            return Err(SimError::InvalidSettings(
                "travel_lift must not be negative".into(),
            ));
        }
        Ok(())
    }
}

/// Generate commands and frames for every robot.
pub fn prepare_robots(robots: &mut [Robot], settings: &SimSettings) -> Result<usize> {
    settings.validate()?;
    let mut frames = 0;
    for robot in robots.iter_mut() {
        let commands = generate_commands(robot, settings);
        let robot_frames = generate_frames(robot, settings)?;
        tracing::debug!(
            robot = robot.number(),
            commands,
            frames = robot_frames,
            "prepared robot"
        );
        frames += robot_frames;
    }
    Ok(frames)
}

/// Prepare and schedule `robots`.
///
/// Chunks must already be sliced. The critical-path estimate is logged
/// before scheduling starts.
#[tracing::instrument(skip_all, fields(robots = robots.len()))]
pub fn simulate(robots: &mut [Robot], settings: &SimSettings) -> Result<SimulationTrace> {
    prepare_robots(robots, settings)?;
    let estimate = estimate_execution_time(robots)?;
    tracing::info!(
        frames = estimate.frames,
        critical_chunk = ?estimate.critical_chunk,
        "estimated execution time"
    );
    Scheduler::run(robots)
}
