//! Robot parameters and the per-robot chunk queue.

use cobuild_kernel_math::Point3;
use serde::{Deserialize, Serialize};

use crate::chunk::Chunk;
use crate::error::{ChunkerError, Result};

/// Shallowest printhead slope a robot may have (20°).
pub const MIN_PRINTHEAD_SLOPE: f64 = 0.34906555;
/// Steepest printhead slope a robot may have (90°).
pub const MAX_PRINTHEAD_SLOPE: f64 = 1.570795;

/// Physical description of one robot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotParameters {
    /// Farthest the robot prints away from itself (mm).
    pub build_depth: f64,
    /// Printhead nozzle slope (radians).
    pub printhead_slope: f64,
    /// Printhead length past the nozzle (mm).
    pub printhead_depth: f64,
    /// Robot width (mm).
    pub width: f64,
    /// Robot id.
    pub number: usize,
    /// Travel speed (mm/s).
    pub speed: f64,
    /// Start location.
    pub home: Point3,
    /// Heading about Z (radians).
    pub rotation: f64,
}

impl Default for RobotParameters {
    fn default() -> Self {
        Self {
            build_depth: 350.0,
            printhead_slope: 70f64.to_radians(),
            printhead_depth: 350.0,
            width: 350.0,
            number: 0,
            speed: 10.0,
            home: Point3::origin(),
            rotation: 0.0,
        }
    }
}

impl RobotParameters {
    /// Check the parameters against the robot's physical limits.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_PRINTHEAD_SLOPE..=MAX_PRINTHEAD_SLOPE).contains(&self.printhead_slope) {
            return Err(ChunkerError::InvalidConfig(
                "The value of slope is not between 20 degrees and 90 degrees".into(),
            ));
        }
        if !(self.build_depth > 0.0) {
            return Err(ChunkerError::InvalidConfig(format!(
                "build_depth must be positive, got {}",
                self.build_depth
            )));
        }
        if !(self.width > 0.0) {
            return Err(ChunkerError::InvalidConfig(format!(
                "width must be positive, got {}",
                self.width
            )));
        }
        if !(self.speed > 0.0) {
            return Err(ChunkerError::InvalidConfig(format!(
                "speed must be positive, got {}",
                self.speed
            )));
        }
        if self.printhead_depth < 0.0 {
            return Err(ChunkerError::InvalidConfig(
                "printhead_depth must not be negative".into(),
            ));
        }
        Ok(())
    }

    /// `tan(π/2 − slope)`, the horizontal run of a cut plane per unit height.
    pub fn slope_run(&self) -> f64 {
        (std::f64::consts::FRAC_PI_2 - self.printhead_slope).tan()
    }
}

/// A robot and the chunks it prints, in print order.
#[derive(Debug, Clone)]
pub struct Robot {
    /// Physical parameters.
    pub params: RobotParameters,
    /// Queue of chunks.
    pub chunks: Vec<Chunk>,
    /// Where the robot was last seen.
    pub last_location: Point3,
}

impl Robot {
    /// Idle robot at its home location.
    pub fn new(params: RobotParameters) -> Self {
        let last_location = params.home;
        Self {
            params,
            chunks: Vec::new(),
            last_location,
        }
    }

    /// `count` copies of `params` numbered `0..count`.
    pub fn fleet(params: &RobotParameters, count: usize) -> Vec<Robot> {
        (0..count)
            .map(|number| {
                Robot::new(RobotParameters {
                    number,
                    ..params.clone()
                })
            })
            .collect()
    }

    /// Robot id.
    pub fn number(&self) -> usize {
        self.params.number
    }

    /// Travel speed.
    pub fn speed(&self) -> f64 {
        self.params.speed
    }

    /// Start location.
    pub fn home(&self) -> Point3 {
        self.params.home
    }

    /// Chunk with `number`, if this robot owns it.
    pub fn chunk(&self, number: usize) -> Option<&Chunk> {
        self.chunks.iter().find(|c| c.number == number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_is_valid() {
        assert!(RobotParameters::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_shallow_slope() {
        let p = RobotParameters {
            printhead_slope: 10f64.to_radians(),
            ..Default::default()
        };
        let err = p.validate().unwrap_err();
        assert!(err.to_string().contains("20 degrees"));
    }

    #[test]
    fn test_slope_bounds_are_inclusive() {
        for slope in [MIN_PRINTHEAD_SLOPE, MAX_PRINTHEAD_SLOPE] {
            let p = RobotParameters {
                printhead_slope: slope,
                ..Default::default()
            };
            assert!(p.validate().is_ok());
        }
    }

    #[test]
    fn test_slope_run_at_45_degrees() {
        let p = RobotParameters {
            printhead_slope: std::f64::consts::FRAC_PI_4,
            ..Default::default()
        };
        assert_relative_eq!(p.slope_run(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_fleet_numbers_robots() {
        let fleet = Robot::fleet(&RobotParameters::default(), 3);
        let numbers: Vec<usize> = fleet.iter().map(Robot::number).collect();
        assert_eq!(numbers, vec![0, 1, 2]);
        assert!(fleet.iter().all(|r| r.chunks.is_empty()));
    }
}
