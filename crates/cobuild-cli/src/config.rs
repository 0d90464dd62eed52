//! Pipeline configuration loaded from TOML.
//!
//! Every section is optional; missing sections and fields take their
//! defaults.
//!
//! ```toml
//! [chunking]
//! rows = "symmetric"
//! columns = "stepped"
//!
//! [robot]
//! printhead_slope = 1.2217
//! speed = 20.0
//!
//! [slice]
//! slice_thickness = 0.4
//!
//! [sim]
//! frames_per_second = 8.0
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use cobuild_chunker::{ChunkMode, ChunkingConfig, RobotParameters};
use cobuild_interface::AgParameters;
use cobuild_sim::SimSettings;
use cobuild_slicer::SliceSettings;
use serde::{Deserialize, Serialize};

/// Built-in chunking presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    /// Build-plate rows with alternating columns.
    Xy,
    /// Symmetric rows with stepped columns.
    Z,
}

impl Preset {
    /// The chunking configuration for this preset.
    pub fn config(self) -> ChunkingConfig {
        match self {
            Preset::Xy => ChunkingConfig::xy_reference(),
            Preset::Z => ChunkingConfig::z_reference(),
        }
    }

    /// Preset used when none is given for `mode`.
    pub fn for_mode(mode: ChunkMode) -> Self {
        match mode {
            ChunkMode::Layers => Preset::Z,
            ChunkMode::Scaled | ChunkMode::OneSided => Preset::Xy,
        }
    }
}

/// All settings of a chunk → slice → simulate run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Chunking strategy and geometry.
    pub chunking: ChunkingConfig,
    /// Robot template; every robot of the fleet is a numbered copy.
    pub robot: RobotParameters,
    /// Slicing.
    pub slice: SliceSettings,
    /// Frame generation.
    pub sim: SimSettings,
    /// Alignment features at vertical layer interfaces.
    pub ag: AgParameters,
}

impl PipelineConfig {
    /// Parse TOML.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse pipeline configuration")
    }

    /// Read a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("in {}", path.display()))
    }

    /// Configuration for a run: the file if one is given, otherwise the
    /// defaults, with `preset` (or the mode's usual preset when there is no
    /// file) replacing the chunking section.
    pub fn resolve(path: Option<&Path>, preset: Option<Preset>, mode: ChunkMode) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        let preset = match (path, preset) {
            (_, Some(p)) => Some(p),
            (None, None) => Some(Preset::for_mode(mode)),
            (Some(_), None) => None,
        };
        if let Some(preset) = preset {
            config.chunking = preset.config();
        }
        Ok(config)
    }

    /// Check every section before any geometry work.
    pub fn validate(&self, robots: usize) -> Result<()> {
        self.chunking.validate_for(&self.robot, robots)?;
        self.slice.validate()?;
        self.sim.validate()?;
        self.ag.validate()?;
        Ok(())
    }

    /// Serialize to TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to encode pipeline configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_partial_toml() {
        let config = PipelineConfig::from_toml_str(
            r#"
            [robot]
            speed = 20.0

            [slice]
            slice_thickness = 0.4
            "#,
        )
        .unwrap();
        assert_relative_eq!(config.robot.speed, 20.0);
        assert_relative_eq!(config.robot.build_depth, 350.0);
        assert_relative_eq!(config.slice.slice_thickness, 0.4);
        assert_eq!(config.sim, SimSettings::default());
        assert!(config.validate(2).is_ok());
    }

    #[test]
    fn test_round_trip() {
        let config = PipelineConfig {
            chunking: ChunkingConfig::z_reference(),
            ..PipelineConfig::default()
        };
        let text = config.to_toml_string().unwrap();
        let back = PipelineConfig::from_toml_str(&text).unwrap();
        assert_eq!(back.chunking.name, "Z reference");
    }

    #[test]
    fn test_preset_follows_mode() {
        let config = PipelineConfig::resolve(None, None, ChunkMode::Layers).unwrap();
        assert_eq!(config.chunking, ChunkingConfig::z_reference());
        let config = PipelineConfig::resolve(None, Some(Preset::Xy), ChunkMode::Layers).unwrap();
        assert_eq!(config.chunking, ChunkingConfig::xy_reference());
    }

    #[test]
    fn test_validation_reports_first_problem() {
        let mut config = PipelineConfig::default();
        config.robot.printhead_slope = 10f64.to_radians();
        let err = config.validate(2).unwrap_err();
        assert!(err.to_string().contains("between 20 degrees and 90 degrees"));
    }
}
