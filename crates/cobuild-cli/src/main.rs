//! cobuild CLI - chunk, slice and simulate prints shared by several robots.
//!
//! # Logging
//!
//! Log output goes to stderr. The default level is `info`; `-v` raises it to
//! `debug` and `-vv` to `trace`. `RUST_LOG` overrides both, for example
//! `RUST_LOG=cobuild_chunker=debug cobuild chunk model.stl`.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use cobuild_chunker::ChunkMode;
use cobuild_cli::{
    model_info, run_chunk, run_layers, run_simulate, ChunkOptions, ModelOptions, PipelineConfig,
    Preset,
};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "cobuild")]
#[command(about = "Chunk, slice and simulate cooperative multi-robot prints", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Cut a model into chunks and write one STL per chunk plus the plan files
    Chunk(ChunkArgs),
    /// Chunk, slice and schedule a model, then write the simulation file
    Simulate {
        #[command(flatten)]
        chunk: ChunkArgs,
        /// Indent the simulation JSON
        #[arg(long)]
        pretty: bool,
    },
    /// Print the vertical layer plan of a model
    Layers {
        #[command(flatten)]
        model: ModelArgs,
        /// Chunking preset
        #[arg(long, value_enum)]
        preset: Option<PresetArg>,
        /// Pipeline configuration (TOML)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Display triangle count and bounds of a model
    Info {
        #[command(flatten)]
        model: ModelArgs,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct ModelArgs {
    /// Input STL file
    input: PathBuf,
    /// Centre the model on the origin in X and Y
    #[arg(long)]
    center: bool,
    /// Rotate the model a quarter turn about Z
    #[arg(long)]
    rotate: bool,
}

impl ModelArgs {
    fn options(&self) -> ModelOptions {
        ModelOptions {
            input: self.input.clone(),
            center: self.center,
            rotate: self.rotate,
        }
    }
}

#[derive(Args)]
struct ChunkArgs {
    #[command(flatten)]
    model: ModelArgs,
    /// Number of robots
    #[arg(short = 'n', long, default_value_t = 2)]
    robots: usize,
    /// Chunking mode
    #[arg(long, value_enum, default_value_t = ModeArg::Scaled)]
    mode: ModeArg,
    /// Chunking preset (default: xy, or z for layers)
    #[arg(long, value_enum)]
    preset: Option<PresetArg>,
    /// Pipeline configuration (TOML)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Output directory
    #[arg(short, long, default_value = "output")]
    output: PathBuf,
    /// Place exported chunks on the build plate
    #[arg(long)]
    align_on_plate: bool,
}

impl ChunkArgs {
    fn options(&self) -> Result<ChunkOptions> {
        let mode = self.mode.into();
        let config = PipelineConfig::resolve(
            self.config.as_deref(),
            self.preset.map(Into::into),
            mode,
        )?;
        Ok(ChunkOptions {
            model: self.model.options(),
            mode,
            robots: self.robots,
            output: self.output.clone(),
            align_on_plate: self.align_on_plate,
            config,
        })
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    /// Rows and columns
    Scaled,
    /// Origin band at the max-Y end
    OneSided,
    /// Horizontal layers, each chunked in rows and columns
    Layers,
}

impl From<ModeArg> for ChunkMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Scaled => ChunkMode::Scaled,
            ModeArg::OneSided => ChunkMode::OneSided,
            ModeArg::Layers => ChunkMode::Layers,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum PresetArg {
    /// Build-plate rows, alternating columns
    Xy,
    /// Symmetric rows, stepped columns
    Z,
}

impl From<PresetArg> for Preset {
    fn from(preset: PresetArg) -> Self {
        match preset {
            PresetArg::Xy => Preset::Xy,
            PresetArg::Z => Preset::Z,
        }
    }
}

fn init_tracing(verbose: u8) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        EnvFilter::new(level)
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Chunk(args) => {
            let outcome = run_chunk(&args.options()?)?;
            println!(
                "Wrote {} chunk(s) for {} robot(s) to {}",
                outcome.plan.chunk_count(),
                outcome.plan.robots.len(),
                args.output.display()
            );
            for (robot, queue) in outcome.plan.machine_chunks().iter().enumerate() {
                println!("  Robot {robot}: {queue:?}");
            }
        }
        Commands::Simulate { chunk, pretty } => {
            let (path, simulation) = run_simulate(&chunk.options()?, pretty)?;
            println!(
                "Simulated {} frame(s) for {} robot(s): {}",
                simulation.frame_count(),
                simulation.robot_count(),
                path.display()
            );
        }
        Commands::Layers {
            model,
            preset,
            config,
        } => {
            let config =
                PipelineConfig::resolve(config.as_deref(), preset.map(Into::into), ChunkMode::Layers)?;
            let plan = run_layers(&model.options(), &config)?;
            println!("Layers: {}", plan.layer_count());
            for (i, cut) in plan.cuts.iter().enumerate() {
                println!("  Cut {i}: {cut:.3} mm above the bottom");
            }
            println!(
                "  Islands: {}, without alignment: {}, deviation: {:.3}",
                plan.score.chunk_islands, plan.score.islands_without_ag, plan.score.deviation
            );
        }
        Commands::Info { model, json } => {
            let info = model_info(&model.options())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                println!("Model: {}", info.path);
                println!("  Triangles: {}", info.triangles);
                println!(
                    "  Bounds: [{:.3}, {:.3}, {:.3}] .. [{:.3}, {:.3}, {:.3}]",
                    info.min[0], info.min[1], info.min[2], info.max[0], info.max[1], info.max[2]
                );
                println!(
                    "  Size: {:.3} x {:.3} x {:.3}",
                    info.dimensions[0], info.dimensions[1], info.dimensions[2]
                );
                println!("  Volume: {:.3}", info.volume);
                println!("  Surface area: {:.3}", info.surface_area);
            }
        }
    }

    Ok(())
}
