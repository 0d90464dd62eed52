//! The steps behind each subcommand.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use cobuild_chunker::prepare::{align_on_build_plate, center_model, rotate_quarter_turn};
use cobuild_chunker::{chunk_model, plan_layers, BuildPlate, ChunkMode, ChunkPlan};
use cobuild_interface::LayerPlan;
use cobuild_kernel_mesh::stl::{read_stl, write_stl};
use cobuild_kernel_mesh::TriangleMesh;
use cobuild_sim::{simulation_file_name, write_error_log, write_side_files, Simulation};
use cobuild_slicer::slice_chunks;
use serde::Serialize;

use crate::config::PipelineConfig;

/// Where the model comes from and how it is placed.
#[derive(Debug, Clone, Default)]
pub struct ModelOptions {
    /// STL file.
    pub input: PathBuf,
    /// Centre the model on the origin in X and Y.
    pub center: bool,
    /// Rotate the model a quarter turn about Z.
    pub rotate: bool,
}

/// Inputs of `chunk` and `simulate`.
#[derive(Debug, Clone)]
pub struct ChunkOptions {
    /// Model.
    pub model: ModelOptions,
    /// Chunking mode.
    pub mode: ChunkMode,
    /// Fleet size.
    pub robots: usize,
    /// Output directory.
    pub output: PathBuf,
    /// Place exported chunks on the build plate.
    pub align_on_plate: bool,
    /// Settings.
    pub config: PipelineConfig,
}

/// Files written by [`run_chunk`].
#[derive(Debug, Clone)]
pub struct ChunkOutcome {
    /// The plan.
    pub plan: ChunkPlan,
    /// One STL per printable chunk.
    pub meshes: Vec<PathBuf>,
    /// Plan summaries.
    pub side_files: Vec<PathBuf>,
}

/// Summary of an STL file.
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    /// Source path.
    pub path: String,
    /// Triangle count.
    pub triangles: usize,
    /// Minimum corner.
    pub min: [f64; 3],
    /// Maximum corner.
    pub max: [f64; 3],
    /// Extent along each axis.
    pub dimensions: [f64; 3],
    /// Enclosed volume.
    pub volume: f64,
    /// Surface area.
    pub surface_area: f64,
}

/// Read and place the model.
pub fn load_model(opts: &ModelOptions) -> Result<TriangleMesh> {
    let mut mesh = read_stl(&opts.input)
        .with_context(|| format!("Failed to load mesh from {}", opts.input.display()))?;
    if opts.center {
        let offset = center_model(&mut mesh);
        tracing::debug!(dx = offset.x, dy = offset.y, "centred model");
    }
    if opts.rotate {
        rotate_quarter_turn(&mut mesh);
    }
    tracing::info!(
        path = %opts.input.display(),
        triangles = mesh.triangle_count(),
        "loaded model"
    );
    Ok(mesh)
}

/// `m{machine}_c{chunk}.stl`.
pub fn chunk_file_name(machine: usize, chunk: usize) -> String {
    format!("m{machine}_c{chunk}.stl")
}

/// Validate the configuration and chunk `model`.
///
/// A configuration error is also recorded in `output/error_logs`.
pub fn build_plan(model: &TriangleMesh, opts: &ChunkOptions) -> Result<ChunkPlan> {
    if let Err(err) = opts.config.validate(opts.robots) {
        let message = format!("{err:#}");
        write_error_log(&opts.output, &message)
            .with_context(|| format!("Failed to write error log to {}", opts.output.display()))?;
        return Err(err.context("Invalid configuration"));
    }
    let plan = chunk_model(
        model,
        opts.mode,
        &opts.config.robot,
        &opts.config.chunking,
        &opts.config.ag,
        opts.robots,
    )
    .context("Chunking failed")?;
    plan.validate().context("Chunk plan is inconsistent")?;
    Ok(plan)
}

/// Write every printable chunk, with its alignment pegs, as an STL.
pub fn write_chunk_meshes(
    dir: &Path,
    plan: &ChunkPlan,
    plate: Option<&BuildPlate>,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    let mut written = Vec::new();
    for chunk in plan.chunks() {
        let Some(mesh) = chunk.mesh() else { continue };
        let mut out = mesh.clone();
        for peg in chunk.peg_meshes() {
            out.merge(&peg);
        }
        if let Some(plate) = plate {
            out = align_on_build_plate(&out, plate);
        }
        let path = dir.join(chunk_file_name(chunk.robot, chunk.number));
        write_stl(&path, &out).with_context(|| format!("Failed to write {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}

/// `chunk`: plan, then write chunk meshes and side files.
pub fn run_chunk(opts: &ChunkOptions) -> Result<ChunkOutcome> {
    let model = load_model(&opts.model)?;
    let plan = build_plan(&model, opts)?;
    let plate = opts.align_on_plate.then_some(&opts.config.chunking.build_plate);
    let meshes = write_chunk_meshes(&opts.output, &plan, plate)?;
    let side_files = write_side_files(&opts.output, &plan).context("Failed to write side files")?;
    tracing::info!(
        chunks = plan.chunk_count(),
        meshes = meshes.len(),
        dir = %opts.output.display(),
        "wrote chunks"
    );
    Ok(ChunkOutcome {
        plan,
        meshes,
        side_files,
    })
}

/// `simulate`: chunk, slice, schedule and write the simulation file.
pub fn run_simulate(opts: &ChunkOptions, pretty: bool) -> Result<(PathBuf, Simulation)> {
    let model = load_model(&opts.model)?;
    let mut plan = build_plan(&model, opts)?;
    write_side_files(&opts.output, &plan).context("Failed to write side files")?;

    slice_chunks(
        plan.robots.iter_mut().flat_map(|r| r.chunks.iter_mut()),
        &opts.config.slice,
    )
    .context("Slicing failed")?;
    let trace = cobuild_sim::simulate(&mut plan.robots, &opts.config.sim)
        .context("Simulation failed")?;
    let simulation = Simulation::from_trace(&trace);

    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("System clock is before the Unix epoch")?
        .as_secs();
    let path = opts.output.join(simulation_file_name(ts));
    simulation
        .save(&path, pretty)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!(
        frames = simulation.frame_count(),
        path = %path.display(),
        "wrote simulation"
    );
    Ok((path, simulation))
}

/// `layers`: the vertical layer plan of the model.
pub fn run_layers(model: &ModelOptions, config: &PipelineConfig) -> Result<LayerPlan> {
    let mesh = load_model(model)?;
    config.ag.validate()?;
    plan_layers(&mesh, &config.chunking, &config.ag).context("Layer planning failed")
}

/// `info`: counts and bounds of the model.
pub fn model_info(opts: &ModelOptions) -> Result<ModelInfo> {
    let mesh = load_model(opts)?;
    let b = mesh.bounds();
    let size = b.size();
    Ok(ModelInfo {
        path: opts.input.display().to_string(),
        triangles: mesh.triangle_count(),
        min: [b.min.x, b.min.y, b.min.z],
        max: [b.max.x, b.max.y, b.max.z],
        dimensions: [size.x, size.y, size.z],
        volume: mesh.signed_volume(),
        surface_area: mesh.surface_area(),
    })
}
