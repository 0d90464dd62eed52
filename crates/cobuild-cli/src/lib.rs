//! Library side of the `cobuild` command: configuration loading and the
//! chunk → slice → simulate pipeline, shared by the binary and its tests.

pub mod config;
pub mod pipeline;

pub use config::{PipelineConfig, Preset};
pub use pipeline::{
    build_plan, chunk_file_name, load_model, model_info, run_chunk, run_layers, run_simulate,
    write_chunk_meshes, ChunkOptions, ChunkOutcome, ModelInfo, ModelOptions,
};
