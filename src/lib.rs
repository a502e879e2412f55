pub mod cli;
pub mod commands;
pub mod config;
pub mod constants;
pub mod error;
pub mod generator;
pub mod models;
pub mod output;
pub mod prompts;

pub use cli::Cli;
pub use commands::generate::{generate_to_file, run};
pub use config::GeneratorConfig;
pub use constants::{API_KEY_ENV, DEFAULT_IMAGE_MODEL, DEFAULT_MAX_ITERATIONS, DEFAULT_REVIEW_MODEL};
pub use error::{Result, SchematicError};
pub use generator::{SchematicGenerator, SchematicPipeline};
pub use models::{
    DocType, GeneratedImage, GenerationRequest, IterationRecord, IterativeOutcome, ReviewResult,
};
pub use output::{write_outcome, WrittenOutput};
pub use prompts::improve_prompt;
