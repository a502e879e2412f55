use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use llmapi::providers::DEFAULT_OPENROUTER_ENDPOINT;

use crate::config::GeneratorConfig;
use crate::constants::{
    API_KEY_ENV, DEFAULT_IMAGE_MODEL, DEFAULT_MAX_ITERATIONS, DEFAULT_REVIEW_MODEL,
    DEFAULT_TIMEOUT_SECS,
};
use crate::error::Result;
use crate::models::DocType;

#[derive(Debug, Parser)]
#[command(
    name = "schematic-gen",
    version,
    about = "Generate a scientific schematic, review it with a vision model and refine until it passes"
)]
pub struct Cli {
    /// What the schematic should show
    pub prompt: String,

    /// Path for the final image; per-iteration images and the review log go beside it
    #[arg(short, long)]
    pub output: PathBuf,

    /// Maximum generate/review cycles
    #[arg(long, default_value_t = DEFAULT_MAX_ITERATIONS)]
    pub iterations: u32,

    /// Target document type; sets the default acceptance threshold
    #[arg(long, value_enum, default_value_t = DocType::Default)]
    pub doc_type: DocType,

    /// Minimum review score (0-10) to accept an image; overrides --doc-type
    #[arg(long)]
    pub threshold: Option<f32>,

    /// OpenRouter API key
    #[arg(long, env = API_KEY_ENV, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Model that draws the image
    #[arg(long, default_value = DEFAULT_IMAGE_MODEL)]
    pub image_model: String,

    /// Vision model that reviews the image
    #[arg(long, default_value = DEFAULT_REVIEW_MODEL)]
    pub review_model: String,

    /// OpenRouter-compatible API base URL
    #[arg(long, default_value = DEFAULT_OPENROUTER_ENDPOINT)]
    pub endpoint: String,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Log prompts and raw reviews
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn quality_threshold(&self) -> f32 {
        self.threshold
            .unwrap_or_else(|| self.doc_type.quality_threshold())
    }

    pub fn generator_config(&self) -> Result<GeneratorConfig> {
        GeneratorConfig::from_env(self.api_key.clone())?
            .with_image_model(&self.image_model)
            .with_review_model(&self.review_model)
            .with_endpoint(&self.endpoint)
            .with_verbose(self.verbose)
            .with_timeout(Duration::from_secs(self.timeout))
            .with_quality_threshold(self.quality_threshold())
    }
}
