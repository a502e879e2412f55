use std::path::{Path, PathBuf};

use llmapi::utils::extension_for_mime;
use serde::Serialize;
use tokio::fs;
use tracing::{info, warn};

use crate::config::GeneratorConfig;
use crate::constants::REVIEW_LOG_SUFFIX;
use crate::error::{Result, SchematicError};
use crate::models::{IterationRecord, IterativeOutcome};

/// Paths produced by [`write_outcome`].
#[derive(Debug, Clone)]
pub struct WrittenOutput {
    pub final_image: PathBuf,
    pub iteration_images: Vec<PathBuf>,
    pub review_log: PathBuf,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewLog<'a> {
    pub prompt: &'a str,
    pub image_model: &'a str,
    pub review_model: &'a str,
    pub quality_threshold: f32,
    pub accepted: bool,
    pub iterations: u32,
    pub final_image: String,
    pub history: Vec<IterationRecord>,
}

pub fn iteration_file_name(stem: &str, iteration: u32, mime_type: &str) -> String {
    format!("{stem}_v{iteration}.{}", extension_for_mime(mime_type))
}

pub fn review_log_path(output_path: &Path) -> PathBuf {
    output_path.with_file_name(format!("{}{REVIEW_LOG_SUFFIX}", file_stem(output_path)))
}

/// Writes every iteration's image beside `output_path`, the final image to
/// `output_path` itself, and a JSON review log.
pub async fn write_outcome(
    outcome: &IterativeOutcome,
    output_path: &Path,
    prompt: &str,
    config: &GeneratorConfig,
) -> Result<WrittenOutput> {
    ensure_parent_dir(output_path).await?;
    let stem = file_stem(output_path);

    let mut history = outcome.history.clone();
    let mut iteration_images = Vec::with_capacity(outcome.images.len());

    for image in &outcome.images {
        let name = iteration_file_name(&stem, image.request.iteration, &image.mime_type);
        let path = output_path.with_file_name(&name);
        write_file(&path, &image.bytes).await?;

        if let Some(record) = history
            .iter_mut()
            .find(|record| record.iteration == image.request.iteration)
        {
            record.image_file = Some(name);
        }
        iteration_images.push(path);
    }

    warn_on_extension_mismatch(output_path, &outcome.image.mime_type);
    write_file(output_path, &outcome.image.bytes).await?;
    info!(path = %output_path.display(), "saved final image");

    let log = ReviewLog {
        prompt,
        image_model: config.image_model(),
        review_model: config.review_model(),
        quality_threshold: config.quality_threshold(),
        accepted: outcome.accepted,
        iterations: outcome.iterations,
        final_image: output_path.display().to_string(),
        history,
    };
    let review_log = review_log_path(output_path);
    let payload = serde_json::to_string_pretty(&log).map_err(|err| {
        SchematicError::io(&review_log, std::io::Error::other(err))
    })?;
    write_file(&review_log, payload.as_bytes()).await?;

    Ok(WrittenOutput {
        final_image: output_path.to_path_buf(),
        iteration_images,
        review_log,
    })
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .unwrap_or("schematic")
        .to_string()
}

async fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent)
            .await
            .map_err(|err| SchematicError::io(parent, err)),
        _ => Ok(()),
    }
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes)
        .await
        .map_err(|err| SchematicError::io(path, err))
}

fn warn_on_extension_mismatch(path: &Path, mime_type: &str) {
    if let Some(expected) = mime_guess::from_path(path).first_raw() {
        if !expected.eq_ignore_ascii_case(mime_type) {
            warn!(
                path = %path.display(),
                image_mime = mime_type,
                "output extension does not match the generated image format; bytes are written as delivered"
            );
        }
    }
}
