use std::path::Path;

use tracing::{info, warn};

use crate::cli::Cli;
use crate::config::GeneratorConfig;
use crate::error::Result;
use crate::generator::{SchematicGenerator, SchematicPipeline};
use crate::models::IterativeOutcome;
use crate::output::{write_outcome, WrittenOutput};

/// Runs the refinement loop on any pipeline and persists the result.
pub async fn generate_to_file<P>(
    pipeline: &P,
    config: &GeneratorConfig,
    prompt: &str,
    max_iterations: u32,
    output: &Path,
) -> Result<(IterativeOutcome, WrittenOutput)>
where
    P: SchematicPipeline,
{
    let outcome = pipeline.generate_iterative(prompt, max_iterations).await?;
    let written = write_outcome(&outcome, output, prompt, config).await?;

    if outcome.accepted {
        let score = outcome.history.last().and_then(|record| record.review.score);
        info!(
            iterations = outcome.iterations,
            score = ?score,
            "image accepted"
        );
    } else {
        warn!(
            iterations = outcome.iterations,
            threshold = config.quality_threshold(),
            "no image reached the quality threshold; keeping the last attempt"
        );
    }

    Ok((outcome, written))
}

/// Entry point for the command line: resolve config, build the generator, run.
pub async fn run(cli: &Cli) -> Result<WrittenOutput> {
    let config = cli.generator_config()?;
    let generator = SchematicGenerator::new(config)?;

    info!(
        image_model = generator.image_model(),
        review_model = generator.review_model(),
        doc_type = %cli.doc_type,
        threshold = generator.config().quality_threshold(),
        max_iterations = cli.iterations,
        "starting schematic generation"
    );

    let (_, written) = generate_to_file(
        &generator,
        generator.config(),
        &cli.prompt,
        cli.iterations,
        &cli.output,
    )
    .await?;

    Ok(written)
}
