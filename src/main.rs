use anyhow::Result;
use clap::Parser;
use schematic_gen::Cli;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("warn,schematic_gen={level},llmapi={level}"))),
        )
        .init();

    let written = schematic_gen::run(&cli).await?;

    info!(
        review_log = %written.review_log.display(),
        iterations = written.iteration_images.len(),
        "done"
    );
    println!("✅ Saved image to {}", written.final_image.display());

    Ok(())
}
