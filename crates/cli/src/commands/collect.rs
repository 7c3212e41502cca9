//! `collect` command implementation.

use anyhow::{Context, Result};
use tracing::info;

use super::load_blueprint;
use crate::cli::CollectArgs;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `collect` command
pub async fn run_collect(args: &CollectArgs) -> Result<()> {
    let mut blueprint = load_blueprint(&args.config.config)?;

    if let Some(limit) = args.concurrency {
        info!(limit, "Overriding collector concurrency from CLI");
        blueprint.collection.concurrency_limit = limit;
        config_loader::ConfigLoader::validate(&blueprint)
            .context("Invalid --concurrency override")?;
    }

    let pipeline = Pipeline::new(PipelineConfig {
        blueprint,
        max_batch: None,
        dry_run: false,
    });

    let stats = pipeline.collect().await.context("Collection failed")?;
    info!(
        accepted = stats.accepted,
        appended = stats.appended,
        failed_sources = stats.errors.len(),
        "Collection finished"
    );
    stats.print_summary();

    Ok(())
}
