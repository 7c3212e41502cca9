//! `dispatch` and `run` command implementations.

use anyhow::{Context, Result};
use tracing::info;

use super::{load_blueprint, shutdown_on_signal};
use crate::cli::DispatchArgs;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `dispatch` command
pub async fn run_dispatch(args: &DispatchArgs) -> Result<()> {
    let pipeline = build_pipeline(args)?;
    let (shutdown, signal_task) = shutdown_on_signal();

    let result = pipeline.dispatch(shutdown).await;
    signal_task.abort();

    let stats = result.context("Dispatch failed")?;
    info!(
        sent = stats.batch.succeeded,
        failed = stats.batch.failed,
        deferred = stats.batch.deferred,
        "Dispatch finished"
    );
    stats.print_summary();

    Ok(())
}

/// Execute the `run` command
pub async fn run_full(args: &DispatchArgs) -> Result<()> {
    let pipeline = build_pipeline(args)?;
    let (shutdown, signal_task) = shutdown_on_signal();

    let result = pipeline.run(shutdown).await;
    signal_task.abort();

    let stats = result.context("Pipeline execution failed")?;
    info!(
        duration_secs = stats.duration.as_secs_f64(),
        "Pipeline completed"
    );
    stats.print_summary();

    Ok(())
}

fn build_pipeline(args: &DispatchArgs) -> Result<Pipeline> {
    let mut blueprint = load_blueprint(&args.config.config)?;

    if let Some(max_per_day) = args.max_per_day {
        info!(max_per_day, "Overriding daily quota from CLI");
        blueprint.dispatch.max_per_day = max_per_day;
        config_loader::ConfigLoader::validate(&blueprint)
            .context("Invalid --max-per-day override")?;
    }

    Ok(Pipeline::new(PipelineConfig {
        blueprint,
        max_batch: args.max_batch,
        dry_run: args.dry_run,
    }))
}
