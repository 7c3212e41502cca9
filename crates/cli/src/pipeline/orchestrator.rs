//! Pipeline orchestrator - coordinates all components.
//!
//! Collection appends into the record store; dispatch reads the store back,
//! so the two halves can run in separate invocations.

use std::time::Instant;

use contracts::{CampaignBlueprint, RecordStore};
use dispatcher::{
    create_transport, Clock, ConfiguredTransport, DeliveryLedger, DispatchEngine, LogTransport,
    MessageTemplates, SystemClock,
};
use ingestion::{Aggregator, JsonRecordStore};
use tokio::sync::watch;
use tracing::{info, warn};

use super::{CollectStats, DispatchStats, PipelineStats};
use crate::error::Result;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The campaign blueprint, CLI overrides applied
    pub blueprint: CampaignBlueprint,

    /// Maximum attempted recipients per batch (None = quota only)
    pub max_batch: Option<usize>,

    /// Detach the ledger and log instead of sending
    pub dry_run: bool,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run every enabled source and append the result to the record store
    pub async fn collect(&self) -> Result<CollectStats> {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;

        let aggregator = Aggregator::from_blueprint(blueprint);
        info!(
            sources = aggregator.source_count(),
            concurrency_limit = aggregator.concurrency_limit(),
            "Collecting candidate records..."
        );

        let report = aggregator.collect().await;
        for error in &report.errors {
            warn!(source = %error.source_name, error = %error.message, "Source failed");
        }

        let mut store = JsonRecordStore::open(&blueprint.campaign.store_path)?;
        let appended = store.append(&report.records)?;

        info!(
            accepted = report.records.len(),
            appended,
            store_size = store.len(),
            "Records stored"
        );

        Ok(CollectStats::from_report(
            &report,
            appended,
            start_time.elapsed(),
        ))
    }

    /// Run one dispatch batch over the records in the store
    ///
    /// The ledger is loaded before anything is sent; a corrupt snapshot
    /// aborts the run here.
    pub async fn dispatch(&self, shutdown: watch::Receiver<bool>) -> Result<DispatchStats> {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;

        let store = JsonRecordStore::open(&blueprint.campaign.store_path)?;
        let records = store.list(None)?;

        let mut ledger = DeliveryLedger::load(
            &blueprint.campaign.ledger_path,
            blueprint.dispatch.max_per_day,
        )?;
        let transport = if self.config.dry_run {
            info!("Dry run - ledger changes stay in memory, messages are only logged");
            ledger = ledger.detached();
            ConfiguredTransport::Log(LogTransport::new("dry-run"))
        } else {
            create_transport(&blueprint.transport)?
        };
        let templates = MessageTemplates::from_config(&blueprint.templates)?;

        info!(
            records = records.len(),
            templates = templates.len(),
            max_per_day = blueprint.dispatch.max_per_day,
            max_batch = ?self.config.max_batch,
            "Dispatching..."
        );

        let mut engine =
            DispatchEngine::new(ledger, transport, blueprint.dispatch.clone(), templates)
                .with_shutdown(shutdown);
        let batch = engine.run_batch(&records, self.config.max_batch).await;
        let ledger = engine.finish().await;

        Ok(DispatchStats::new(
            batch,
            ledger.summary(SystemClock.today()),
            self.config.dry_run,
            start_time.elapsed(),
        ))
    }

    /// Collect, then dispatch
    ///
    /// A shutdown request during collection skips the dispatch half.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) -> Result<PipelineStats> {
        let start_time = Instant::now();

        let collect = self.collect().await?;
        let dispatch = if *shutdown.borrow() {
            warn!("Shutdown requested, skipping dispatch");
            None
        } else {
            Some(self.dispatch(shutdown).await?)
        };

        Ok(PipelineStats {
            collect: Some(collect),
            dispatch,
            duration: start_time.elapsed(),
        })
    }
}
