//! Aggregator - runs collectors concurrently and builds the canonical set

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use contracts::{
    CampaignBlueprint, CandidateRecord, CanonicalRecord, Collector, ContractError, SourceConfig,
};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use crate::collectors::SourceCollector;
use crate::error::CollectorError;
use crate::metrics::AggregatorMetrics;
use crate::validity::{DropReason, DroppedRecord, RecordValidator};

/// A source paired with the collector that reads it
struct RegisteredSource<C> {
    config: Arc<SourceConfig>,
    collector: Arc<C>,
}

/// Per-source outcome of one aggregation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSummary {
    pub name: String,
    /// Raw candidates returned (0 on failure)
    pub produced: usize,
    pub failed: bool,
    pub duration: Duration,
}

/// Result of one `collect` call
#[derive(Debug, Default)]
pub struct AggregationReport {
    /// Canonical records in merge order, unique by dedup key
    pub records: Vec<CanonicalRecord>,

    /// One entry per failed or panicked collector
    pub errors: Vec<CollectorError>,

    /// Enabled sources in registration order
    pub per_source: Vec<SourceSummary>,

    /// Later occurrences discarded by the dedup pass
    pub duplicates: usize,

    /// Candidates rejected by the validity filter
    pub dropped: Vec<DroppedRecord>,
}

impl AggregationReport {
    /// Dropped counts grouped by reason
    pub fn dropped_by_reason(&self) -> HashMap<DropReason, usize> {
        let mut counts = HashMap::new();
        for dropped in &self.dropped {
            *counts.entry(dropped.reason).or_insert(0) += 1;
        }
        counts
    }

    /// Whether at least one collector failed
    pub fn is_partial(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Raw candidates received across all sources
    pub fn total_produced(&self) -> usize {
        self.per_source.iter().map(|s| s.produced).sum()
    }
}

enum SourceOutcome {
    Produced(Vec<CandidateRecord>, Duration),
    Failed(CollectorError, Duration),
}

/// Aggregator
///
/// Collectors run concurrently up to `concurrency_limit`; their outputs are
/// merged in registration order regardless of completion order, then
/// filtered and deduplicated in one sequential pass.
pub struct Aggregator<C = SourceCollector> {
    sources: Vec<RegisteredSource<C>>,
    concurrency_limit: usize,
    validator: RecordValidator,
    metrics: Arc<AggregatorMetrics>,
}

impl<C> Aggregator<C>
where
    C: Collector + Send + Sync + 'static,
{
    /// Create an aggregator; a limit of 0 is treated as 1
    pub fn new(concurrency_limit: usize, validator: RecordValidator) -> Self {
        Self {
            sources: Vec::new(),
            concurrency_limit: concurrency_limit.max(1),
            validator,
            metrics: Arc::new(AggregatorMetrics::new()),
        }
    }

    /// Register a source; registration order is merge order
    pub fn register(&mut self, config: SourceConfig, collector: C) {
        debug!(source = %config.name, enabled = config.enabled, "registered source");
        self.sources.push(RegisteredSource {
            config: Arc::new(config),
            collector: Arc::new(collector),
        });
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    pub fn metrics(&self) -> Arc<AggregatorMetrics> {
        self.metrics.clone()
    }

    /// Run every enabled collector and build the canonical set
    #[instrument(
        name = "aggregator_collect",
        skip(self),
        fields(sources = self.sources.len(), limit = self.concurrency_limit)
    )]
    pub async fn collect(&self) -> AggregationReport {
        let enabled: Vec<&RegisteredSource<C>> =
            self.sources.iter().filter(|s| s.config.enabled).collect();
        info!(enabled = enabled.len(), "starting collection");

        let outcomes = self.run_collectors(&enabled).await;

        let mut report = AggregationReport::default();
        let mut merged = Vec::new();

        for (source, outcome) in enabled.iter().zip(outcomes) {
            let name = source.config.name.as_str();
            let (produced, failed, duration) = match outcome {
                SourceOutcome::Produced(mut records, duration) => {
                    for record in &mut records {
                        if record.source.is_empty() {
                            record.source = name.to_string();
                        }
                    }
                    let produced = records.len();
                    merged.extend(records);
                    (produced, false, duration)
                }
                SourceOutcome::Failed(error, duration) => {
                    warn!(
                        source = %name,
                        panicked = error.panicked,
                        error = %error.message,
                        "collector failed"
                    );
                    report.errors.push(error);
                    (0, true, duration)
                }
            };

            self.metrics.record_collector_run(failed);
            self.metrics.record_received(produced);
            observability::record_collector_result(
                name,
                produced,
                failed,
                duration.as_secs_f64() * 1000.0,
            );
            report.per_source.push(SourceSummary {
                name: name.to_string(),
                produced,
                failed,
                duration,
            });
        }

        self.canonicalize(merged, &mut report);

        for (reason, count) in report.dropped_by_reason() {
            observability::record_records_dropped(reason.as_str(), count);
        }
        observability::record_duplicates(report.duplicates);

        info!(
            accepted = report.records.len(),
            duplicates = report.duplicates,
            dropped = report.dropped.len(),
            failed_sources = report.errors.len(),
            "collection finished"
        );
        report
    }

    /// Run collectors on a JoinSet, returning outcomes in `sources` order
    async fn run_collectors(&self, sources: &[&RegisteredSource<C>]) -> Vec<SourceOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency_limit));
        let mut tasks = JoinSet::new();
        let mut task_index = HashMap::new();

        for (idx, source) in sources.iter().enumerate() {
            let semaphore = semaphore.clone();
            let config = source.config.clone();
            let collector = source.collector.clone();

            let handle = tasks.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        let err =
                            ContractError::collector(config.name.clone(), "collector pool closed");
                        return (Err(err), Duration::ZERO);
                    }
                };
                let started = Instant::now();
                let result = collector.produce(&config).await;
                (result, started.elapsed())
            });
            task_index.insert(handle.id(), idx);
        }

        let mut outcomes: Vec<Option<SourceOutcome>> = (0..sources.len()).map(|_| None).collect();

        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((id, (result, duration))) => {
                    let Some(&idx) = task_index.get(&id) else {
                        continue;
                    };
                    let name = &sources[idx].config.name;
                    outcomes[idx] = Some(match result {
                        Ok(records) => SourceOutcome::Produced(records, duration),
                        Err(err) => SourceOutcome::Failed(
                            CollectorError::failed(name, collector_message(err)),
                            duration,
                        ),
                    });
                }
                Err(err) => {
                    let Some(&idx) = task_index.get(&err.id()) else {
                        continue;
                    };
                    let name = &sources[idx].config.name;
                    let error = if err.is_panic() {
                        CollectorError::panicked(name, panic_message(err.into_panic()))
                    } else {
                        CollectorError::failed(name, "collector task cancelled")
                    };
                    outcomes[idx] = Some(SourceOutcome::Failed(error, Duration::ZERO));
                }
            }
        }

        outcomes
            .into_iter()
            .zip(sources)
            .map(|(outcome, source)| {
                outcome.unwrap_or_else(|| {
                    SourceOutcome::Failed(
                        CollectorError::failed(&source.config.name, "collector did not report"),
                        Duration::ZERO,
                    )
                })
            })
            .collect()
    }

    /// Validity filter then first-wins dedup, in merge order
    fn canonicalize(&self, merged: Vec<CandidateRecord>, report: &mut AggregationReport) {
        let collected_at = Utc::now();
        let mut seen = HashSet::new();

        for candidate in merged {
            let identity = match self.validator.check(&candidate) {
                Ok(identity) => identity,
                Err(rejection) => {
                    debug!(source = %candidate.source, reason = %rejection.reason, "record dropped");
                    self.metrics.record_dropped();
                    report.dropped.push(DroppedRecord {
                        record: candidate,
                        reason: rejection.reason,
                        detail: rejection.detail,
                    });
                    continue;
                }
            };

            let record = CanonicalRecord::from_candidate(candidate, identity, collected_at);
            if seen.insert(record.dedup_key.clone()) {
                self.metrics.record_accepted();
                report.records.push(record);
            } else {
                self.metrics.record_duplicate();
                report.duplicates += 1;
            }
        }
    }
}

impl Aggregator<SourceCollector> {
    /// Aggregator with every blueprint source registered in config order
    pub fn from_blueprint(blueprint: &CampaignBlueprint) -> Self {
        let mut aggregator = Self::new(
            blueprint.collection.concurrency_limit,
            RecordValidator::new(&blueprint.collection.allowed_regions),
        );
        for source in &blueprint.sources {
            aggregator.register(source.clone(), SourceCollector::from_config(source));
        }
        aggregator
    }
}

fn collector_message(err: ContractError) -> String {
    match err {
        ContractError::Collector { message, .. } => message,
        other => other.to_string(),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked".to_string()
    }
}
