//! Pipeline statistics and reports.

use std::time::Duration;

use dispatcher::{BatchResult, LedgerSummary};
use ingestion::AggregationReport;
use observability::DispatchStatsAggregator;

/// Statistics from one collection pass
#[derive(Debug, Clone, Default)]
pub struct CollectStats {
    /// Sources that ran
    pub sources: usize,

    /// Raw candidates produced across all sources
    pub produced: usize,

    /// Canonical records after filtering and dedup
    pub accepted: usize,

    /// Records new to the store
    pub appended: usize,

    pub duplicates: usize,

    /// Sorted (drop reason, count)
    pub dropped: Vec<(String, usize)>,

    /// One line per failed source
    pub errors: Vec<String>,

    pub duration: Duration,
}

impl CollectStats {
    pub fn from_report(report: &AggregationReport, appended: usize, duration: Duration) -> Self {
        let mut dropped: Vec<_> = report
            .dropped_by_reason()
            .into_iter()
            .map(|(reason, count)| (reason.as_str().to_string(), count))
            .collect();
        dropped.sort();

        Self {
            sources: report.per_source.len(),
            produced: report.total_produced(),
            accepted: report.records.len(),
            appended,
            duplicates: report.duplicates,
            dropped,
            errors: report.errors.iter().map(ToString::to_string).collect(),
            duration,
        }
    }

    pub fn print_summary(&self) {
        println!("\n=== Collection ===\n");
        println!("  Duration: {:.2}s", self.duration.as_secs_f64());
        println!("  Sources run: {}", self.sources);
        println!("  Candidates produced: {}", self.produced);
        println!("  Canonical records: {}", self.accepted);
        println!("  New in store: {}", self.appended);
        println!("  Duplicates dropped: {}", self.duplicates);

        if !self.dropped.is_empty() {
            println!("\n  Invalid records:");
            for (reason, count) in &self.dropped {
                println!("    - {}: {}", reason, count);
            }
        }

        if !self.errors.is_empty() {
            println!("\n  Failed sources:");
            for error in &self.errors {
                println!("    - {}", error);
            }
        }
    }
}

/// Statistics from one dispatch batch
#[derive(Debug, Clone)]
pub struct DispatchStats {
    pub batch: BatchResult,

    /// Ledger state after the batch
    pub ledger: LedgerSummary,

    pub dry_run: bool,

    pub duration: Duration,

    /// Per-outcome aggregation for the report
    pub outcomes: DispatchStatsAggregator,
}

impl DispatchStats {
    pub fn new(
        batch: BatchResult,
        ledger: LedgerSummary,
        dry_run: bool,
        duration: Duration,
    ) -> Self {
        let mut outcomes = DispatchStatsAggregator::new();
        for outcome in &batch.outcomes {
            outcomes.update(outcome.kind.as_str(), outcome.attempts, outcome.variant);
        }

        Self {
            batch,
            ledger,
            dry_run,
            duration,
            outcomes,
        }
    }

    pub fn print_summary(&self) {
        let title = if self.dry_run { "Dispatch (dry run)" } else { "Dispatch" };
        println!("\n=== {} ===\n", title);
        println!("  Duration: {:.2}s", self.duration.as_secs_f64());
        println!("  Attempted: {}", self.batch.attempted);
        println!("  Sent: {}", self.batch.succeeded);
        println!("  Failed: {}", self.batch.failed);
        println!("  Skipped: {}", self.batch.skipped);
        println!("  Deferred: {}", self.batch.deferred);

        if let Some(reason) = self.batch.stop_reason {
            println!("  Stopped early: {:?}", reason);
        }
        if self.batch.persistence_failures > 0 {
            println!(
                "  Ledger writes failed: {} (outcomes kept in memory)",
                self.batch.persistence_failures
            );
        }

        let quota = &self.ledger.quota;
        println!(
            "\n  Quota {}: {}/{} used",
            quota.date, quota.count, quota.limit
        );

        println!("\n{}", self.outcomes.summary());
    }
}

/// Statistics from a full `run`
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    pub collect: Option<CollectStats>,
    pub dispatch: Option<DispatchStats>,
    pub duration: Duration,
}

impl PipelineStats {
    pub fn print_summary(&self) {
        if let Some(collect) = &self.collect {
            collect.print_summary();
        }
        if let Some(dispatch) = &self.dispatch {
            dispatch.print_summary();
        }
        println!("Total duration: {:.2}s\n", self.duration.as_secs_f64());
    }
}
