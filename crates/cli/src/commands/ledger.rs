//! `ledger` command implementation.

use anyhow::{Context, Result};
use dispatcher::{Clock, DeliveryLedger, LedgerEntry, LedgerSummary, SystemClock};
use serde::Serialize;
use tracing::info;

use super::load_blueprint;
use crate::cli::{LedgerAction, LedgerArgs, LedgerClearArgs, LedgerStatusArgs};

/// Ledger report for JSON output
#[derive(Serialize)]
struct LedgerReport<'a> {
    path: String,
    #[serde(flatten)]
    summary: LedgerSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    entries: Option<Vec<&'a LedgerEntry>>,
}

/// Execute the `ledger` command
pub fn run_ledger(args: &LedgerArgs) -> Result<()> {
    match &args.action {
        LedgerAction::Status(status) => ledger_status(status),
        LedgerAction::Clear(clear) => ledger_clear(clear),
    }
}

fn open_ledger(config: &std::path::Path) -> Result<DeliveryLedger> {
    let blueprint = load_blueprint(config)?;
    let ledger = DeliveryLedger::load(
        &blueprint.campaign.ledger_path,
        blueprint.dispatch.max_per_day,
    )
    .with_context(|| {
        format!(
            "Failed to load ledger from {}",
            blueprint.campaign.ledger_path.display()
        )
    })?;
    Ok(ledger)
}

fn ledger_status(args: &LedgerStatusArgs) -> Result<()> {
    let ledger = open_ledger(&args.config.config)?;
    let report = LedgerReport {
        path: ledger_path(&ledger),
        summary: ledger.summary(SystemClock.today()),
        entries: args.entries.then(|| ledger.entries()),
    };

    if args.json {
        let json =
            serde_json::to_string_pretty(&report).context("Failed to serialize ledger status")?;
        println!("{}", json);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn ledger_clear(args: &LedgerClearArgs) -> Result<()> {
    let mut ledger = open_ledger(&args.config.config)?;
    let before = ledger.summary(SystemClock.today());

    ledger.clear().context("Failed to clear ledger")?;
    info!(
        path = %ledger_path(&ledger),
        sent = before.sent,
        failed = before.failed,
        "Ledger cleared"
    );

    let report = LedgerReport {
        path: ledger_path(&ledger),
        summary: ledger.summary(SystemClock.today()),
        entries: None,
    };
    if args.json {
        let json =
            serde_json::to_string_pretty(&report).context("Failed to serialize ledger status")?;
        println!("{}", json);
    } else {
        println!(
            "✓ Ledger cleared: {} ({} sent, {} failed forgotten)",
            report.path, before.sent, before.failed
        );
    }
    Ok(())
}

fn ledger_path(ledger: &DeliveryLedger) -> String {
    ledger
        .path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<memory>".to_string())
}

fn print_report(report: &LedgerReport<'_>) {
    let summary = &report.summary;
    println!("\n=== Delivery Ledger ===\n");
    println!("  Path: {}", report.path);
    println!("  Sent: {}", summary.sent);
    println!("  Failed: {}", summary.failed);
    println!(
        "  Quota {}: {}/{} used ({} remaining)",
        summary.quota.date,
        summary.quota.count,
        summary.quota.limit,
        summary.quota.remaining()
    );
    if let Some(updated) = summary.last_updated {
        println!("  Last updated: {}", updated.to_rfc3339());
    }

    if let Some(entries) = &report.entries {
        println!("\n  Entries ({}):", entries.len());
        for entry in entries {
            match &entry.last_error {
                Some(error) => println!(
                    "    - {} {} after {} attempt(s): {}",
                    entry.identity, entry.status, entry.attempts, error
                ),
                None => println!(
                    "    - {} {} after {} attempt(s)",
                    entry.identity, entry.status, entry.attempts
                ),
            }
        }
    }
    println!();
}
