//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{CampaignBlueprint, TransportType};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<CampaignSummary>,
}

#[derive(Serialize)]
struct CampaignSummary {
    version: String,
    campaign: String,
    source_count: usize,
    enabled_sources: usize,
    template_count: usize,
    transport: String,
    max_per_day: u32,
    max_attempts: u32,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    let path = &args.config.config;
    info!(config = %path.display(), "Validating configuration");

    let result = validate_config(path);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(path: &std::path::Path) -> ValidationResult {
    let config_path = path.display().to_string();

    if !path.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", path.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(path) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: (!warnings.is_empty()).then_some(warnings),
                summary: Some(CampaignSummary {
                    version: format!("{:?}", blueprint.version),
                    campaign: blueprint.campaign.name.clone(),
                    source_count: blueprint.sources.len(),
                    enabled_sources: blueprint.sources.iter().filter(|s| s.enabled).count(),
                    template_count: blueprint.templates.len(),
                    transport: format!("{:?}", blueprint.transport.transport_type).to_lowercase(),
                    max_per_day: blueprint.dispatch.max_per_day,
                    max_attempts: blueprint.dispatch.max_attempts,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &CampaignBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if !blueprint.sources.iter().any(|s| s.enabled) {
        warnings.push("No enabled sources - collect will produce nothing".to_string());
    }

    for source in blueprint.sources.iter().filter(|s| !s.enabled) {
        warnings.push(format!("Source '{}' is disabled", source.name));
    }

    if blueprint.collection.allowed_regions.is_empty() {
        warnings.push("collection.allowed_regions is empty - every locality is accepted".into());
    }

    if blueprint.dispatch.per_message_delay_ms == 0 {
        warnings.push("dispatch.per_message_delay_ms is 0 - sends are not throttled".into());
    }

    if blueprint.transport.transport_type == TransportType::Log {
        warnings.push("Log transport configured - messages are only logged".into());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Campaign: {}", summary.campaign);
            println!(
                "  Sources: {} ({} enabled)",
                summary.source_count, summary.enabled_sources
            );
            println!("  Templates: {}", summary.template_count);
            println!("  Transport: {}", summary.transport);
            println!("  Daily quota: {}", summary.max_per_day);
            println!("  Attempts per recipient: {}", summary.max_attempts);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
