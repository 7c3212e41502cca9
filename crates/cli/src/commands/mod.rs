//! Command implementations.

mod collect;
mod dispatch;
mod ledger;
mod validate;

pub use collect::run_collect;
pub use dispatch::{run_dispatch, run_full};
pub use ledger::run_ledger;
pub use validate::run_validate;

use std::path::Path;

use contracts::CampaignBlueprint;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::{CliError, Result};

/// Load and validate the campaign configuration
fn load_blueprint(path: &Path) -> Result<CampaignBlueprint> {
    info!(config = %path.display(), "Loading configuration");

    if !path.exists() {
        return Err(CliError::config_not_found(path.display().to_string()));
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(path)?;
    info!(
        campaign = %blueprint.campaign.name,
        sources = blueprint.sources.len(),
        templates = blueprint.templates.len(),
        "Configuration loaded"
    );
    Ok(blueprint)
}

/// Shutdown flag flipped by Ctrl+C or SIGTERM
///
/// Abort the returned task once the command is done.
fn shutdown_on_signal() -> (watch::Receiver<bool>, JoinHandle<()>) {
    let (tx, rx) = watch::channel(false);
    let task = tokio::spawn(async move {
        wait_for_signal().await;
        warn!("Received shutdown signal, finishing the current recipient...");
        let _ = tx.send(true);
    });
    (rx, task)
}

/// Wait for Ctrl+C or SIGTERM
async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
