//! Error types for CLI operations.

use contracts::ContractError;
use dispatcher::DispatchError;
use ingestion::IngestionError;
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration, template or transport setup error
    #[error(transparent)]
    Contract(#[from] ContractError),

    /// Record store could not be opened
    #[error("Record store unavailable: {0}")]
    Store(#[from] IngestionError),

    /// Ledger could not be loaded or flushed
    #[error("Delivery ledger unavailable: {0}")]
    Ledger(#[from] DispatchError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
