//! Dispatcher error types

use std::path::PathBuf;

use chrono::NaiveDate;
use contracts::{ContractError, DeliveryStatus};
use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Recipient identity unusable; never retried
    #[error("invalid recipient identity '{identity}': {reason}")]
    Validation { identity: String, reason: String },

    /// One delivery attempt failed
    #[error("transport '{transport}' failed: {message}")]
    Transport { transport: String, message: String },

    /// Daily cap reached; halts the batch
    #[error("daily quota of {limit} reached for {date}")]
    QuotaExceeded { date: NaiveDate, limit: u32 },

    /// Ledger snapshot could not be read or written
    #[error("ledger persistence failed at {}: {message}", .path.display())]
    Persistence { path: PathBuf, message: String },

    /// Attempt to overwrite a SENT or FAILED entry
    #[error("recipient '{identity}' is already {status}")]
    TerminalStatus {
        identity: String,
        status: DeliveryStatus,
    },

    /// Setup error from a shared contract
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl DispatchError {
    pub fn validation(identity: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            identity: identity.into(),
            reason: reason.into(),
        }
    }

    pub fn transport(transport: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            transport: transport.into(),
            message: message.into(),
        }
    }

    pub fn persistence(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Persistence {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether this is a ledger write/read failure
    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence { .. })
    }
}
