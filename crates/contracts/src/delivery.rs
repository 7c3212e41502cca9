//! Delivery status shared between the ledger, the engine and the CLI

use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-recipient delivery status.
///
/// `Sent` and `Failed` are terminal; only an explicit ledger clear
/// brings a recipient back to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    #[default]
    Pending,
    Sent,
    Failed,
}

impl DeliveryStatus {
    /// Whether no further transition is allowed
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Sent | Self::Failed)
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}
