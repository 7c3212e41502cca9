//! Transport trait - outbound delivery interface

use serde::{Deserialize, Serialize};

use crate::{ContractError, RecipientId};

/// One rendered message for one recipient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub recipient: RecipientId,

    /// Display name used while rendering
    pub recipient_name: String,

    /// Rendered body
    pub body: String,

    /// Index of the template variant used
    pub variant: usize,
}

/// Result of a single delivery attempt
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    /// Whether the transport accepted the message
    pub success: bool,

    /// Transport-specific message id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl DeliveryReceipt {
    /// Accepted receipt
    pub fn accepted(id: impl Into<String>) -> Self {
        Self {
            success: true,
            id: Some(id.into()),
        }
    }

    /// Rejected receipt (counts as a failed attempt)
    pub fn rejected() -> Self {
        Self {
            success: false,
            id: None,
        }
    }
}

/// Outbound transport
///
/// Performs exactly one delivery attempt per `send` call; retrying is the
/// dispatcher's job.
#[trait_variant::make(Transport: Send)]
pub trait LocalTransport {
    /// Transport name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Attempt delivery of one message
    ///
    /// # Errors
    /// Returns `ContractError::Transport` describing the failed attempt
    async fn send(&mut self, message: &OutboundMessage) -> Result<DeliveryReceipt, ContractError>;

    /// Release resources
    async fn close(&mut self) -> Result<(), ContractError>;
}
