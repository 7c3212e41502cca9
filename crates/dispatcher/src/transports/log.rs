//! LogTransport - logs every message via tracing

use std::sync::atomic::{AtomicU64, Ordering};

use contracts::{ContractError, DeliveryReceipt, OutboundMessage, Transport};
use tracing::{info, instrument};

/// Transport that only logs; every attempt succeeds
pub struct LogTransport {
    name: String,
    sequence: AtomicU64,
}

impl LogTransport {
    /// Create a new LogTransport with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sequence: AtomicU64::new(0),
        }
    }

    fn log_message(&self, message: &OutboundMessage) -> String {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let id = format!("{}-{seq}", self.name);

        info!(
            transport = %self.name,
            message_id = %id,
            identity = %message.recipient,
            recipient = %message.recipient_name,
            variant = message.variant,
            chars = message.body.chars().count(),
            "message delivered"
        );
        id
    }
}

impl Transport for LogTransport {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_transport_send",
        skip(self, message),
        fields(transport = %self.name, identity = %message.recipient)
    )]
    async fn send(&mut self, message: &OutboundMessage) -> Result<DeliveryReceipt, ContractError> {
        let id = self.log_message(message);
        Ok(DeliveryReceipt::accepted(id))
    }

    #[instrument(name = "log_transport_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(
            transport = %self.name,
            delivered = self.sequence.load(Ordering::Relaxed),
            "LogTransport closed"
        );
        Ok(())
    }
}
