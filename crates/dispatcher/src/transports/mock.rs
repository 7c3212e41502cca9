//! ScriptedTransport - test double with scripted attempt results

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use contracts::{ContractError, DeliveryReceipt, OutboundMessage, Transport};

/// Result of one scripted attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedReply {
    /// `{success: true}`
    Accept,
    /// `{success: false}`
    Reject,
    /// Transport error with this message
    Error(String),
}

#[derive(Debug, Default)]
struct ScriptState {
    replies: VecDeque<ScriptedReply>,
    sent: Vec<OutboundMessage>,
}

/// Transport that plays back scripted replies, then a fallback
///
/// Clones share the script and the list of received messages.
#[derive(Debug, Clone)]
pub struct ScriptedTransport {
    name: String,
    fallback: ScriptedReply,
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedTransport {
    /// Accepts everything
    pub fn accepting() -> Self {
        Self::with_fallback(ScriptedReply::Accept)
    }

    /// Errors on every attempt
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_fallback(ScriptedReply::Error(message.into()))
    }

    pub fn with_fallback(fallback: ScriptedReply) -> Self {
        Self {
            name: "scripted".to_string(),
            fallback,
            state: Arc::new(Mutex::new(ScriptState::default())),
        }
    }

    /// Queue replies used before the fallback
    pub fn with_script(self, replies: impl IntoIterator<Item = ScriptedReply>) -> Self {
        self.lock().replies.extend(replies);
        self
    }

    /// Every message passed to `send`, one per attempt
    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.lock().sent.clone()
    }

    pub fn call_count(&self) -> usize {
        self.lock().sent.len()
    }

    /// Attempts made for one identity
    pub fn calls_for(&self, identity: &str) -> usize {
        self.lock()
            .sent
            .iter()
            .filter(|m| m.recipient.as_str() == identity)
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Transport for ScriptedTransport {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&mut self, message: &OutboundMessage) -> Result<DeliveryReceipt, ContractError> {
        let reply = {
            let mut state = self.lock();
            state.sent.push(message.clone());
            state.replies.pop_front().unwrap_or_else(|| self.fallback.clone())
        };

        match reply {
            ScriptedReply::Accept => Ok(DeliveryReceipt::accepted(format!(
                "scripted-{}",
                self.call_count()
            ))),
            ScriptedReply::Reject => Ok(DeliveryReceipt::rejected()),
            ScriptedReply::Error(message) => Err(ContractError::transport(&self.name, message)),
        }
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        Ok(())
    }
}
