//! Message variants rotated round-robin by the engine

use contracts::{CanonicalRecord, ContractError, OutboundMessage, TemplateConfig};

/// Fixed, non-empty set of message bodies
///
/// Bodies may reference `{name}` and `{locality}`.
#[derive(Debug, Clone)]
pub struct MessageTemplates {
    bodies: Vec<String>,
}

impl MessageTemplates {
    pub fn new<I, S>(bodies: I) -> Result<Self, ContractError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let bodies: Vec<String> = bodies.into_iter().map(Into::into).collect();
        if bodies.is_empty() {
            return Err(ContractError::config_validation(
                "templates",
                "at least one message template is required",
            ));
        }
        Ok(Self { bodies })
    }

    pub fn from_config(templates: &[TemplateConfig]) -> Result<Self, ContractError> {
        Self::new(templates.iter().map(|t| t.body.clone()))
    }

    /// Number of variants (never zero)
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Render variant `variant` (wrapped) for `record`
    pub fn render(&self, variant: usize, record: &CanonicalRecord) -> OutboundMessage {
        let variant = variant % self.bodies.len();
        let body = self.bodies[variant]
            .replace("{name}", &record.name)
            .replace("{locality}", &record.locality);

        OutboundMessage {
            recipient: record.identity.clone(),
            recipient_name: record.name.clone(),
            body,
            variant,
        }
    }
}
