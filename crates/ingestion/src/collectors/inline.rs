//! InlineCollector - records embedded in the source config

use contracts::{CandidateRecord, Collector, ContractError, SourceConfig};
use tracing::debug;

/// Returns the records listed directly under `[[sources.records]]`
#[derive(Debug, Clone)]
pub struct InlineCollector {
    name: String,
}

impl InlineCollector {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Collector for InlineCollector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn produce(&self, config: &SourceConfig) -> Result<Vec<CandidateRecord>, ContractError> {
        debug!(source = %self.name, records = config.records.len(), "inline source read");
        Ok(config.records.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_returns_configured_records() {
        let config = SourceConfig::inline(
            "seed",
            vec![
                CandidateRecord::new("", "A", "+351911111111", "Lisboa"),
                CandidateRecord::new("", "B", "b@shop.pt", "Porto"),
            ],
        );

        let collector = InlineCollector::new("seed");
        let records = collector.produce(&config).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].contact.as_deref(), Some("b@shop.pt"));
    }
}
