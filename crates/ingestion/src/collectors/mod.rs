//! Collector variants
//!
//! Each variant implements `contracts::Collector`; `SourceCollector` tags
//! them so the aggregator can hold a homogeneous list. Test doubles register
//! through `Aggregator<MockCollector>` instead.

mod file;
mod inline;

pub use self::file::{FileCollector, FileFormat};
pub use self::inline::InlineCollector;

use contracts::{CandidateRecord, Collector, ContractError, SourceConfig, SourceType};

/// One variant per `SourceType`
#[derive(Debug, Clone)]
pub enum SourceCollector {
    Inline(InlineCollector),
    File(FileCollector),
}

impl SourceCollector {
    /// Build the variant matching `config.source_type`
    pub fn from_config(config: &SourceConfig) -> Self {
        match config.source_type {
            SourceType::Inline => Self::Inline(InlineCollector::new(&config.name)),
            SourceType::File => Self::File(FileCollector::new(&config.name)),
        }
    }
}

impl Collector for SourceCollector {
    fn name(&self) -> &str {
        match self {
            Self::Inline(c) => c.name(),
            Self::File(c) => c.name(),
        }
    }

    async fn produce(&self, config: &SourceConfig) -> Result<Vec<CandidateRecord>, ContractError> {
        match self {
            Self::Inline(c) => c.produce(config).await,
            Self::File(c) => c.produce(config).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_picks_variant() {
        let inline = SourceConfig::inline("seed", vec![]);
        assert!(matches!(
            SourceCollector::from_config(&inline),
            SourceCollector::Inline(_)
        ));

        let file = SourceConfig {
            source_type: SourceType::File,
            ..SourceConfig::inline("dir", vec![])
        };
        let collector = SourceCollector::from_config(&file);
        assert!(matches!(collector, SourceCollector::File(_)));
        assert_eq!(collector.name(), "dir");
    }
}
