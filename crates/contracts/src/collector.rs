//! Collector trait - source-side producer interface

use crate::{CandidateRecord, ContractError, SourceConfig};

/// Producer of raw candidate records for one source.
///
/// Variants share no mutable state; the aggregator may run any number of
/// them concurrently.
#[trait_variant::make(Collector: Send)]
pub trait LocalCollector {
    /// Collector name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Produce the raw records of this source
    ///
    /// # Errors
    /// Returns `ContractError::Collector` when the source cannot be read;
    /// the failure stays local to this source.
    async fn produce(&self, config: &SourceConfig) -> Result<Vec<CandidateRecord>, ContractError>;
}
