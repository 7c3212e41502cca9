//! # Ingestion
//!
//! Candidate collection and canonicalization.
//!
//! Responsibilities:
//! - Run source collectors concurrently under a permit limit
//! - Isolate collector failures and panics per source
//! - Filter unusable records and deduplicate by composite key
//! - Persist canonical records through a `RecordStore`
//!
//! ## Usage Example
//!
//! ```ignore
//! use contracts::RecordStore;
//! use ingestion::{Aggregator, JsonRecordStore};
//!
//! let aggregator = Aggregator::from_blueprint(&blueprint);
//! let report = aggregator.collect().await;
//!
//! let mut store = JsonRecordStore::open(&blueprint.campaign.store_path)?;
//! store.append(&report.records)?;
//! ```
//!
//! ## Mock Testing
//!
//! ```ignore
//! use ingestion::{Aggregator, MockCollector, RecordValidator};
//!
//! let mut aggregator = Aggregator::new(2, RecordValidator::allow_all());
//! aggregator.register(config, MockCollector::failing("maps", "timeout"));
//! ```

mod aggregator;
mod collectors;
mod error;
mod metrics;
mod mock;
mod store;
mod validity;

pub use aggregator::{AggregationReport, Aggregator, SourceSummary};
pub use collectors::{FileCollector, FileFormat, InlineCollector, SourceCollector};
pub use error::{CollectorError, IngestionError, Result};
pub use metrics::{AggregatorMetrics, MetricsSnapshot};
pub use mock::{MockBehavior, MockCollector};
pub use store::{JsonRecordStore, MemoryRecordStore};
pub use validity::{DropReason, DroppedRecord, RecordValidator, Rejection};
