//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace.
//! Business crates depend on this crate only, never on each other's internals.
//!
//! ## Record lifecycle
//! - Collectors emit `CandidateRecord`s
//! - The aggregator promotes them to `CanonicalRecord`s keyed by `dedup_key`
//! - The dispatcher renders `OutboundMessage`s and hands them to a `Transport`

mod blueprint;
mod collector;
mod delivery;
mod error;
mod recipient_id;
mod record;
mod store;
mod transport;

pub use blueprint::*;
pub use collector::{Collector, LocalCollector};
pub use delivery::DeliveryStatus;
pub use error::*;
pub use recipient_id::{IdentityError, IdentityKind, RecipientId};
pub use record::{dedup_key, CandidateRecord, CanonicalRecord, RecordFilter};
pub use store::RecordStore;
pub use transport::{DeliveryReceipt, LocalTransport, OutboundMessage, Transport};
