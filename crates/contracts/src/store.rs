//! RecordStore trait - canonical record persistence interface

use crate::{CanonicalRecord, ContractError, RecordFilter};

/// Durable list of canonical records
pub trait RecordStore: Send {
    /// Append records, skipping any whose dedup key is already stored.
    ///
    /// Returns the number of records actually added.
    fn append(&mut self, records: &[CanonicalRecord]) -> Result<usize, ContractError>;

    /// List records in insertion order
    fn list(&self, filter: Option<&RecordFilter>) -> Result<Vec<CanonicalRecord>, ContractError>;

    /// Replace the stored record sharing `record.dedup_key`.
    ///
    /// Returns false when no such record exists.
    fn update(&mut self, record: CanonicalRecord) -> Result<bool, ContractError>;

    /// Drop later records sharing a dedup key with an earlier one.
    ///
    /// Returns the surviving records.
    fn remove_duplicates(&mut self) -> Result<Vec<CanonicalRecord>, ContractError>;

    /// Remove every record
    fn clear(&mut self) -> Result<(), ContractError>;
}
