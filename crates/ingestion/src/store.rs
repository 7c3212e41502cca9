//! Record stores
//!
//! `MemoryRecordStore` keeps records in a Vec; `JsonRecordStore` mirrors it
//! into a single JSON document rewritten atomically on every mutation.

use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use contracts::{CanonicalRecord, ContractError, RecordFilter, RecordStore};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::IngestionError;

/// In-memory record store
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordStore {
    records: Vec<CanonicalRecord>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<CanonicalRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[CanonicalRecord] {
        &self.records
    }
}

impl RecordStore for MemoryRecordStore {
    fn append(&mut self, records: &[CanonicalRecord]) -> Result<usize, ContractError> {
        let mut known: HashSet<String> =
            self.records.iter().map(|r| r.dedup_key.clone()).collect();
        let before = self.records.len();

        for record in records {
            if known.insert(record.dedup_key.clone()) {
                self.records.push(record.clone());
            }
        }

        Ok(self.records.len() - before)
    }

    fn list(&self, filter: Option<&RecordFilter>) -> Result<Vec<CanonicalRecord>, ContractError> {
        Ok(self
            .records
            .iter()
            .filter(|r| filter.is_none_or(|f| f.matches(r)))
            .cloned()
            .collect())
    }

    fn update(&mut self, record: CanonicalRecord) -> Result<bool, ContractError> {
        match self
            .records
            .iter_mut()
            .find(|r| r.dedup_key == record.dedup_key)
        {
            Some(existing) => {
                *existing = record;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn remove_duplicates(&mut self) -> Result<Vec<CanonicalRecord>, ContractError> {
        let mut seen = HashSet::new();
        self.records.retain(|r| seen.insert(r.dedup_key.clone()));
        Ok(self.records.clone())
    }

    fn clear(&mut self) -> Result<(), ContractError> {
        self.records.clear();
        Ok(())
    }
}

/// On-disk document layout
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreDocument {
    #[serde(default)]
    records: Vec<CanonicalRecord>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
}

/// JSON-file record store
///
/// A missing file opens as an empty store; an unreadable one is an error.
#[derive(Debug)]
pub struct JsonRecordStore {
    path: PathBuf,
    inner: MemoryRecordStore,
}

impl JsonRecordStore {
    /// Open (or lazily create) the store at `path`
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, IngestionError> {
        let path = path.into();
        let records = match fs::read_to_string(&path) {
            Ok(content) => {
                let document: StoreDocument =
                    serde_json::from_str(&content).map_err(|e| IngestionError::StoreCorrupt {
                        path: path.clone(),
                        message: e.to_string(),
                    })?;
                document.records
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(IngestionError::StoreCorrupt {
                    path,
                    message: e.to_string(),
                })
            }
        };

        info!(path = %path.display(), records = records.len(), "record store opened");
        Ok(Self {
            path,
            inner: MemoryRecordStore::with_records(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn persist(&self) -> Result<(), IngestionError> {
        let document = StoreDocument {
            records: self.inner.records().to_vec(),
            updated_at: Some(Utc::now()),
        };
        let json = serde_json::to_vec_pretty(&document)
            .map_err(|e| self.write_error(io::Error::new(io::ErrorKind::InvalidData, e)))?;

        write_atomic(&self.path, &json).map_err(|e| self.write_error(e))?;
        debug!(
            path = %self.path.display(),
            records = document.records.len(),
            "record store written"
        );
        Ok(())
    }

    fn write_error(&self, error: io::Error) -> IngestionError {
        IngestionError::StoreWrite {
            path: self.path.clone(),
            error,
        }
    }
}

impl RecordStore for JsonRecordStore {
    fn append(&mut self, records: &[CanonicalRecord]) -> Result<usize, ContractError> {
        let added = self.inner.append(records)?;
        if added > 0 {
            self.persist()?;
        }
        Ok(added)
    }

    fn list(&self, filter: Option<&RecordFilter>) -> Result<Vec<CanonicalRecord>, ContractError> {
        self.inner.list(filter)
    }

    fn update(&mut self, record: CanonicalRecord) -> Result<bool, ContractError> {
        let updated = self.inner.update(record)?;
        if updated {
            self.persist()?;
        }
        Ok(updated)
    }

    fn remove_duplicates(&mut self) -> Result<Vec<CanonicalRecord>, ContractError> {
        let before = self.inner.len();
        let survivors = self.inner.remove_duplicates()?;
        if survivors.len() != before {
            self.persist()?;
        }
        Ok(survivors)
    }

    fn clear(&mut self) -> Result<(), ContractError> {
        self.inner.clear()?;
        self.persist()?;
        Ok(())
    }
}

/// Write `bytes` to a sibling temp file, then rename over `path`
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let mut file = fs::File::create(&tmp)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    fs::rename(&tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{CandidateRecord, RecipientId};
    use tempfile::tempdir;

    fn record(name: &str, contact: &str, locality: &str, source: &str) -> CanonicalRecord {
        let identity = RecipientId::parse(contact).unwrap();
        CanonicalRecord::from_candidate(
            CandidateRecord::new(source, name, contact, locality),
            identity,
            Utc::now(),
        )
    }

    #[test]
    fn test_append_skips_known_keys() {
        let mut store = MemoryRecordStore::new();
        let a = record("A", "a@x.pt", "Porto", "s1");
        let b = record("B", "b@x.pt", "Porto", "s1");

        assert_eq!(store.append(&[a.clone(), b.clone()]).unwrap(), 2);
        assert_eq!(store.append(&[a.clone(), a]).unwrap(), 0);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_list_with_filter() {
        let mut store = MemoryRecordStore::new();
        store
            .append(&[
                record("A", "a@x.pt", "Porto", "maps"),
                record("B", "b@x.pt", "Faro", "dir"),
            ])
            .unwrap();

        let filter = RecordFilter {
            source: Some("dir".into()),
            ..Default::default()
        };
        let listed = store.list(Some(&filter)).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "B");
        assert_eq!(store.list(None).unwrap().len(), 2);
    }

    #[test]
    fn test_update_replaces_matching_key() {
        let mut store = MemoryRecordStore::new();
        let original = record("A", "a@x.pt", "Porto", "maps");
        store.append(std::slice::from_ref(&original)).unwrap();

        let mut changed = original.clone();
        changed.source = "manual".into();
        assert!(store.update(changed).unwrap());
        assert_eq!(store.records()[0].source, "manual");

        assert!(!store.update(record("Z", "z@x.pt", "Faro", "x")).unwrap());
    }

    #[test]
    fn test_remove_duplicates_keeps_first() {
        let first = record("A", "a@x.pt", "Porto", "first");
        let mut second = first.clone();
        second.source = "second".into();

        let mut store = MemoryRecordStore::with_records(vec![first, second]);
        let survivors = store.remove_duplicates().unwrap();
        assert_eq!(survivors.len(), 1);
        assert_eq!(survivors[0].source, "first");
    }

    #[test]
    fn test_json_store_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state").join("records.json");

        let mut store = JsonRecordStore::open(&path).unwrap();
        assert!(store.is_empty());
        store
            .append(&[
                record("A", "a@x.pt", "Porto", "maps"),
                record("B", "+351912345678", "Faro", "dir"),
            ])
            .unwrap();

        let reopened = JsonRecordStore::open(&path).unwrap();
        let records = reopened.list(None).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].identity.as_str(), "+351912345678");
    }

    #[test]
    fn test_json_store_clear_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.json");

        let mut store = JsonRecordStore::open(&path).unwrap();
        store
            .append(&[record("A", "a@x.pt", "Porto", "maps")])
            .unwrap();
        store.clear().unwrap();

        assert!(JsonRecordStore::open(&path).unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_store_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.json");
        fs::write(&path, "{ not json").unwrap();

        let err = JsonRecordStore::open(&path).unwrap_err();
        assert!(matches!(err, IngestionError::StoreCorrupt { .. }));
    }
}
