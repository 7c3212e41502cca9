//! Candidate and canonical contact records
//!
//! `CandidateRecord` is what a collector emits; `CanonicalRecord` is what the
//! aggregator keeps after validation and deduplication.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::RecipientId;

/// Raw record as produced by a collector
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRecord {
    /// Display name (business or person)
    #[serde(default)]
    pub name: Option<String>,

    /// Raw contact identity (phone number or e-mail)
    #[serde(default, alias = "phone", alias = "email")]
    pub contact: Option<String>,

    /// Locality / region the contact belongs to
    #[serde(default, alias = "city")]
    pub locality: Option<String>,

    /// Source tag (filled in by the aggregator when empty)
    #[serde(default)]
    pub source: String,
}

impl CandidateRecord {
    /// Create a candidate with all fields present
    pub fn new(
        source: impl Into<String>,
        name: impl Into<String>,
        contact: impl Into<String>,
        locality: impl Into<String>,
    ) -> Self {
        Self {
            name: Some(name.into()),
            contact: Some(contact.into()),
            locality: Some(locality.into()),
            source: source.into(),
        }
    }
}

/// Validated, deduplicated record eligible for dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    /// Composite dedup key, see [`dedup_key`]
    pub dedup_key: String,

    /// Normalized recipient identity
    pub identity: RecipientId,

    pub name: String,

    pub locality: String,

    /// Collector that produced the first occurrence
    pub source: String,

    /// When the record was accepted by the aggregator
    pub collected_at: DateTime<Utc>,
}

impl CanonicalRecord {
    /// Promote a candidate whose identity has already been parsed
    pub fn from_candidate(
        candidate: CandidateRecord,
        identity: RecipientId,
        collected_at: DateTime<Utc>,
    ) -> Self {
        let name = clean_text(candidate.name.as_deref().unwrap_or_default());
        let locality = clean_text(candidate.locality.as_deref().unwrap_or_default());
        let dedup_key = dedup_key(&identity, &name, &locality);

        Self {
            dedup_key,
            identity,
            name,
            locality,
            source: candidate.source,
            collected_at,
        }
    }
}

/// Composite dedup key: identity, name and locality, lowercased and
/// whitespace-collapsed, joined with `|`.
pub fn dedup_key(identity: &RecipientId, name: &str, locality: &str) -> String {
    format!(
        "{}|{}|{}",
        identity.as_str().to_lowercase(),
        clean_text(name).to_lowercase(),
        clean_text(locality).to_lowercase()
    )
}

fn clean_text(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Optional filter for `RecordStore::list`
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    /// Only records from this source
    pub source: Option<String>,

    /// Only records in this locality (case-insensitive)
    pub locality: Option<String>,
}

impl RecordFilter {
    /// Check whether a record passes the filter
    pub fn matches(&self, record: &CanonicalRecord) -> bool {
        let source_ok = self
            .source
            .as_deref()
            .is_none_or(|source| record.source == source);
        let locality_ok = self
            .locality
            .as_deref()
            .is_none_or(|locality| record.locality.eq_ignore_ascii_case(locality.trim()));
        source_ok && locality_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_key_is_case_and_space_insensitive() {
        let id = RecipientId::parse("+351912345678").unwrap();
        assert_eq!(
            dedup_key(&id, "  Padaria   Central ", "LISBOA"),
            dedup_key(&id, "padaria central", "lisboa")
        );
    }

    #[test]
    fn test_from_candidate_cleans_fields() {
        let candidate = CandidateRecord::new("maps", " Cafe  Luso ", "+351912345678", " Porto ");
        let identity = RecipientId::parse(candidate.contact.as_deref().unwrap()).unwrap();
        let record = CanonicalRecord::from_candidate(candidate, identity, Utc::now());

        assert_eq!(record.name, "Cafe Luso");
        assert_eq!(record.locality, "Porto");
        assert_eq!(record.dedup_key, "+351912345678|cafe luso|porto");
        assert_eq!(record.source, "maps");
    }

    #[test]
    fn test_candidate_accepts_field_aliases() {
        let json = r#"{"name":"Shop","phone":"912345678","city":"Braga"}"#;
        let candidate: CandidateRecord = serde_json::from_str(json).unwrap();
        assert_eq!(candidate.contact.as_deref(), Some("912345678"));
        assert_eq!(candidate.locality.as_deref(), Some("Braga"));
        assert!(candidate.source.is_empty());
    }

    #[test]
    fn test_filter_matches() {
        let identity = RecipientId::parse("shop@x.pt").unwrap();
        let record = CanonicalRecord::from_candidate(
            CandidateRecord::new("dir", "Shop", "shop@x.pt", "Faro"),
            identity,
            Utc::now(),
        );

        assert!(RecordFilter::default().matches(&record));
        assert!(RecordFilter {
            locality: Some("faro".into()),
            ..Default::default()
        }
        .matches(&record));
        assert!(!RecordFilter {
            source: Some("maps".into()),
            ..Default::default()
        }
        .matches(&record));
    }
}
