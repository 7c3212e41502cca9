//! Validity filter applied before records become canonical

use std::collections::HashSet;
use std::fmt;

use contracts::{CandidateRecord, RecipientId};
use serde::Serialize;

/// Why a candidate was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// No contact field at all
    MissingIdentity,
    /// Contact present but not a phone number or e-mail
    InvalidIdentity,
    /// Locality outside the allowed region set
    RegionNotAllowed,
}

impl DropReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MissingIdentity => "missing_identity",
            Self::InvalidIdentity => "invalid_identity",
            Self::RegionNotAllowed => "region_not_allowed",
        }
    }
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rejected candidate kept for reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedRecord {
    pub record: CandidateRecord,
    pub reason: DropReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Filter verdict for one candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub reason: DropReason,
    pub detail: Option<String>,
}

impl Rejection {
    fn new(reason: DropReason, detail: Option<String>) -> Self {
        Self { reason, detail }
    }
}

/// Identity and region checks
#[derive(Debug, Clone, Default)]
pub struct RecordValidator {
    /// Lowercased allowed localities; empty accepts everything
    allowed_regions: HashSet<String>,
}

impl RecordValidator {
    pub fn new<I, S>(allowed_regions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed_regions: allowed_regions
                .into_iter()
                .map(|r| normalize_region(r.as_ref()))
                .filter(|r| !r.is_empty())
                .collect(),
        }
    }

    /// Validator without a region restriction
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Check a candidate, returning its parsed identity when usable
    pub fn check(&self, candidate: &CandidateRecord) -> Result<RecipientId, Rejection> {
        let raw = candidate
            .contact
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| Rejection::new(DropReason::MissingIdentity, None))?;

        let identity = RecipientId::parse(raw)
            .map_err(|e| Rejection::new(DropReason::InvalidIdentity, Some(e.to_string())))?;

        if !self.region_allowed(candidate.locality.as_deref()) {
            return Err(Rejection::new(
                DropReason::RegionNotAllowed,
                candidate.locality.clone(),
            ));
        }

        Ok(identity)
    }

    fn region_allowed(&self, locality: Option<&str>) -> bool {
        if self.allowed_regions.is_empty() {
            return true;
        }
        locality
            .map(normalize_region)
            .is_some_and(|l| self.allowed_regions.contains(&l))
    }
}

fn normalize_region(region: &str) -> String {
    region
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(contact: Option<&str>, locality: Option<&str>) -> CandidateRecord {
        CandidateRecord {
            name: Some("Shop".into()),
            contact: contact.map(Into::into),
            locality: locality.map(Into::into),
            source: "t".into(),
        }
    }

    #[test]
    fn test_missing_and_blank_identity() {
        let validator = RecordValidator::allow_all();
        for contact in [None, Some("   ")] {
            let rejection = validator.check(&candidate(contact, None)).unwrap_err();
            assert_eq!(rejection.reason, DropReason::MissingIdentity);
        }
    }

    #[test]
    fn test_invalid_identity_has_detail() {
        let rejection = RecordValidator::allow_all()
            .check(&candidate(Some("call me"), None))
            .unwrap_err();
        assert_eq!(rejection.reason, DropReason::InvalidIdentity);
        assert!(rejection.detail.is_some());
    }

    #[test]
    fn test_region_check_is_case_insensitive() {
        let validator = RecordValidator::new(["Lisboa", " porto "]);
        assert!(validator
            .check(&candidate(Some("+351912345678"), Some("LISBOA")))
            .is_ok());
        assert!(validator
            .check(&candidate(Some("+351912345678"), Some("Porto")))
            .is_ok());

        let rejection = validator
            .check(&candidate(Some("+351912345678"), Some("Faro")))
            .unwrap_err();
        assert_eq!(rejection.reason, DropReason::RegionNotAllowed);

        let rejection = validator
            .check(&candidate(Some("+351912345678"), None))
            .unwrap_err();
        assert_eq!(rejection.reason, DropReason::RegionNotAllowed);
    }

    #[test]
    fn test_empty_region_set_accepts_all() {
        let validator = RecordValidator::new(Vec::<String>::new());
        assert!(validator.check(&candidate(Some("a@b.pt"), None)).is_ok());
    }

    #[test]
    fn test_reason_labels() {
        assert_eq!(DropReason::RegionNotAllowed.to_string(), "region_not_allowed");
        assert_eq!(
            serde_json::to_string(&DropReason::MissingIdentity).unwrap(),
            "\"missing_identity\""
        );
    }
}
