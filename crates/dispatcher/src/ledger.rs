//! DeliveryLedger - persisted per-recipient delivery state and daily quota
//!
//! The snapshot is one camelCase JSON document:
//!
//! ```json
//! {
//!   "sentIdentities": ["+351912345678"],
//!   "failedIdentities": [],
//!   "dailyCount": 1,
//!   "lastResetDate": "2024-05-01",
//!   "lastUpdated": "2024-05-01T09:30:00Z",
//!   "entries": [ ... ]
//! }
//! ```
//!
//! `entries` carries attempts, last error and variant; snapshots without it
//! are rebuilt from the identity lists.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use contracts::{DeliveryStatus, RecipientId};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::DispatchError;

/// Delivery state of one recipient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub identity: RecipientId,
    pub status: DeliveryStatus,
    /// Transport calls made for this recipient
    #[serde(default)]
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// Template variant used
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<usize>,
    pub updated_at: DateTime<Utc>,
}

/// Daily send counter view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyQuota {
    pub date: NaiveDate,
    pub count: u32,
    pub limit: u32,
}

impl DailyQuota {
    pub fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.count)
    }

    pub fn is_exhausted(&self) -> bool {
        self.count >= self.limit
    }
}

/// Ledger counts for reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSummary {
    pub sent: usize,
    pub failed: usize,
    pub pending: usize,
    pub quota: DailyQuota,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LedgerSnapshot {
    #[serde(default)]
    sent_identities: Vec<RecipientId>,
    #[serde(default)]
    failed_identities: Vec<RecipientId>,
    #[serde(default)]
    daily_count: u32,
    #[serde(default)]
    last_reset_date: Option<NaiveDate>,
    #[serde(default)]
    last_updated: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    entries: Vec<LedgerEntry>,
}

/// Delivery ledger
///
/// Single writer: one engine owns it for the duration of a run. Every
/// outcome is written through to disk immediately.
#[derive(Debug)]
pub struct DeliveryLedger {
    /// None = in-memory only
    path: Option<PathBuf>,
    entries: HashMap<RecipientId, LedgerEntry>,
    daily_count: u32,
    last_reset_date: Option<NaiveDate>,
    last_updated: Option<DateTime<Utc>>,
    limit: u32,
}

impl DeliveryLedger {
    /// Ledger that never touches disk
    pub fn in_memory(limit: u32) -> Self {
        Self {
            path: None,
            entries: HashMap::new(),
            daily_count: 0,
            last_reset_date: None,
            last_updated: None,
            limit,
        }
    }

    /// Load the snapshot at `path`
    ///
    /// A missing file yields an empty ledger. An unreadable or corrupt one
    /// is a `Persistence` error.
    pub fn load(path: impl Into<PathBuf>, limit: u32) -> Result<Self, DispatchError> {
        let path = path.into();
        let mut ledger = Self::in_memory(limit);

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(path = %path.display(), "no ledger snapshot, starting empty");
                ledger.path = Some(path);
                return Ok(ledger);
            }
            Err(e) => return Err(DispatchError::persistence(path, e.to_string())),
        };

        let snapshot: LedgerSnapshot = serde_json::from_str(&content)
            .map_err(|e| DispatchError::persistence(&path, format!("corrupt snapshot: {e}")))?;
        ledger.restore(snapshot);
        ledger.path = Some(path);

        info!(
            sent = ledger.count(DeliveryStatus::Sent),
            failed = ledger.count(DeliveryStatus::Failed),
            daily_count = ledger.daily_count,
            "ledger loaded"
        );
        Ok(ledger)
    }

    /// Copy of this ledger detached from disk
    pub fn detached(&self) -> Self {
        Self {
            path: None,
            entries: self.entries.clone(),
            daily_count: self.daily_count,
            last_reset_date: self.last_reset_date,
            last_updated: self.last_updated,
            limit: self.limit,
        }
    }

    fn restore(&mut self, snapshot: LedgerSnapshot) {
        let restored_at = snapshot.last_updated.unwrap_or_else(Utc::now);

        for entry in snapshot.entries {
            self.entries.insert(entry.identity.clone(), entry);
        }

        let listed = snapshot
            .sent_identities
            .into_iter()
            .map(|id| (id, DeliveryStatus::Sent))
            .chain(
                snapshot
                    .failed_identities
                    .into_iter()
                    .map(|id| (id, DeliveryStatus::Failed)),
            );
        for (identity, status) in listed {
            self.entries
                .entry(identity.clone())
                .or_insert_with(|| LedgerEntry {
                    identity,
                    status,
                    attempts: 0,
                    last_error: None,
                    variant: None,
                    updated_at: restored_at,
                });
        }

        self.daily_count = snapshot.daily_count;
        self.last_reset_date = snapshot.last_reset_date;
        self.last_updated = snapshot.last_updated;
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Change the daily limit; today's count is kept
    pub fn set_limit(&mut self, limit: u32) {
        self.limit = limit;
    }

    /// Status of `identity`; unknown recipients are `Pending`
    pub fn status(&self, identity: &str) -> DeliveryStatus {
        self.entries
            .get(identity)
            .map(|entry| entry.status)
            .unwrap_or_default()
    }

    pub fn entry(&self, identity: &str) -> Option<&LedgerEntry> {
        self.entries.get(identity)
    }

    /// Entries sorted by identity
    pub fn entries(&self) -> Vec<&LedgerEntry> {
        let mut entries: Vec<_> = self.entries.values().collect();
        entries.sort_by(|a, b| a.identity.as_str().cmp(b.identity.as_str()));
        entries
    }

    fn count(&self, status: DeliveryStatus) -> usize {
        self.entries.values().filter(|e| e.status == status).count()
    }

    /// Record the outcome for one recipient and persist
    ///
    /// The in-memory state is updated even when the write fails; the
    /// returned `Persistence` error is informational.
    pub fn record_outcome(
        &mut self,
        identity: &RecipientId,
        status: DeliveryStatus,
        attempts: u32,
        error: Option<String>,
        variant: Option<usize>,
    ) -> Result<(), DispatchError> {
        if let Some(existing) = self.entries.get(identity) {
            if existing.status.is_terminal() {
                return Err(DispatchError::TerminalStatus {
                    identity: identity.to_string(),
                    status: existing.status,
                });
            }
        }

        let now = Utc::now();
        self.entries.insert(
            identity.clone(),
            LedgerEntry {
                identity: identity.clone(),
                status,
                attempts,
                last_error: error,
                variant,
                updated_at: now,
            },
        );
        self.last_updated = Some(now);
        debug!(identity = %identity, status = %status, attempts, "ledger outcome recorded");

        self.persist()
    }

    /// Today's quota, rolling the counter over on a new date
    pub fn current_quota(&mut self, today: NaiveDate) -> DailyQuota {
        self.roll_over(today);
        DailyQuota {
            date: today,
            count: self.daily_count,
            limit: self.limit,
        }
    }

    /// Count one successful send against today's quota
    pub fn increment_quota(&mut self, today: NaiveDate) -> Result<DailyQuota, DispatchError> {
        self.roll_over(today);
        if self.daily_count >= self.limit {
            return Err(DispatchError::QuotaExceeded {
                date: today,
                limit: self.limit,
            });
        }

        self.daily_count += 1;
        observability::record_quota_used(self.daily_count, self.limit);
        Ok(DailyQuota {
            date: today,
            count: self.daily_count,
            limit: self.limit,
        })
    }

    fn roll_over(&mut self, today: NaiveDate) {
        if self.last_reset_date != Some(today) {
            if self.last_reset_date.is_some() {
                info!(
                    previous = ?self.last_reset_date,
                    today = %today,
                    previous_count = self.daily_count,
                    "daily quota reset"
                );
            }
            self.daily_count = 0;
            self.last_reset_date = Some(today);
        }
    }

    /// Counts and quota without mutating the ledger
    pub fn summary(&self, today: NaiveDate) -> LedgerSummary {
        let count = if self.last_reset_date == Some(today) {
            self.daily_count
        } else {
            0
        };
        LedgerSummary {
            sent: self.count(DeliveryStatus::Sent),
            failed: self.count(DeliveryStatus::Failed),
            pending: self.count(DeliveryStatus::Pending),
            quota: DailyQuota {
                date: today,
                count,
                limit: self.limit,
            },
            last_updated: self.last_updated,
        }
    }

    /// Forget every recipient and the quota, then persist
    pub fn clear(&mut self) -> Result<(), DispatchError> {
        let removed = self.entries.len();
        self.entries.clear();
        self.daily_count = 0;
        self.last_reset_date = None;
        self.last_updated = Some(Utc::now());
        info!(removed, "ledger cleared");
        self.persist()
    }

    /// Write the current state again
    pub fn flush(&self) -> Result<(), DispatchError> {
        self.persist()
    }

    fn snapshot(&self) -> LedgerSnapshot {
        let entries: Vec<LedgerEntry> = self.entries().into_iter().cloned().collect();
        let with_status = |status: DeliveryStatus| {
            entries
                .iter()
                .filter(|e| e.status == status)
                .map(|e| e.identity.clone())
                .collect::<Vec<_>>()
        };

        LedgerSnapshot {
            sent_identities: with_status(DeliveryStatus::Sent),
            failed_identities: with_status(DeliveryStatus::Failed),
            daily_count: self.daily_count,
            last_reset_date: self.last_reset_date,
            last_updated: self.last_updated,
            entries,
        }
    }

    fn persist(&self) -> Result<(), DispatchError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let result = serde_json::to_vec_pretty(&self.snapshot())
            .map_err(|e| e.to_string())
            .and_then(|json| write_atomic(path, &json).map_err(|e| e.to_string()));

        result.map_err(|message| {
            warn!(path = %path.display(), error = %message, "ledger persist failed");
            observability::record_ledger_persist_failure();
            DispatchError::persistence(path, message)
        })
    }
}

/// Write to `<path>.tmp`, then rename over `path`
fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
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
