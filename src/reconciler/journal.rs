//! Submission journal and persistence.
//!
//! Remembers which requests already had a transaction accepted by the chain
//! whose status push has not landed yet, so the next cycle retries the push
//! instead of submitting a second transaction.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::blockchain::types::{Address, TxKind, TxReceipt};

/// Default age after which entries of vanished requests are dropped.
pub const DEFAULT_RETENTION_SECS: u64 = 86_400;

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// A transaction accepted for a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub kind: TxKind,
    pub target: Address,
    pub tx_hash: Option<String>,
    pub amount: u64,
    /// Seconds since epoch.
    pub submitted_at: u64,
}

impl JournalEntry {
    pub fn from_receipt(receipt: &TxReceipt, target: Address, amount: u64) -> Self {
        Self {
            kind: receipt.kind,
            target,
            tx_hash: receipt.hash.map(|h| h.to_hex()),
            amount,
            submitted_at: now_secs(),
        }
    }

    pub fn age_secs(&self) -> u64 {
        now_secs().saturating_sub(self.submitted_at)
    }
}

/// A thread-safe journal of submissions awaiting acknowledgement.
#[derive(Clone)]
pub struct SubmissionJournal {
    inner: Arc<DashMap<u64, JournalEntry>>,
    persistence_path: Option<PathBuf>,
    /// Held while writing the file; both loops share the temp file.
    save_lock: Arc<Mutex<()>>,
    retention_secs: u64,
}

impl SubmissionJournal {
    /// Create a new empty journal.
    pub fn new(persistence_path: Option<PathBuf>) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            persistence_path,
            save_lock: Arc::new(Mutex::new(())),
            retention_secs: DEFAULT_RETENTION_SECS,
        }
    }

    /// Keep entries of requests no longer listed for `retention_secs`.
    pub fn with_retention(mut self, retention_secs: u64) -> Self {
        self.retention_secs = retention_secs;
        self
    }

    /// Load from file if it exists; later changes are saved back to it.
    pub fn load_from_file(path: &Path) -> std::io::Result<Self> {
        let journal = Self::new(Some(path.to_path_buf()));
        if path.exists() {
            let reader = BufReader::new(File::open(path)?);
            let map: BTreeMap<u64, JournalEntry> = serde_json::from_reader(reader)?;

            for (id, entry) in map {
                journal.inner.insert(id, entry);
            }
            tracing::info!(
                path = %path.display(),
                entries = journal.inner.len(),
                "Loaded submission journal"
            );
        }
        Ok(journal)
    }

    /// Save to file.
    ///
    /// Writes a sibling temp file first and renames it over the journal.
    pub fn save_to_file(&self) -> std::io::Result<()> {
        let Some(path) = &self.persistence_path else {
            return Ok(());
        };

        let _guard = self.save_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let map: BTreeMap<u64, JournalEntry> = self
            .inner
            .iter()
            .map(|r| (*r.key(), r.value().clone()))
            .collect();

        let tmp = path.with_extension("tmp");
        {
            let writer = BufWriter::new(File::create(&tmp)?);
            serde_json::to_writer_pretty(writer, &map)?;
        }
        std::fs::rename(&tmp, path)?;

        tracing::debug!(entries = map.len(), "Saved submission journal");
        Ok(())
    }

    fn persist(&self) {
        if let Err(e) = self.save_to_file() {
            tracing::warn!(error = %e, "Failed to save submission journal");
        }
    }

    /// Remember an accepted transaction for `id`.
    pub fn record(&self, id: u64, entry: JournalEntry) {
        self.inner.insert(id, entry);
        self.persist();
    }

    /// Forget `id` once its status push landed.
    pub fn remove(&self, id: u64) -> Option<JournalEntry> {
        let removed = self.inner.remove(&id).map(|(_, entry)| entry);
        if removed.is_some() {
            self.persist();
        }
        removed
    }

    /// Forget `id` only if its entry is of `kind`.
    pub fn remove_kind(&self, id: u64, kind: TxKind) -> Option<JournalEntry> {
        let removed = self
            .inner
            .remove_if(&id, |_, entry| entry.kind == kind)
            .map(|(_, entry)| entry);
        if removed.is_some() {
            self.persist();
        }
        removed
    }

    /// Drop `kind` entries older than the retention whose request `listed`
    /// no longer reports. Returns how many were dropped.
    pub fn expire(&self, kind: TxKind, listed: impl Fn(u64) -> bool) -> usize {
        let before = self.inner.len();
        self.inner.retain(|id, entry| {
            entry.kind != kind || listed(*id) || entry.age_secs() < self.retention_secs
        });
        let expired = before.saturating_sub(self.inner.len());
        if expired > 0 {
            tracing::info!(kind = %kind, expired, "Expired stale journal entries");
            self.persist();
        }
        expired
    }

    pub fn get(&self, id: u64) -> Option<JournalEntry> {
        self.inner.get(&id).map(|r| r.value().clone())
    }

    /// Entry for `id` of `kind`, if any.
    pub fn get_kind(&self, id: u64, kind: TxKind) -> Option<JournalEntry> {
        self.get(id).filter(|e| e.kind == kind)
    }

    /// Whether `id` has a `kind` submission younger than `max_age_secs`.
    pub fn has_recent(&self, id: u64, kind: TxKind, max_age_secs: u64) -> bool {
        self.get_kind(id, kind)
            .is_some_and(|e| e.age_secs() < max_age_secs)
    }

    pub fn count(&self) -> usize {
        self.inner.len()
    }

    /// All entries ordered by request id.
    pub fn entries(&self) -> Vec<(u64, JournalEntry)> {
        let mut entries: Vec<_> = self
            .inner
            .iter()
            .map(|r| (*r.key(), r.value().clone()))
            .collect();
        entries.sort_by_key(|(id, _)| *id);
        entries
    }
}

impl std::fmt::Debug for SubmissionJournal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmissionJournal")
            .field("entries", &self.inner.len())
            .field("persistence_path", &self.persistence_path)
            .field("retention_secs", &self.retention_secs)
            .finish()
    }
}
