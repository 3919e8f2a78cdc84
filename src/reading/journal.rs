//! Journal: bounded, newest-first history of readings under one storage key.
//!
//! DESIGN
//! ======
//! The stored value is a JSON array of [`Reading`]. Every append rewrites the
//! whole array:
//! 1. load, prepend the new reading, keep the newest [`JOURNAL_CAPACITY`]
//! 2. escape every text field of the new reading, drop its image
//! 3. write; on a quota failure write again with only the newest
//!    [`JOURNAL_FALLBACK_CAPACITY`]
//! 4. if that fails too, log and give up
//!
//! Nothing here returns an error to the caller. `load` on unreadable data is
//! an empty journal.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, error, warn};

use super::Reading;
use super::sanitize::escape_html;
use super::storage::{Storage, StorageError};

pub const JOURNAL_KEY: &str = "oracle-readings";
pub const JOURNAL_CAPACITY: usize = 20;
/// Capacity used for the single retry after a quota failure.
pub const JOURNAL_FALLBACK_CAPACITY: usize = 10;

/// How an append ended up on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved { entries: usize },
    /// First write hit the quota; the reduced journal was written.
    Reduced { entries: usize },
    /// Nothing was written.
    Dropped,
}

pub struct JournalStore {
    storage: Arc<dyn Storage>,
    key: String,
    write_lock: Mutex<()>,
}

impl JournalStore {
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self::with_key(storage, JOURNAL_KEY)
    }

    #[must_use]
    pub fn with_key(storage: Arc<dyn Storage>, key: impl Into<String>) -> Self {
        Self { storage, key: key.into(), write_lock: Mutex::new(()) }
    }

    /// Stored readings, newest first. Empty on any read or decode failure.
    #[must_use]
    pub fn load(&self) -> Vec<Reading> {
        match self.storage.get(&self.key) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(key = %self.key, error = %e, "journal: stored data unreadable, treating as empty");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(key = %self.key, code = e.error_code(), error = %e, "journal: load failed");
                Vec::new()
            }
        }
    }

    /// Prepend `reading`, bounded and sanitized.
    pub fn append(&self, reading: &Reading) -> SaveOutcome {
        let _lock = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut readings = self.load();
        readings.insert(0, sanitize_reading(reading));
        readings.truncate(JOURNAL_CAPACITY);

        match self.write(&readings) {
            Ok(()) => {
                debug!(id = %reading.id, entries = readings.len(), "journal: saved");
                return SaveOutcome::Saved { entries: readings.len() };
            }
            Err(e) if e.is_quota() => {
                warn!(error = %e, retry_entries = JOURNAL_FALLBACK_CAPACITY, "journal: quota exceeded, retrying smaller");
            }
            Err(e) => {
                error!(code = e.error_code(), error = %e, "journal: write failed, reading not persisted");
                return SaveOutcome::Dropped;
            }
        }

        readings.truncate(JOURNAL_FALLBACK_CAPACITY);
        match self.write(&readings) {
            Ok(()) => SaveOutcome::Reduced { entries: readings.len() },
            Err(e) => {
                error!(code = e.error_code(), error = %e, "journal: reduced write failed, reading not persisted");
                SaveOutcome::Dropped
            }
        }
    }

    /// Remove every stored reading.
    pub fn clear(&self) {
        let _lock = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = self.storage.remove(&self.key) {
            error!(code = e.error_code(), error = %e, "journal: clear failed");
        }
    }

    fn write(&self, readings: &[Reading]) -> Result<(), StorageError> {
        let raw = serde_json::to_string(readings).map_err(|e| StorageError::Io(e.into()))?;
        self.storage.set(&self.key, &raw)
    }
}

/// Persisted form of a reading: text escaped, image dropped.
#[must_use]
pub fn sanitize_reading(reading: &Reading) -> Reading {
    let mut clean = reading.clone();
    clean.image_url = None;
    for card in &mut clean.cards {
        card.name = escape_html(&card.name);
        card.description = escape_html(&card.description);
        card.message = escape_html(&card.message);
    }
    for message in clean.messages.iter_mut().flatten() {
        *message = escape_html(message);
    }
    clean
}

#[cfg(test)]
#[path = "journal_test.rs"]
mod tests;
