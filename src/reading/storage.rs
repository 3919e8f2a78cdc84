//! Key-value storage substrate under the journal.
//!
//! DESIGN
//! ======
//! Synchronous get/set/remove of string values with explicit error returns.
//! Both implementations can enforce a byte quota across all keys, so a
//! write that would overflow it fails with [`StorageError::QuotaExceeded`]
//! and leaves the previous value intact.
//!
//! `FileStorage` keeps one `<key>.json` file per key and writes through a
//! temporary sibling followed by a rename.

use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write as IoWrite};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage quota exceeded: {needed} bytes needed, {quota} allowed")]
    QuotaExceeded { needed: usize, quota: usize },
    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::QuotaExceeded { .. } => "E_STORAGE_QUOTA",
            Self::InvalidKey(_) => "E_STORAGE_KEY",
            Self::Io(_) => "E_STORAGE_IO",
        }
    }

    #[must_use]
    pub fn is_quota(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }
}

pub trait Storage: Send + Sync {
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the underlying read fails.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// # Errors
    ///
    /// Returns [`StorageError::QuotaExceeded`] when the write would not fit.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns a [`StorageError`] if the underlying delete fails.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

fn check_quota(quota: Option<usize>, others: usize, incoming: usize) -> Result<(), StorageError> {
    match quota {
        Some(quota) if others + incoming > quota => {
            Err(StorageError::QuotaExceeded { needed: others + incoming, quota })
        }
        _ => Ok(()),
    }
}

// =============================================================================
// MEMORY
// =============================================================================

/// In-process storage. Usage counts key plus value bytes.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_quota(quota: usize) -> Self {
        Self { entries: Mutex::default(), quota: Some(quota) }
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let others: usize = entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum();
        check_quota(self.quota, others, key.len() + value.len())?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

// =============================================================================
// FILE
// =============================================================================

/// Directory-backed storage. Usage counts value bytes on disk.
pub struct FileStorage {
    dir: PathBuf,
    quota: Option<usize>,
    write_lock: Mutex<()>,
}

impl FileStorage {
    /// Open (and create if needed) a storage directory.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, quota: None, write_lock: Mutex::new(()) })
    }

    #[must_use]
    pub fn with_quota(mut self, quota: usize) -> Self {
        self.quota = Some(quota);
        self
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !key.starts_with('.');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }

    fn usage_excluding(&self, skip: &Path) -> Result<usize, StorageError> {
        let mut total = 0usize;
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path == skip || path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            total += usize::try_from(entry.metadata()?.len()).unwrap_or(usize::MAX);
        }
        Ok(total)
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let _lock = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        check_quota(self.quota, self.usage_excluding(&path)?, value.len())?;

        let tmp = self.dir.join(format!(".{key}.json.tmp"));
        write_then_rename(&tmp, &path, value).inspect_err(|_| {
            let _ = fs::remove_file(&tmp);
        })?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let _lock = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn write_then_rename(tmp: &Path, path: &Path, value: &str) -> std::io::Result<()> {
    let mut file = fs::File::create(tmp)?;
    file.write_all(value.as_bytes())?;
    file.sync_all()?;
    drop(file);
    fs::rename(tmp, path)
}

#[cfg(test)]
#[path = "storage_test.rs"]
mod tests;
