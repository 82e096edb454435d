//! Durable record storage behind the session and profile stores.
//!
//! Persistence is keyed by fixed record names and opaque to everything except
//! the stores that own each record. `FileStorage` writes JSON blobs under a
//! data directory; `MemoryStorage` is the injectable fake used in tests.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};

/// Fixed name of the conversation-log record.
pub const HISTORY_RECORD: &str = "chat_history";
/// Fixed name of the identity record.
pub const PROFILE_RECORD: &str = "user_profile";

/// Capability to read, write, and remove named durable records.
pub trait Storage: Send + Sync {
    /// Read a record's bytes; `Ok(None)` when the record does not exist.
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>>;
    /// Write a record, replacing any previous contents.
    fn write(&self, key: &str, bytes: &[u8]) -> Result<()>;
    /// Remove a record entirely; removing a missing record is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

// === File-backed storage ===

/// Stores each record as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn record_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl Storage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.record_path(key);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create directory: {}", self.dir.display()))?;
        let path = self.record_path(key);
        std::fs::write(&path, bytes).with_context(|| format!("Failed to write {}", path.display()))
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.record_path(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
        }
    }
}

// === In-memory storage ===

/// Map-backed storage for tests. Clones share the same underlying map so a
/// test can inspect what the engine persisted.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    records: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let records = self
            .records
            .lock()
            .map_err(|_| anyhow::anyhow!("storage lock poisoned"))?;
        Ok(records.get(key).cloned())
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| anyhow::anyhow!("storage lock poisoned"))?;
        records.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| anyhow::anyhow!("storage lock poisoned"))?;
        records.remove(key);
        Ok(())
    }
}
