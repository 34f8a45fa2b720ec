//! Key-value persistence used for the theme preference and membership counters
//!
//! Values are plain strings keyed by plain strings, the same shape as browser
//! local storage. `JsonFileStore` keeps the map in a single JSON file under the
//! user's data directory; `MemoryStore` is the in-process variant used by tests.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::constants;

/// Storage backend failure
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to {operation} store file: {path}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Store file is not a valid JSON string map: {path}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[cfg(test)]
    #[error("Store is unavailable: {0}")]
    Unavailable(String),
}

/// String key-value storage with "get with default" semantics
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;

    fn get_or(&self, key: &str, default: &str) -> Result<String, StoreError> {
        Ok(self.get(key)?.unwrap_or_else(|| default.to_string()))
    }
}

/// Store backed by a JSON object on disk, rewritten on every `set`
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl JsonFileStore {
    /// Default store location: `<data_dir>/forum-site/storage.json`
    pub fn default_path() -> PathBuf {
        let mut path = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(constants::config::APP_DIR);
        path.push(constants::storage::STORE_FILENAME);
        path
    }

    /// Open the store at `path`; a missing file is an empty store
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => BTreeMap::new(),
            Ok(contents) => serde_json::from_str(&contents).map_err(|source| StoreError::Format {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No store file found, starting empty");
                BTreeMap::new()
            }
            Err(source) => {
                return Err(StoreError::Io {
                    operation: "read",
                    path,
                    source,
                });
            }
        };

        info!(path = %path.display(), keys = entries.len(), "Opened key-value store");
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                operation: "create directory for",
                path: self.path.clone(),
                source,
            })?;
        }
        let contents = serde_json::to_string_pretty(&self.entries).map_err(|source| StoreError::Format {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, contents).map_err(|source| StoreError::Io {
            operation: "write",
            path: self.path.clone(),
            source,
        })
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let previous = self.entries.insert(key.to_string(), value.to_string());
        if let Err(e) = self.flush() {
            // Keep memory consistent with disk
            match previous {
                Some(old) => self.entries.insert(key.to_string(), old),
                None => self.entries.remove(key),
            };
            return Err(e);
        }
        debug!(key = %key, value = %value, "Persisted value");
        Ok(())
    }
}

/// In-memory store; reads and writes can be made to fail
#[cfg(test)]
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    pub entries: BTreeMap<String, String>,
    pub fail_reads: bool,
    pub fail_writes: bool,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        if self.fail_reads {
            return Err(StoreError::Unavailable(format!("read of '{key}' refused")));
        }
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Unavailable(format!("write of '{key}' refused")));
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_falls_back_to_default() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get_or("theme", "light").unwrap(), "light");

        store.set("theme", "dark").unwrap();
        assert_eq!(store.get_or("theme", "light").unwrap(), "dark");
    }

    #[test]
    fn test_memory_store_failures() {
        let mut store = MemoryStore {
            fail_writes: true,
            ..MemoryStore::default()
        };
        assert!(store.set("k", "v").is_err());
        assert!(store.entries.is_empty());

        store.fail_reads = true;
        assert!(matches!(store.get("k"), Err(StoreError::Unavailable(_))));
    }

    #[test]
    fn test_json_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("storage.json")).unwrap();
        assert_eq!(store.get("theme").unwrap(), None);
    }

    #[test]
    fn test_json_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");

        let mut store = JsonFileStore::open(&path).unwrap();
        store.set("membership_counter_YM", "101").unwrap();
        store.set("theme", "dark").unwrap();

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.get("membership_counter_YM").unwrap().as_deref(), Some("101"));
        assert_eq!(reopened.get("theme").unwrap().as_deref(), Some("dark"));
    }

    #[test]
    fn test_json_store_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        fs::write(&path, "[1, 2, 3]").unwrap();

        let result = JsonFileStore::open(&path);
        assert!(matches!(result, Err(StoreError::Format { .. })));
    }

    #[test]
    fn test_json_store_write_failure_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be makes every write fail
        let path = dir.path().join("storage.json");
        fs::create_dir_all(&path).unwrap();

        let mut store = JsonFileStore {
            path: path.clone(),
            entries: BTreeMap::new(),
        };
        assert!(store.set("theme", "dark").is_err());
        assert_eq!(store.get("theme").unwrap(), None);
    }
}
