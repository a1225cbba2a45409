//! Key-value persistence for tracker state and sync snapshots.
//!
//! Values are JSON documents keyed by string. The file store keeps one file
//! per key and writes atomically (write to `.tmp`, then rename into place), so
//! a crash mid-write never leaves a half-written value behind. Reads go
//! through a `DashMap` mirror and only touch disk on first access.

use std::path::PathBuf;
use std::sync::Arc;

use common::Error;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

pub const FROST_TRACKER_KEY: &str = "frost_tracker";
pub const LAST_SYNC_KEY: &str = "last_sync";
pub const LAST_RSI_KEY: &str = "last_rsi";
pub const LAST_SNAPSHOT_KEY: &str = "last_snapshot";

/// String-keyed JSON store with single-key atomicity.
pub trait StateStore {
    fn get_value(&self, key: &str) -> Result<Option<Value>, Error>;
    fn set_value(&self, key: &str, value: Value) -> Result<(), Error>;

    fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, Error> {
        match self.get_value(key)? {
            Some(v) => serde_json::from_value(v)
                .map(Some)
                .map_err(|e| Error::Store(format!("{key}: {e}"))),
            None => Ok(None),
        }
    }

    fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), Error> {
        let v = serde_json::to_value(value)?;
        self.set_value(key, v)
    }
}

/// In-memory store, used by one-shot commands and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: Arc<DashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn get_value(&self, key: &str) -> Result<Option<Value>, Error> {
        Ok(self.values.get(key).map(|v| v.clone()))
    }

    fn set_value(&self, key: &str, value: Value) -> Result<(), Error> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }
}

/// Directory-backed store: `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    cache: Arc<DashMap<String, Value>>,
}

impl FileStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, Error> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            cache: Arc::new(DashMap::new()),
        })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, Error> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(Error::Store(format!("invalid key: {key:?}")));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl StateStore for FileStore {
    fn get_value(&self, key: &str) -> Result<Option<Value>, Error> {
        if let Some(v) = self.cache.get(key) {
            return Ok(Some(v.clone()));
        }

        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&path)?;
        let value: Value = serde_json::from_str(&raw)
            .map_err(|e| Error::Store(format!("corrupt value at {}: {e}", path.display())))?;
        self.cache.insert(key.to_string(), value.clone());
        Ok(Some(value))
    }

    fn set_value(&self, key: &str, value: Value) -> Result<(), Error> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(&value)?)?;
        std::fs::rename(&tmp, &path)?;
        debug!("persisted {} to {}", key, path.display());
        self.cache.insert(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        seconds: u64,
        label: String,
    }

    #[test]
    fn test_memory_store_typed_access() {
        let store = MemoryStore::new();
        assert_eq!(store.get::<Sample>("missing").unwrap(), None);

        let sample = Sample {
            seconds: 42,
            label: "x".into(),
        };
        store.set("sample", &sample).unwrap();
        assert_eq!(store.get::<Sample>("sample").unwrap(), Some(sample));
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let temp_dir = tempfile::tempdir().unwrap();
        {
            let store = FileStore::open(temp_dir.path()).unwrap();
            store.set(LAST_RSI_KEY, &63.0_f64).unwrap();
        }

        let reopened = FileStore::open(temp_dir.path()).unwrap();
        assert_eq!(reopened.get::<f64>(LAST_RSI_KEY).unwrap(), Some(63.0));
        assert!(!temp_dir.path().join("last_rsi.json.tmp").exists());
    }

    #[test]
    fn test_file_store_rejects_path_keys() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();
        assert!(store.set("../escape", &1).is_err());
        assert!(store.get::<u64>("").is_err());
    }

    #[test]
    fn test_file_store_reports_corrupt_value() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::write(temp_dir.path().join("last_sync.json"), "{not json").unwrap();

        let store = FileStore::open(temp_dir.path()).unwrap();
        assert!(store.get_value(LAST_SYNC_KEY).is_err());
    }
}
