//! In-process key-value store with per-key limits and JSON persistence.

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::StoreConfig;
use crate::store::{KvStore, StoreError, StoreResult};

/// A thread-safe key-value store backed by a `DashMap`.
///
/// Enforces the same per-key ceilings as the edge key-value service it
/// stands in for, so oversized writes fail here exactly as they would there.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    inner: Arc<DashMap<String, String>>,
    max_key_bytes: usize,
    max_value_bytes: usize,
    persistence_path: Option<PathBuf>,
}

impl MemoryStore {
    /// Create an empty store with explicit limits.
    pub fn new(max_key_bytes: usize, max_value_bytes: usize) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            max_key_bytes,
            max_value_bytes,
            persistence_path: None,
        }
    }

    /// Create a store from configuration, loading persisted entries if present.
    pub fn from_config(config: &StoreConfig) -> StoreResult<Self> {
        let mut store = Self::new(config.max_key_bytes, config.max_value_bytes);
        if let Some(path) = &config.persistence_path {
            store.persistence_path = Some(PathBuf::from(path));
            store.load()?;
        }
        Ok(store)
    }

    fn load(&self) -> StoreResult<()> {
        let Some(path) = &self.persistence_path else {
            return Ok(());
        };
        if !Path::new(path).exists() {
            return Ok(());
        }

        let reader = BufReader::new(File::open(path)?);
        let map: HashMap<String, String> = serde_json::from_reader(reader)?;
        for (k, v) in map {
            self.inner.insert(k, v);
        }
        tracing::info!(path = ?path, keys = self.inner.len(), "Loaded store snapshot");
        Ok(())
    }

    /// Write all entries to the persistence file, if one is configured.
    pub fn save(&self) -> StoreResult<()> {
        if let Some(path) = &self.persistence_path {
            let writer = BufWriter::new(File::create(path)?);
            let map: HashMap<_, _> = self
                .inner
                .iter()
                .map(|r| (r.key().clone(), r.value().clone()))
                .collect();
            serde_json::to_writer(writer, &map)?;
            tracing::info!(path = ?path, keys = map.len(), "Saved store snapshot");
        }
        Ok(())
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// All keys, sorted. Intended for diagnostics and tests.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.inner.iter().map(|r| r.key().clone()).collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.inner.get(key).map(|r| r.value().clone()))
    }

    async fn put(&self, key: &str, value: String) -> StoreResult<()> {
        if key.len() > self.max_key_bytes {
            return Err(StoreError::KeyTooLarge {
                key: key.to_string(),
                size: key.len(),
                limit: self.max_key_bytes,
            });
        }
        if value.len() > self.max_value_bytes {
            return Err(StoreError::ValueTooLarge {
                key: key.to_string(),
                size: value.len(),
                limit: self.max_value_bytes,
            });
        }
        self.inner.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.inner.remove(key);
        Ok(())
    }

    fn max_value_bytes(&self) -> usize {
        self.max_value_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_delete() {
        let store = MemoryStore::new(64, 16);
        assert!(store.get("k").await.unwrap().is_none());

        store.put("k", "v".into()).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));

        store.delete("k").await.unwrap();
        assert!(store.get("k").await.unwrap().is_none());
        // Deleting twice is fine
        store.delete("k").await.unwrap();
    }

    #[tokio::test]
    async fn test_limits_enforced() {
        let store = MemoryStore::new(4, 8);

        let err = store.put("k", "x".repeat(9)).await.unwrap_err();
        assert!(matches!(err, StoreError::ValueTooLarge { size: 9, limit: 8, .. }));

        let err = store.put("too-long", "x".into()).await.unwrap_err();
        assert!(matches!(err, StoreError::KeyTooLarge { .. }));

        store.put("k", "x".repeat(8)).await.unwrap();
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let config = StoreConfig {
            persistence_path: Some(path.to_string_lossy().into_owned()),
            ..StoreConfig::default()
        };

        let store = MemoryStore::from_config(&config).unwrap();
        assert!(store.is_empty());
        store.put("ns:metadata", "{}".into()).await.unwrap();
        store.save().unwrap();

        let loaded = MemoryStore::from_config(&config).unwrap();
        assert_eq!(loaded.keys(), vec!["ns:metadata".to_string()]);
    }
}
