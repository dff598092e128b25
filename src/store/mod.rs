//! Route table store subsystem.
//!
//! # Data Flow
//! ```text
//! Registrar (deploy-time)
//!     → chunked.rs (split oversized values into {key}:{i} parts)
//!     → KvStore::put
//!
//! Dispatcher (request-time)
//!     → chunked.rs (read lead record, fetch parts concurrently)
//!     → KvStore::get
//! ```
//!
//! # Key Layout
//! - `{routerNs}:routes` → JSON array of `type,ns,host,path` strings, or `{"parts":N}`
//! - `{key}:{i}` → chunk `i` of a split value
//! - `{ns}:metadata` → route metadata JSON
//! - `{ns}:{path}` / `{ns}:assets` → site file markers and their index
//!
//! # Design Decisions
//! - The store interface is deliberately narrow (get/put/delete)
//! - Values are bounded per key; chunking is the caller's concern
//! - Missing keys are `Ok(None)`, never errors

pub mod chunked;
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::MemoryStore;

/// Errors returned by store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Value exceeds the per-key size ceiling.
    #[error("value for key '{key}' is {size} bytes, limit is {limit}")]
    ValueTooLarge { key: String, size: usize, limit: usize },

    /// Key exceeds the maximum key length.
    #[error("key '{key}' is {size} bytes, limit is {limit}")]
    KeyTooLarge { key: String, size: usize, limit: usize },

    /// Stored data is inconsistent (e.g. a chunk is missing).
    #[error("corrupt value for key '{0}'")]
    Corrupt(String),

    /// Backend is unreachable or refused the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// A capacity-limited key-value store holding route tables and metadata.
#[async_trait]
pub trait KvStore: Send + Sync + std::fmt::Debug {
    /// Read a value. Missing keys yield `Ok(None)`.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Insert or overwrite a value.
    async fn put(&self, key: &str, value: String) -> StoreResult<()>;

    /// Delete a value. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> StoreResult<()>;

    /// Largest value, in bytes, a single key may hold.
    fn max_value_bytes(&self) -> usize;
}

/// Key holding a router's route table.
pub fn routes_key(router_namespace: &str) -> String {
    format!("{router_namespace}:routes")
}

/// Key holding a route's metadata blob.
pub fn metadata_key(namespace: &str) -> String {
    format!("{namespace}:metadata")
}

/// Key holding one chunk of a split value.
pub fn chunk_key(key: &str, index: usize) -> String {
    format!("{key}:{index}")
}

/// Marker key for one static file of a site route.
pub fn asset_key(namespace: &str, path: &str) -> String {
    format!("{namespace}:{path}")
}

/// Key holding the list of a site's registered files.
pub fn asset_index_key(namespace: &str) -> String {
    format!("{namespace}:assets")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        assert_eq!(routes_key("abcd1234"), "abcd1234:routes");
        assert_eq!(chunk_key(&routes_key("abcd1234"), 2), "abcd1234:routes:2");
        assert_eq!(metadata_key("ns"), "ns:metadata");
        assert_eq!(asset_key("ns", "/index.html"), "ns:/index.html");
        assert_eq!(asset_index_key("ns"), "ns:assets");
    }

    #[test]
    fn test_error_display() {
        let err = StoreError::ValueTooLarge {
            key: "a".into(),
            size: 2048,
            limit: 1024,
        };
        assert!(err.to_string().contains("2048"));
        assert!(err.to_string().contains("1024"));
    }
}
