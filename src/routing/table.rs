//! The route table: every registered entry of one router.

use crate::routing::entry::RouteEntry;
use crate::store::chunked::{read_chunked, write_chunked};
use crate::store::{routes_key, KvStore, StoreResult};

/// Ordered collection of route entries, replaced wholesale on update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    pub fn new(entries: Vec<RouteEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, namespace: &str) -> Option<&RouteEntry> {
        self.entries.iter().find(|e| e.namespace == namespace)
    }

    /// Insert `entry`, replacing any entry of the same namespace in place.
    pub fn upsert(&mut self, entry: RouteEntry) {
        match self.entries.iter_mut().find(|e| e.namespace == entry.namespace) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    /// Remove the entry of `namespace`, returning it if present.
    pub fn remove(&mut self, namespace: &str) -> Option<RouteEntry> {
        let idx = self.entries.iter().position(|e| e.namespace == namespace)?;
        Some(self.entries.remove(idx))
    }

    /// Encode as a JSON array of `type,namespace,host,path` strings.
    pub fn encode(&self) -> serde_json::Result<String> {
        let lines: Vec<String> = self.entries.iter().map(ToString::to_string).collect();
        serde_json::to_string(&lines)
    }

    /// Decode a stored table. Malformed entries are skipped.
    pub fn decode(raw: &str) -> serde_json::Result<Self> {
        let lines: Vec<String> = serde_json::from_str(raw)?;
        let entries = lines
            .iter()
            .filter_map(|line| match line.parse::<RouteEntry>() {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!(entry = %line, error = %e, "Skipping malformed route entry");
                    None
                }
            })
            .collect();
        Ok(Self { entries })
    }

    /// Read the table of `router_namespace`; a missing table is empty.
    pub async fn load(store: &dyn KvStore, router_namespace: &str) -> StoreResult<Self> {
        match read_chunked(store, &routes_key(router_namespace)).await? {
            Some(raw) => Ok(Self::decode(&raw)?),
            None => Ok(Self::default()),
        }
    }

    /// Write the table of `router_namespace`, chunking it if necessary.
    pub async fn save(
        &self,
        store: &dyn KvStore,
        router_namespace: &str,
        chunk_size: usize,
    ) -> StoreResult<usize> {
        let raw = self.encode()?;
        write_chunked(store, &routes_key(router_namespace), &raw, chunk_size).await
    }
}
