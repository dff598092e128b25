//! Chunked values: keep every physical value under the per-key ceiling.
//!
//! A value longer than the chunk size is written as ordered parts under
//! `{key}:0`, `{key}:1`, … and a lead record `{"parts":N}` under `{key}`.
//! Readers always see the reassembled value.

use futures_util::future::try_join_all;
use serde::{Deserialize, Serialize};

use crate::store::{chunk_key, KvStore, StoreError, StoreResult};

/// Smallest usable chunk size (one UTF-8 scalar of any width).
pub const MIN_CHUNK_BYTES: usize = 4;

/// Lead record written in place of a split value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ChunkLead {
    parts: usize,
}

impl ChunkLead {
    fn parse(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }
}

/// Split `value` into pieces of at most `chunk_size` bytes on char boundaries.
fn split_chunks(value: &str, chunk_size: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut end = 0;
    for (idx, ch) in value.char_indices() {
        let next = idx + ch.len_utf8();
        if next - start > chunk_size {
            chunks.push(&value[start..end]);
            start = end;
        }
        end = next;
    }
    if start < value.len() {
        chunks.push(&value[start..]);
    }
    chunks
}

async fn previous_parts(store: &dyn KvStore, key: &str) -> StoreResult<usize> {
    Ok(store
        .get(key)
        .await?
        .and_then(|raw| ChunkLead::parse(&raw))
        .map(|lead| lead.parts)
        .unwrap_or(0))
}

async fn delete_parts(store: &dyn KvStore, key: &str, from: usize, to: usize) -> StoreResult<()> {
    for index in from..to {
        store.delete(&chunk_key(key, index)).await?;
    }
    Ok(())
}

/// Write `value` under `key`, splitting it when it exceeds `chunk_size`.
///
/// Returns the number of parts written (1 for an unsplit value). Parts are
/// written before the lead record; leftover parts of a previous, longer
/// value are removed last.
pub async fn write_chunked(
    store: &dyn KvStore,
    key: &str,
    value: &str,
    chunk_size: usize,
) -> StoreResult<usize> {
    let chunk_size = chunk_size.max(MIN_CHUNK_BYTES);
    let old_parts = previous_parts(store, key).await?;

    if value.len() <= chunk_size {
        store.put(key, value.to_string()).await?;
        delete_parts(store, key, 0, old_parts).await?;
        return Ok(1);
    }

    let chunks = split_chunks(value, chunk_size);
    for (index, chunk) in chunks.iter().enumerate() {
        store.put(&chunk_key(key, index), (*chunk).to_string()).await?;
    }
    let lead = serde_json::to_string(&ChunkLead { parts: chunks.len() })?;
    store.put(key, lead).await?;
    delete_parts(store, key, chunks.len(), old_parts).await?;

    tracing::debug!(key = %key, bytes = value.len(), parts = chunks.len(), "Wrote chunked value");
    Ok(chunks.len())
}

/// Read the value under `key`, reassembling it if it was split.
pub async fn read_chunked(store: &dyn KvStore, key: &str) -> StoreResult<Option<String>> {
    let Some(raw) = store.get(key).await? else {
        return Ok(None);
    };
    let Some(lead) = ChunkLead::parse(&raw) else {
        return Ok(Some(raw));
    };

    let reads = (0..lead.parts).map(|index| {
        let part_key = chunk_key(key, index);
        async move {
            store
                .get(&part_key)
                .await?
                .ok_or(StoreError::Corrupt(part_key))
        }
    });
    let parts = try_join_all(reads).await?;
    Ok(Some(parts.concat()))
}

/// Delete `key` and all of its parts.
pub async fn delete_chunked(store: &dyn KvStore, key: &str) -> StoreResult<()> {
    let parts = previous_parts(store, key).await?;
    store.delete(key).await?;
    delete_parts(store, key, 0, parts).await
}
