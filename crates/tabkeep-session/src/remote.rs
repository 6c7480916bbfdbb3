//! Chunked snapshot copy in the quota-limited sync area
//!
//! The serialized document is split into pieces that each fit under the
//! per-item quota, stored as `snapshot_chunk_{i}`, plus one `snapshot_meta`
//! record describing how many pieces to read back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tabkeep_storage::{KeyValueStore, KvArea};
use tabkeep_tabs::Snapshot;

use crate::{Result, SessionError};

/// Bytes per chunk, leaving headroom under the 8 KiB per-item quota
pub const DEFAULT_CHUNK_SIZE: usize = 7500;

pub const REMOTE_VERSION: &str = "1.2";

const CHUNK_PREFIX: &str = "snapshot_chunk_";
const META_KEY: &str = "snapshot_meta";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteMeta {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub chunk_count: usize,
    pub version: String,
    /// Hex SHA-256 of the joined chunks; absent in older records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// Split `data` into pieces of at most `max_bytes` bytes without cutting a
/// UTF-8 sequence. Budgets under 4 bytes are raised to 4.
pub fn split_chunks(data: &str, max_bytes: usize) -> Vec<&str> {
    let max_bytes = max_bytes.max(4);
    let mut chunks = Vec::new();
    let mut rest = data;

    while !rest.is_empty() {
        let mut end = rest.len().min(max_bytes);
        while !rest.is_char_boundary(end) {
            end -= 1;
        }
        let (chunk, tail) = rest.split_at(end);
        chunks.push(chunk);
        rest = tail;
    }

    chunks
}

fn digest_hex(data: &str) -> String {
    Sha256::digest(data.as_bytes())
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

fn chunk_key(index: usize) -> String {
    format!("{}{}", CHUNK_PREFIX, index)
}

#[derive(Clone)]
pub struct RemoteSnapshotStore {
    area: KvArea,
    chunk_size: usize,
}

impl RemoteSnapshotStore {
    pub fn new(area: KvArea, chunk_size: usize) -> Self {
        Self { area, chunk_size }
    }

    /// Write `snapshot` as chunks plus metadata; returns the chunk count
    pub fn save(&self, snapshot: &Snapshot) -> Result<usize> {
        let data = snapshot.to_json()?;
        let chunks = split_chunks(&data, self.chunk_size);

        // A smaller document must not leave chunks of the previous one behind
        self.clear()?;

        let meta = RemoteMeta {
            timestamp: snapshot.timestamp,
            chunk_count: chunks.len(),
            version: REMOTE_VERSION.to_string(),
            digest: Some(digest_hex(&data)),
        };

        let mut items: Vec<(String, String)> = chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| (chunk_key(i), chunk.to_string()))
            .collect();
        items.push((META_KEY.to_string(), serde_json::to_string(&meta)?));

        self.area.set_many(&items)?;
        tracing::info!(chunks = chunks.len(), bytes = data.len(), "Synced snapshot to remote");
        Ok(chunks.len())
    }

    pub fn meta(&self) -> Result<Option<RemoteMeta>> {
        Ok(self.area.get_json(META_KEY)?)
    }

    /// Read back the stored snapshot; `None` when there is no metadata record
    pub fn load(&self) -> Result<Option<Snapshot>> {
        let Some(meta) = self.meta()? else {
            return Ok(None);
        };

        let mut data = String::new();
        for index in 0..meta.chunk_count {
            let chunk = self
                .area
                .get(&chunk_key(index))?
                .ok_or(SessionError::MissingChunk(index))?;
            data.push_str(&chunk);
        }

        if let Some(expected) = &meta.digest {
            if *expected != digest_hex(&data) {
                return Err(SessionError::DigestMismatch);
            }
        }

        Ok(Some(Snapshot::from_json(&data)?))
    }

    /// Remove every chunk and the metadata record; returns how many keys went
    pub fn clear(&self) -> Result<usize> {
        let stale: Vec<String> = self
            .area
            .keys()?
            .into_iter()
            .filter(|key| key.starts_with(CHUNK_PREFIX) || key == META_KEY)
            .collect();

        if !stale.is_empty() {
            self.area.remove_many(&stale)?;
            tracing::debug!(keys = stale.len(), "Cleared remote snapshot");
        }
        Ok(stale.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabkeep_storage::{Database, StorageArea};
    use tabkeep_tabs::{TabRecord, WindowRecord};

    fn store(db: &Database, chunk_size: usize) -> RemoteSnapshotStore {
        RemoteSnapshotStore::new(db.area(StorageArea::Sync), chunk_size)
    }

    fn snapshot(tabs: usize) -> Snapshot {
        Snapshot::new(
            vec![WindowRecord {
                id: 1,
                tabs: (0..tabs)
                    .map(|i| {
                        TabRecord::new(format!("https://site{}.com/page", i), format!("Page {}", i))
                            .with_description("Ünïcödé description text")
                    })
                    .collect(),
            }],
            Default::default(),
        )
    }

    #[test]
    fn test_split_respects_budget_and_boundaries() {
        let data = "aé€😀".repeat(50);
        for size in [1, 4, 5, 7, 64] {
            let chunks = split_chunks(&data, size);
            assert!(chunks.iter().all(|c| c.len() <= size.max(4)));
            assert_eq!(chunks.concat(), data);
        }
        assert!(split_chunks("", 10).is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let db = Database::open_in_memory().unwrap();
        let remote = store(&db, 500);
        let saved = snapshot(20);

        let chunks = remote.save(&saved).unwrap();
        assert!(chunks > 1);

        let meta = remote.meta().unwrap().unwrap();
        assert_eq!(meta.chunk_count, chunks);
        assert_eq!(meta.version, REMOTE_VERSION);
        assert_eq!(meta.timestamp, saved.timestamp);

        assert_eq!(remote.load().unwrap(), Some(saved));
    }

    #[test]
    fn test_resave_clears_leftover_chunks() {
        let db = Database::open_in_memory().unwrap();
        let remote = store(&db, 500);

        let big = remote.save(&snapshot(30)).unwrap();
        let small = remote.save(&snapshot(1)).unwrap();
        assert!(small < big);

        let keys = db.area(StorageArea::Sync).keys().unwrap();
        assert_eq!(keys.len(), small + 1);
        assert_eq!(remote.load().unwrap().unwrap().tab_count(), 1);
    }

    #[test]
    fn test_missing_chunk() {
        let db = Database::open_in_memory().unwrap();
        let remote = store(&db, 200);
        remote.save(&snapshot(5)).unwrap();

        db.area(StorageArea::Sync).remove("snapshot_chunk_1").unwrap();
        assert!(matches!(remote.load(), Err(SessionError::MissingChunk(1))));
    }

    #[test]
    fn test_corrupted_chunk() {
        let db = Database::open_in_memory().unwrap();
        let remote = store(&db, 200);
        remote.save(&snapshot(5)).unwrap();

        db.area(StorageArea::Sync).set("snapshot_chunk_0", "{\"x\":1").unwrap();
        assert!(matches!(remote.load(), Err(SessionError::DigestMismatch)));
    }

    #[test]
    fn test_no_meta_means_no_snapshot() {
        let db = Database::open_in_memory().unwrap();
        assert!(store(&db, 200).load().unwrap().is_none());
    }

    #[test]
    fn test_oversized_document_is_rejected_by_quota() {
        let db = Database::open_in_memory().unwrap();
        let remote = store(&db, DEFAULT_CHUNK_SIZE);
        let err = remote.save(&snapshot(2000)).unwrap_err();
        assert!(matches!(err, SessionError::Storage(_)));
    }
}
