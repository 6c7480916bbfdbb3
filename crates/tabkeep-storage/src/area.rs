//! Named key-value areas over the `kv_items` table
//!
//! `Local` is effectively unbounded. `Sync` mirrors a roaming store with a
//! hard per-item ceiling and a total ceiling; writes that would break either
//! are rejected as a whole.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};

use crate::database::Database;
use crate::{Result, StorageError};

/// Per-item ceiling of the sync area, measured as key bytes plus value bytes
pub const SYNC_QUOTA_BYTES_PER_ITEM: usize = 8192;

/// Total ceiling of the sync area
pub const SYNC_QUOTA_BYTES: usize = 102_400;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageArea {
    Local,
    Sync,
}

impl StorageArea {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageArea::Local => "local",
            StorageArea::Sync => "sync",
        }
    }

    fn item_limit(&self) -> Option<usize> {
        match self {
            StorageArea::Local => None,
            StorageArea::Sync => Some(SYNC_QUOTA_BYTES_PER_ITEM),
        }
    }

    fn total_limit(&self) -> Option<usize> {
        match self {
            StorageArea::Local => None,
            StorageArea::Sync => Some(SYNC_QUOTA_BYTES),
        }
    }
}

impl std::fmt::Display for StorageArea {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Key-value persistence with string values (serialized JSON by convention)
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set_many(&self, items: &[(String, String)]) -> Result<()>;

    fn remove_many(&self, keys: &[String]) -> Result<()>;

    fn keys(&self) -> Result<Vec<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.set_many(&[(key.to_string(), value.to_string())])
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.remove_many(&[key.to_string()])
    }

    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>>
    where
        Self: Sized,
    {
        match self.get(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()>
    where
        Self: Sized,
    {
        let raw = serde_json::to_string(value)?;
        self.set(key, &raw)
    }
}

#[derive(Clone)]
pub struct KvArea {
    db: Database,
    area: StorageArea,
}

impl KvArea {
    pub fn new(db: Database, area: StorageArea) -> Self {
        Self { db, area }
    }

    pub fn area(&self) -> StorageArea {
        self.area
    }

    /// Bytes currently held by the area, counted the same way quotas are
    pub fn bytes_in_use(&self) -> Result<usize> {
        self.db
            .with_connection(|conn| AreaTransaction::new(conn, self.area).bytes_in_use())
    }

    /// Run `f` against the area inside one write transaction.
    ///
    /// Reads made through the handle see a state no other writer can change
    /// before the transaction ends; an error from `f` rolls everything back.
    pub fn update<F, T, E>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&AreaTransaction<'_>) -> std::result::Result<T, E>,
        E: From<StorageError>,
    {
        let area = self.area;
        self.db
            .try_transaction(|conn| f(&AreaTransaction::new(conn, area)))
    }
}

/// One area seen from inside an open transaction
pub struct AreaTransaction<'a> {
    conn: &'a Connection,
    area: StorageArea,
}

impl<'a> AreaTransaction<'a> {
    fn new(conn: &'a Connection, area: StorageArea) -> Self {
        Self { conn, area }
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_items WHERE area = ?1 AND key = ?2",
                params![self.area.as_str(), key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Write `items`, enforcing both quotas of the area
    pub fn set_many(&self, items: &[(String, String)]) -> Result<()> {
        if let Some(limit) = self.area.item_limit() {
            for (key, value) in items {
                let size = key.len() + value.len();
                if size > limit {
                    return Err(StorageError::ItemQuotaExceeded {
                        key: key.clone(),
                        size,
                        limit,
                    });
                }
            }
        }

        let updated_at = Utc::now().to_rfc3339();
        for (key, value) in items {
            self.conn.execute(
                "INSERT OR REPLACE INTO kv_items (area, key, value, updated_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![self.area.as_str(), key, value, updated_at],
            )?;
        }

        if let Some(limit) = self.area.total_limit() {
            let used = self.bytes_in_use()?;
            if used > limit {
                // The caller's transaction is dropped on this error, rolling back the writes
                return Err(StorageError::AreaQuotaExceeded {
                    area: self.area.to_string(),
                    size: used,
                    limit,
                });
            }
        }

        Ok(())
    }

    pub fn remove_many(&self, keys: &[String]) -> Result<()> {
        for key in keys {
            self.conn.execute(
                "DELETE FROM kv_items WHERE area = ?1 AND key = ?2",
                params![self.area.as_str(), key],
            )?;
        }
        Ok(())
    }

    fn bytes_in_use(&self) -> Result<usize> {
        let used: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(LENGTH(CAST(key AS BLOB)) + LENGTH(CAST(value AS BLOB))), 0)
             FROM kv_items WHERE area = ?1",
            [self.area.as_str()],
            |row| row.get(0),
        )?;
        Ok(used.max(0) as usize)
    }
}

impl KeyValueStore for KvArea {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.db
            .with_connection(|conn| AreaTransaction::new(conn, self.area).get(key))
    }

    fn set_many(&self, items: &[(String, String)]) -> Result<()> {
        self.update(|tx| tx.set_many(items))?;
        tracing::debug!(area = %self.area, items = items.len(), "Stored items");
        Ok(())
    }

    fn remove_many(&self, keys: &[String]) -> Result<()> {
        self.update(|tx| tx.remove_many(keys))
    }

    fn keys(&self) -> Result<Vec<String>> {
        self.db.with_connection(|conn| {
            let mut stmt =
                conn.prepare("SELECT key FROM kv_items WHERE area = ?1 ORDER BY key")?;
            let keys = stmt
                .query_map([self.area.as_str()], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(keys)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Meta {
        count: u32,
    }

    #[test]
    fn test_areas_are_isolated() {
        let db = Database::open_in_memory().unwrap();
        let local = db.area(StorageArea::Local);
        let sync = db.area(StorageArea::Sync);

        local.set("lastSession", "{}").unwrap();
        assert_eq!(local.get("lastSession").unwrap().as_deref(), Some("{}"));
        assert_eq!(sync.get("lastSession").unwrap(), None);
        assert!(sync.keys().unwrap().is_empty());
    }

    #[test]
    fn test_json_helpers() {
        let db = Database::open_in_memory().unwrap();
        let local = db.area(StorageArea::Local);

        local.set_json("meta", &Meta { count: 3 }).unwrap();
        let meta: Option<Meta> = local.get_json("meta").unwrap();
        assert_eq!(meta, Some(Meta { count: 3 }));

        let missing: Option<Meta> = local.get_json("other").unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_remove_many_and_keys() {
        let db = Database::open_in_memory().unwrap();
        let local = db.area(StorageArea::Local);

        local
            .set_many(&[
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "2".to_string()),
                ("c".to_string(), "3".to_string()),
            ])
            .unwrap();
        local.remove_many(&["a".to_string(), "c".to_string()]).unwrap();

        assert_eq!(local.keys().unwrap(), vec!["b".to_string()]);
    }

    #[test]
    fn test_sync_item_quota() {
        let db = Database::open_in_memory().unwrap();
        let sync = db.area(StorageArea::Sync);

        let big = "x".repeat(SYNC_QUOTA_BYTES_PER_ITEM);
        let err = sync.set("k", &big).unwrap_err();
        assert!(matches!(err, StorageError::ItemQuotaExceeded { .. }));
        assert_eq!(sync.get("k").unwrap(), None);

        // Local has no such ceiling
        let local = db.area(StorageArea::Local);
        local.set("k", &big).unwrap();
    }

    #[test]
    fn test_sync_total_quota_rolls_back() {
        let db = Database::open_in_memory().unwrap();
        let sync = db.area(StorageArea::Sync);

        let value = "y".repeat(8000);
        let items: Vec<(String, String)> = (0..13)
            .map(|i| (format!("chunk_{}", i), value.clone()))
            .collect();

        let err = sync.set_many(&items).unwrap_err();
        assert!(matches!(err, StorageError::AreaQuotaExceeded { .. }));
        assert!(sync.keys().unwrap().is_empty());
        assert_eq!(sync.bytes_in_use().unwrap(), 0);
    }

    #[test]
    fn test_update_rolls_back_on_error() {
        let db = Database::open_in_memory().unwrap();
        let local = db.area(StorageArea::Local);
        local.set("revision", "1").unwrap();

        let result: Result<()> = local.update(|tx| {
            tx.set_many(&[("revision".to_string(), "2".to_string())])?;
            assert_eq!(tx.get("revision")?.as_deref(), Some("2"));
            Err(StorageError::AreaQuotaExceeded {
                area: "local".to_string(),
                size: 0,
                limit: 0,
            })
        });

        assert!(result.is_err());
        assert_eq!(local.get("revision").unwrap().as_deref(), Some("1"));
    }
}
