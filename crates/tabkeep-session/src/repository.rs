//! Single-slot snapshot repository
//!
//! The "last session" lives under one key of the local area, next to its
//! rendered page and a revision counter. Writers that read a revision and
//! write back later use `put_if_revision` so a concurrent save is not lost.
//! The revision check and the write share one storage transaction, so the
//! guard holds between separate repositories and separate processes.

use serde::{de::DeserializeOwned, Serialize};
use tabkeep_storage::{AreaTransaction, KeyValueStore, KvArea};
use tabkeep_tabs::Snapshot;

use crate::{Result, SessionError};

const LAST_SESSION_KEY: &str = "lastSession";
const REVISION_KEY: &str = "lastSessionRevision";
const SNAPSHOT_HTML_KEY: &str = "snapshotHtml";
const HISTORY_KEY: &str = "historySnapshot";
const HISTORY_HTML_KEY: &str = "historySnapshotHtml";

/// A stored snapshot together with the revision it was read at
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSnapshot {
    pub snapshot: Snapshot,
    pub revision: u64,
}

#[derive(Clone)]
pub struct SnapshotRepository {
    area: KvArea,
}

impl SnapshotRepository {
    pub fn new(area: KvArea) -> Self {
        Self { area }
    }

    pub fn get(&self) -> Result<Option<Snapshot>> {
        match self.area.get(LAST_SESSION_KEY)? {
            Some(raw) => Ok(Some(Snapshot::from_json(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn get_with_revision(&self) -> Result<Option<StoredSnapshot>> {
        self.area.update(|tx| -> Result<Option<StoredSnapshot>> {
            let revision = read_revision(tx)?;
            match tx.get(LAST_SESSION_KEY)? {
                Some(raw) => Ok(Some(StoredSnapshot {
                    snapshot: Snapshot::from_json(&raw)?,
                    revision,
                })),
                None => Ok(None),
            }
        })
    }

    pub fn revision(&self) -> Result<u64> {
        Ok(self.area.get_json::<u64>(REVISION_KEY)?.unwrap_or(0))
    }

    /// Replace the slot unconditionally; returns the new revision
    pub fn put(&self, snapshot: &Snapshot) -> Result<u64> {
        let raw = snapshot.to_json()?;
        let next = self.area.update(|tx| -> Result<u64> {
            let next = read_revision(tx)? + 1;
            write(tx, &raw, next)?;
            Ok(next)
        })?;
        tracing::debug!(revision = next, tabs = snapshot.tab_count(), "Stored snapshot");
        Ok(next)
    }

    /// Replace the slot only if nobody wrote it since `expected` was read
    pub fn put_if_revision(&self, snapshot: &Snapshot, expected: u64) -> Result<u64> {
        let raw = snapshot.to_json()?;
        let next = self.area.update(|tx| -> Result<u64> {
            let actual = read_revision(tx)?;
            if actual != expected {
                return Err(SessionError::StaleRevision { expected, actual });
            }
            let next = actual + 1;
            write(tx, &raw, next)?;
            Ok(next)
        })?;
        tracing::debug!(revision = next, tabs = snapshot.tab_count(), "Stored snapshot");
        Ok(next)
    }

    /// Remove every tab with `url` from the stored snapshot.
    ///
    /// Returns the updated snapshot when something was removed, `None` when
    /// there is no snapshot or no tab matched.
    pub fn delete_tab(&self, url: &str) -> Result<Option<Snapshot>> {
        let Some(StoredSnapshot {
            mut snapshot,
            revision,
        }) = self.get_with_revision()?
        else {
            return Ok(None);
        };

        let removed = snapshot.remove_tab(url);
        if removed == 0 {
            tracing::debug!(url, "Tab not in stored snapshot");
            return Ok(None);
        }

        self.put_if_revision(&snapshot, revision)?;
        tracing::info!(url, removed, remaining = snapshot.tab_count(), "Deleted tab from snapshot");
        Ok(Some(snapshot))
    }

    pub fn page(&self) -> Result<Option<String>> {
        Ok(self.area.get(SNAPSHOT_HTML_KEY)?)
    }

    pub fn put_page(&self, html: &str) -> Result<()> {
        Ok(self.area.set(SNAPSHOT_HTML_KEY, html)?)
    }

    pub fn history<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        Ok(self.area.get_json(HISTORY_KEY)?)
    }

    pub fn put_history<T: Serialize>(&self, history: &T, html: &str) -> Result<()> {
        let raw = serde_json::to_string(history)?;
        self.area.set_many(&[
            (HISTORY_KEY.to_string(), raw),
            (HISTORY_HTML_KEY.to_string(), html.to_string()),
        ])?;
        Ok(())
    }

    pub fn history_page(&self) -> Result<Option<String>> {
        Ok(self.area.get(HISTORY_HTML_KEY)?)
    }
}

fn read_revision(tx: &AreaTransaction<'_>) -> Result<u64> {
    Ok(tx.get_json::<u64>(REVISION_KEY)?.unwrap_or(0))
}

fn write(tx: &AreaTransaction<'_>, raw: &str, revision: u64) -> Result<()> {
    tx.set_many(&[
        (LAST_SESSION_KEY.to_string(), raw.to_string()),
        (REVISION_KEY.to_string(), revision.to_string()),
    ])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabkeep_storage::{Database, StorageArea};
    use tabkeep_tabs::{GroupColor, GroupMeta, TabRecord, WindowRecord};

    fn repository() -> SnapshotRepository {
        let db = Database::open_in_memory().unwrap();
        SnapshotRepository::new(db.area(StorageArea::Local))
    }

    fn snapshot(urls: &[&str]) -> Snapshot {
        let mut groups = std::collections::BTreeMap::new();
        groups.insert(3, GroupMeta::new("Work", GroupColor::Green));
        Snapshot::new(
            vec![WindowRecord {
                id: 1,
                tabs: urls
                    .iter()
                    .map(|u| TabRecord::new(*u, *u).with_group(3))
                    .collect(),
            }],
            groups,
        )
    }

    #[test]
    fn test_empty_slot() {
        let repo = repository();
        assert!(repo.get().unwrap().is_none());
        assert_eq!(repo.revision().unwrap(), 0);
        assert!(repo.delete_tab("https://a.com").unwrap().is_none());
    }

    #[test]
    fn test_put_and_get() {
        let repo = repository();
        let saved = snapshot(&["https://a.com", "https://b.com"]);

        assert_eq!(repo.put(&saved).unwrap(), 1);
        assert_eq!(repo.get().unwrap(), Some(saved.clone()));

        assert_eq!(repo.put(&saved).unwrap(), 2);
        let stored = repo.get_with_revision().unwrap().unwrap();
        assert_eq!(stored.revision, 2);
    }

    #[test]
    fn test_stale_writer_is_rejected() {
        let repo = repository();
        repo.put(&snapshot(&["https://a.com"])).unwrap();

        let stored = repo.get_with_revision().unwrap().unwrap();
        repo.put(&snapshot(&["https://b.com"])).unwrap();

        let err = repo.put_if_revision(&stored.snapshot, stored.revision).unwrap_err();
        assert!(matches!(err, SessionError::StaleRevision { expected: 1, actual: 2 }));
        assert_eq!(repo.get().unwrap().unwrap().windows[0].tabs[0].url, "https://b.com");
    }

    #[test]
    fn test_delete_tab() {
        let repo = repository();
        repo.put(&snapshot(&["https://a.com", "https://b.com"])).unwrap();

        assert!(repo.delete_tab("https://zzz.com").unwrap().is_none());
        assert_eq!(repo.revision().unwrap(), 1);

        let updated = repo.delete_tab("https://a.com").unwrap().unwrap();
        assert_eq!(updated.tab_count(), 1);
        assert_eq!(repo.get().unwrap(), Some(updated));
        assert_eq!(repo.revision().unwrap(), 2);

        let emptied = repo.delete_tab("https://b.com").unwrap().unwrap();
        assert!(emptied.windows.is_empty());
        assert!(emptied.groups.is_empty());
    }

    #[test]
    fn test_pages() {
        let repo = repository();
        assert!(repo.page().unwrap().is_none());
        repo.put_page("<html></html>").unwrap();
        assert_eq!(repo.page().unwrap().as_deref(), Some("<html></html>"));

        repo.put_history(&vec!["https://a.com"], "<html>history</html>").unwrap();
        let history: Vec<String> = repo.history().unwrap().unwrap();
        assert_eq!(history, vec!["https://a.com".to_string()]);
        assert_eq!(repo.history_page().unwrap().as_deref(), Some("<html>history</html>"));
    }

    #[test]
    fn test_stale_writer_rejected_across_connections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tabkeep.db");
        let keeper = SnapshotRepository::new(Database::open(&path).unwrap().area(StorageArea::Local));
        let cli = SnapshotRepository::new(Database::open(&path).unwrap().area(StorageArea::Local));

        keeper.put(&snapshot(&["https://a.com"])).unwrap();
        let seen = cli.get_with_revision().unwrap().unwrap();
        keeper.put(&snapshot(&["https://b.com"])).unwrap();

        let err = cli.put_if_revision(&seen.snapshot, seen.revision).unwrap_err();
        assert!(matches!(err, SessionError::StaleRevision { expected: 1, actual: 2 }));
        assert_eq!(keeper.get().unwrap().unwrap().windows[0].tabs[0].url, "https://b.com");
    }

    #[test]
    fn test_concurrent_writers_never_share_a_revision() {
        let db = Database::open_in_memory().unwrap();
        let writers: Vec<_> = (0..2)
            .map(|_| {
                let repo = SnapshotRepository::new(db.area(StorageArea::Local));
                std::thread::spawn(move || {
                    let saved = snapshot(&["https://a.com"]);
                    let mut accepted = 0u64;
                    for _ in 0..500 {
                        let revision = repo.revision().unwrap();
                        match repo.put_if_revision(&saved, revision) {
                            Ok(_) => accepted += 1,
                            Err(SessionError::StaleRevision { .. }) => {}
                            Err(e) => panic!("unexpected error: {}", e),
                        }
                    }
                    accepted
                })
            })
            .collect();

        let accepted: u64 = writers.into_iter().map(|w| w.join().unwrap()).sum();
        let repo = SnapshotRepository::new(db.area(StorageArea::Local));
        assert_eq!(repo.revision().unwrap(), accepted);
    }
}
