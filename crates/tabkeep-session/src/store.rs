//! Snapshot Store: local slot plus optional remote copy

use tabkeep_storage::{Database, StorageArea};
use tabkeep_tabs::Snapshot;

use crate::remote::RemoteSnapshotStore;
use crate::repository::SnapshotRepository;
use crate::{Result, SessionError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteStatus {
    /// Not signed in, or sync turned off
    Disabled,
    Synced { chunks: usize },
    /// The local copy was written; the remote one was not
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
    pub revision: u64,
    pub remote: RemoteStatus,
}

#[derive(Clone)]
pub struct SnapshotStore {
    local: SnapshotRepository,
    remote: Option<RemoteSnapshotStore>,
}

impl SnapshotStore {
    pub fn new(db: &Database, remote_enabled: bool, chunk_size: usize) -> Self {
        let remote = remote_enabled
            .then(|| RemoteSnapshotStore::new(db.area(StorageArea::Sync), chunk_size));

        Self {
            local: SnapshotRepository::new(db.area(StorageArea::Local)),
            remote,
        }
    }

    pub fn repository(&self) -> &SnapshotRepository {
        &self.local
    }

    pub fn remote_enabled(&self) -> bool {
        self.remote.is_some()
    }

    /// Write locally, then try the remote copy. Only a local failure is an error.
    pub fn save(&self, snapshot: &Snapshot) -> Result<SaveReport> {
        let revision = self.local.put(snapshot)?;

        let remote = match &self.remote {
            None => RemoteStatus::Disabled,
            Some(remote) => match remote.save(snapshot) {
                Ok(chunks) => RemoteStatus::Synced { chunks },
                Err(e) => {
                    tracing::warn!(error = %e, "Remote sync failed, snapshot saved locally only");
                    RemoteStatus::Failed(e.to_string())
                }
            },
        };

        Ok(SaveReport { revision, remote })
    }

    pub fn load(&self) -> Result<Option<Snapshot>> {
        self.local.get()
    }

    pub fn load_remote(&self) -> Result<Option<Snapshot>> {
        match &self.remote {
            Some(remote) => remote.load(),
            None => Err(SessionError::RemoteUnavailable),
        }
    }

    /// True only when both copies exist and the remote one is strictly newer
    pub fn has_newer_remote(&self) -> bool {
        let Some(remote) = &self.remote else {
            return false;
        };

        match (remote.meta(), self.local.get()) {
            (Ok(Some(meta)), Ok(Some(local))) => meta.timestamp > local.timestamp,
            _ => false,
        }
    }

    /// The snapshot a restore should use: the remote copy when it is newer
    /// and readable, otherwise the local one
    pub fn load_preferred(&self) -> Result<Option<Snapshot>> {
        if self.has_newer_remote() {
            match self.load_remote() {
                Ok(Some(snapshot)) => {
                    tracing::info!(timestamp = %snapshot.timestamp, "Using newer remote snapshot");
                    return Ok(Some(snapshot));
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Remote snapshot unreadable, using local copy");
                }
            }
        }

        self.load()
    }
}
