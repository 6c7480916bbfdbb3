//! tabkeep Session Engine
//!
//! Capture, persistence and restoration of the single "last session":
//! - `SnapshotBuilder` turns live browser state into a `Snapshot`
//! - `SnapshotStore` keeps it locally and, when signed in, in the sync area
//! - `RestoreReconciler` diffs a snapshot against live tabs and recreates
//!   what is missing, regrouping the new tabs afterwards

mod builder;
mod describe;
mod error;
mod history;
mod plan;
mod policy;
mod reconciler;
mod remote;
mod repository;
mod store;

pub use builder::{BuilderOptions, SnapshotBuilder, UNNAMED_GROUP};
pub use describe::{describe_document, MAX_DESCRIPTION_CHARS};
pub use error::SessionError;
pub use history::{collect_history, favicon_candidates, HistorySite, HistorySnapshot};
pub use plan::{live_open_urls, PendingGroup, PlannedTab, RestorePlan};
pub use policy::{BatchPolicy, RestoreOptions, RestoreTimings, WindowPolicy};
pub use reconciler::{
    GroupRestoreReport, RestoreNotice, RestorePhase, RestoreReconciler, RestoreReport,
    RESTORED_GROUP,
};
pub use remote::{split_chunks, RemoteMeta, RemoteSnapshotStore, DEFAULT_CHUNK_SIZE, REMOTE_VERSION};
pub use repository::{SnapshotRepository, StoredSnapshot};
pub use store::{RemoteStatus, SaveReport, SnapshotStore};

pub type Result<T> = std::result::Result<T, SessionError>;
