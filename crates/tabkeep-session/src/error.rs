//! Session error types

use tabkeep_tabs::WindowId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Browser error: {0}")]
    Host(#[from] tabkeep_host::HostError),

    #[error("Storage error: {0}")]
    Storage(#[from] tabkeep_storage::StorageError),

    #[error("Snapshot error: {0}")]
    Tab(#[from] tabkeep_tabs::TabError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Snapshot was modified concurrently (expected revision {expected}, found {actual})")]
    StaleRevision { expected: u64, actual: u64 },

    #[error("Remote sync is not available")]
    RemoteUnavailable,

    #[error("Missing chunk {0}")]
    MissingChunk(usize),

    #[error("Remote snapshot digest does not match its contents")]
    DigestMismatch,

    #[error("Could not open a window to restore into: {0}")]
    WindowUnavailable(String),

    #[error("Window {0} was closed during restore")]
    WindowLost(WindowId),
}
