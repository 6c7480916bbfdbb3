//! tabkeep Core
//!
//! Coordination layer: one `Keeper` per browser profile turns UI requests,
//! keyboard shortcuts and window events into snapshot capture, restore and
//! page rendering.

mod config;
mod debounce;
mod error;
mod keeper;
mod message;

pub use config::Config;
pub use debounce::Debouncer;
pub use error::CoreError;
pub use keeper::{Keeper, KeeperTimings, HISTORY_PAGE, SNAPSHOT_PAGE};
pub use message::{
    Ack, CloseReport, DeleteReport, GroupRestoreResponse, HomepageInstruction, Request, Response,
    RestoreResponse, Shortcut,
};

// Re-export the layers below
pub use tabkeep_host::{BrowserHost, HostError};
pub use tabkeep_render::{fallback_page, render_history, render_snapshot, LiveSummary};
pub use tabkeep_session::{
    BatchPolicy, RemoteStatus, SaveReport, SessionError, SnapshotRepository, SnapshotStore,
    WindowPolicy,
};
pub use tabkeep_storage::{Database, StorageError};
pub use tabkeep_tabs::{GroupSelector, Snapshot, TabError, TabRecord, WindowRecord};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(true).init();
}
