//! tabkeep Tab Model
//!
//! The snapshot document: windows, tabs and tab groups as they were at capture
//! time. Everything here is plain data plus pure helpers; talking to a browser
//! lives in `tabkeep-host`.

mod error;
mod group;
mod memory;
mod snapshot;
mod url_filter;

pub use error::TabError;
pub use group::{GroupColor, GroupMeta, GroupPayload, GroupSelector, UNGROUPED_TITLE};
pub use memory::{estimate_memory_mb, format_memory, memory_summary, MemoryProfile};
pub use snapshot::{GroupBucket, Partition, Snapshot, TabRecord, WindowRecord, NO_DESCRIPTION};
pub use url_filter::{is_privileged_url, PRIVILEGED_PREFIXES};

/// Browser-assigned identifiers; only meaningful within one browser session
pub type TabId = i64;
pub type WindowId = i64;
pub type GroupId = i64;

/// Group id the browser reports for ungrouped tabs
pub const NO_GROUP: GroupId = -1;

pub type Result<T> = std::result::Result<T, TabError>;
