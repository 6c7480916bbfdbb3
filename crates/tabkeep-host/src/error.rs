//! Host browser error types

use tabkeep_tabs::{GroupId, TabId, WindowId};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("Window not found: {0}")]
    WindowNotFound(WindowId),

    #[error("No current window")]
    NoCurrentWindow,

    #[error("Tab not found: {0}")]
    TabNotFound(TabId),

    #[error("Tab group not found: {0}")]
    GroupNotFound(GroupId),

    #[error("Not supported by this browser: {0}")]
    Unsupported(String),

    #[error("Page script failed in tab {tab}: {reason}")]
    ScriptFailed { tab: TabId, reason: String },

    #[error("Browser call failed: {0}")]
    Failed(String),
}
