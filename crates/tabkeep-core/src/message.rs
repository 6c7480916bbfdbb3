//! Requests from the extension UI and the responses sent back
//!
//! Wire names follow the page script: `{"action": "restoreSnapshot", "mode": "fast"}`.

use serde::{Deserialize, Serialize};
use tabkeep_session::BatchPolicy;
use tabkeep_tabs::{GroupSelector, WindowId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    SaveSession,
    OpenSnapshot,
    RestoreSnapshot {
        #[serde(default, rename = "mode")]
        policy: Option<BatchPolicy>,
    },
    #[serde(rename = "saveAndCloseAllTabs")]
    SaveAndCloseWindow {
        #[serde(default, rename = "windowId")]
        window: Option<WindowId>,
    },
    RestoreGroup {
        #[serde(rename = "groupId")]
        selector: GroupSelector,
    },
    DeleteTab {
        url: String,
    },
    #[serde(rename = "generateSnapshotHTML")]
    GenerateSnapshotHtml,
    GenerateHistorySnapshot,
    SetHomepage {
        url: String,
    },
}

/// Plain success or failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ack {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Ack {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl ToString) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
        }
    }
}

/// Outcome of a full or group restore
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreResponse {
    pub success: bool,
    pub tabs_count: usize,
    pub skipped_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Nothing was ever saved
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub no_snapshot: bool,
    /// A snapshot exists but holds no tabs
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub empty_snapshot: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RestoreResponse {
    pub fn restored(tabs: usize, skipped: usize, message: impl Into<String>) -> Self {
        Self {
            success: true,
            tabs_count: tabs,
            skipped_count: skipped,
            message: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn no_snapshot() -> Self {
        Self {
            no_snapshot: true,
            message: Some("No snapshot saved yet. Save a snapshot first, then restore it.".into()),
            ..Default::default()
        }
    }

    pub fn empty_snapshot() -> Self {
        Self {
            empty_snapshot: true,
            message: Some("The saved snapshot has no tabs to restore.".into()),
            ..Default::default()
        }
    }

    pub fn failed(error: impl ToString) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Default::default()
        }
    }
}

pub type GroupRestoreResponse = RestoreResponse;

/// Save-and-close result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseReport {
    #[serde(rename = "closedTabs")]
    pub closed: usize,
    #[serde(rename = "remainingTabs")]
    pub remaining: usize,
    #[serde(rename = "initialTabs")]
    pub initial: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteReport {
    pub removed: usize,
    pub remaining: usize,
}

/// The browser does not let extensions change the homepage; the page shows
/// the user how to do it by hand
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HomepageInstruction {
    pub instruct_user: bool,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Response {
    Ack(Ack),
    Restore(RestoreResponse),
    Closed {
        success: bool,
        #[serde(flatten)]
        report: CloseReport,
    },
    Deleted {
        success: bool,
        #[serde(flatten)]
        report: DeleteReport,
    },
    /// Rendered snapshot page; `null` when it could not be produced
    Html(Option<String>),
    #[serde(rename_all = "camelCase")]
    History {
        success: bool,
        history_snapshot_url: String,
    },
    Homepage {
        success: bool,
        #[serde(flatten)]
        instruction: HomepageInstruction,
    },
}

impl Response {
    pub fn is_success(&self) -> bool {
        match self {
            Response::Ack(ack) => ack.success,
            Response::Restore(restore) => restore.success,
            Response::Html(html) => html.is_some(),
            Response::Closed { success, .. }
            | Response::Deleted { success, .. }
            | Response::History { success, .. }
            | Response::Homepage { success, .. } => *success,
        }
    }
}

/// Keyboard commands declared by the extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shortcut {
    SaveSnapshot,
    RestoreSnapshot,
    SaveAndClose,
    ViewSnapshot,
}

impl Shortcut {
    pub fn as_str(&self) -> &'static str {
        match self {
            Shortcut::SaveSnapshot => "save-snapshot",
            Shortcut::RestoreSnapshot => "restore-snapshot",
            Shortcut::SaveAndClose => "save-and-close",
            Shortcut::ViewSnapshot => "view-snapshot",
        }
    }
}

impl std::fmt::Display for Shortcut {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Shortcut {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "save-snapshot" => Ok(Shortcut::SaveSnapshot),
            "restore-snapshot" => Ok(Shortcut::RestoreSnapshot),
            "save-and-close" => Ok(Shortcut::SaveAndClose),
            "view-snapshot" => Ok(Shortcut::ViewSnapshot),
            _ => Err(format!("Unknown shortcut: {}", s)),
        }
    }
}
