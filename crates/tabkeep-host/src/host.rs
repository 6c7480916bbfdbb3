//! The browser collaborator

use async_trait::async_trait;
use tabkeep_tabs::{GroupColor, GroupId, TabId, WindowId};

use crate::types::{
    HistoryItem, HistoryQuery, LiveGroup, LiveTab, LiveWindow, NewTab, NewWindow, Notification,
    TabUpdate,
};
use crate::Result;

#[async_trait]
pub trait BrowserHost: Send + Sync {
    /// All windows with their tabs, in browser order
    async fn windows(&self) -> Result<Vec<LiveWindow>>;

    /// A single window with its tabs; `WindowNotFound` once it is closed
    async fn window(&self, id: WindowId) -> Result<LiveWindow>;

    /// The window the user last focused
    async fn current_window(&self) -> Result<LiveWindow>;

    async fn create_window(&self, spec: NewWindow) -> Result<LiveWindow>;

    async fn remove_window(&self, id: WindowId) -> Result<()>;

    async fn tab(&self, id: TabId) -> Result<LiveTab>;

    async fn create_tab(&self, spec: NewTab) -> Result<LiveTab>;

    async fn update_tab(&self, id: TabId, update: TabUpdate) -> Result<LiveTab>;

    async fn remove_tab(&self, id: TabId) -> Result<()>;

    async fn tab_groups(&self) -> Result<Vec<LiveGroup>>;

    /// Put `tabs` into a fresh group and return its id
    async fn group_tabs(&self, tabs: &[TabId]) -> Result<GroupId>;

    async fn update_group(&self, id: GroupId, title: &str, color: GroupColor) -> Result<()>;

    /// Serialized DOM of the page in `tab`. Read-only; each call is isolated.
    async fn page_document(&self, tab: TabId) -> Result<String>;

    async fn history(&self, query: HistoryQuery) -> Result<Vec<HistoryItem>>;

    /// Account the browser profile is signed into, if any
    async fn signed_in_account(&self) -> Result<Option<String>>;

    /// Fire-and-forget user notification
    fn notify(&self, notification: Notification);

    /// Absolute URL of a page bundled with tabkeep
    fn extension_url(&self, path: &str) -> String;
}
