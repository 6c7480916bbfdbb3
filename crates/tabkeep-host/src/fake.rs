//! In-memory browser for tests
//!
//! Behaves like a small browser profile and can be told to misbehave: fail
//! specific tab creations, lose a window mid-restore, drop tabs right after
//! creating them, or refuse tab-group calls.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tabkeep_tabs::{GroupColor, GroupId, TabId, WindowId, NO_GROUP};

use crate::types::{
    HistoryItem, HistoryQuery, LiveGroup, LiveTab, LiveWindow, NewTab, NewWindow, Notification,
    TabUpdate, WindowType,
};
use crate::{BrowserHost, HostError, Result};

pub const NEW_TAB_URL: &str = "chrome://newtab/";

struct FakeWindow {
    kind: WindowType,
    maximized: bool,
    tabs: Vec<TabId>,
}

#[derive(Default)]
struct FakeState {
    next_id: i64,
    windows: BTreeMap<WindowId, FakeWindow>,
    tabs: HashMap<TabId, LiveTab>,
    groups: BTreeMap<GroupId, LiveGroup>,
    focused: Option<WindowId>,

    pages: HashMap<String, String>,
    page_delay: Option<Duration>,
    history: Vec<HistoryItem>,
    account: Option<String>,
    notifications: Vec<Notification>,

    failing_urls: HashSet<String>,
    vanishing_urls: HashSet<String>,
    close_window_after: Option<usize>,
    groups_unavailable: bool,
    window_creation_fails: bool,
    new_windows_vanish: bool,

    tabs_created: usize,
    windows_created: usize,
    creation_times: Vec<tokio::time::Instant>,
}

impl FakeState {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn snapshot_window(&self, id: WindowId) -> Result<LiveWindow> {
        let window = self.windows.get(&id).ok_or(HostError::WindowNotFound(id))?;
        Ok(LiveWindow {
            id,
            kind: window.kind,
            focused: self.focused == Some(id),
            tabs: window
                .tabs
                .iter()
                .filter_map(|tab_id| self.tabs.get(tab_id).cloned())
                .collect(),
        })
    }

    fn insert_tab(&mut self, window_id: WindowId, url: &str, title: &str) -> Result<LiveTab> {
        if !self.windows.contains_key(&window_id) {
            return Err(HostError::WindowNotFound(window_id));
        }

        let id = self.allocate_id();
        let tab = LiveTab {
            id,
            window_id,
            url: url.to_string(),
            title: title.to_string(),
            fav_icon_url: None,
            group_id: NO_GROUP,
            pinned: false,
            active: false,
            discarded: false,
        };
        self.tabs.insert(id, tab.clone());
        if let Some(window) = self.windows.get_mut(&window_id) {
            window.tabs.push(id);
        }
        Ok(tab)
    }

    fn set_active(&mut self, window_id: WindowId, tab_id: TabId) {
        for tab in self.tabs.values_mut() {
            if tab.window_id == window_id {
                tab.active = tab.id == tab_id;
            }
        }
    }

    fn drop_tab(&mut self, id: TabId) -> Result<()> {
        let tab = self.tabs.remove(&id).ok_or(HostError::TabNotFound(id))?;

        let now_empty = match self.windows.get_mut(&tab.window_id) {
            Some(window) => {
                window.tabs.retain(|t| *t != id);
                window.tabs.is_empty()
            }
            None => false,
        };

        // Closing the last tab closes the window
        if now_empty {
            self.drop_window(tab.window_id);
        }
        self.prune_groups();
        Ok(())
    }

    fn drop_window(&mut self, id: WindowId) -> bool {
        let Some(window) = self.windows.remove(&id) else {
            return false;
        };
        for tab_id in window.tabs {
            self.tabs.remove(&tab_id);
        }
        if self.focused == Some(id) {
            self.focused = self.windows.keys().next_back().copied();
        }
        self.prune_groups();
        true
    }

    fn prune_groups(&mut self) {
        let live: HashSet<GroupId> = self.tabs.values().map(|t| t.group_id).collect();
        self.groups.retain(|id, _| live.contains(id));
    }
}

/// Test double for [`BrowserHost`]
pub struct FakeBrowser {
    state: Mutex<FakeState>,
}

impl Default for FakeBrowser {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState::default()),
        }
    }

    // Setup

    pub fn add_window(&self, kind: WindowType) -> WindowId {
        let mut state = self.state.lock();
        let id = state.allocate_id();
        state.windows.insert(
            id,
            FakeWindow {
                kind,
                maximized: false,
                tabs: Vec::new(),
            },
        );
        state.focused = Some(id);
        id
    }

    /// Add a tab to an existing window; panics if the window is unknown
    pub fn add_tab(&self, window_id: WindowId, url: &str, title: &str) -> TabId {
        let mut state = self.state.lock();
        match state.insert_tab(window_id, url, title) {
            Ok(tab) => tab.id,
            Err(e) => panic!("add_tab: {}", e),
        }
    }

    /// Put existing tabs into a new group
    pub fn add_group(&self, tabs: &[TabId], title: &str, color: GroupColor) -> GroupId {
        let mut state = self.state.lock();
        let id = state.allocate_id();
        let window_id = tabs
            .first()
            .and_then(|t| state.tabs.get(t))
            .map(|t| t.window_id)
            .unwrap_or_default();
        for tab_id in tabs {
            if let Some(tab) = state.tabs.get_mut(tab_id) {
                tab.group_id = id;
            }
        }
        state.groups.insert(
            id,
            LiveGroup {
                id,
                window_id,
                title: Some(title.to_string()),
                color,
            },
        );
        id
    }

    pub fn focus(&self, window_id: WindowId) {
        self.state.lock().focused = Some(window_id);
    }

    pub fn set_discarded(&self, tab_id: TabId) {
        if let Some(tab) = self.state.lock().tabs.get_mut(&tab_id) {
            tab.discarded = true;
        }
    }

    pub fn set_page(&self, url: &str, html: &str) {
        self.state
            .lock()
            .pages
            .insert(url.to_string(), html.to_string());
    }

    pub fn set_page_delay(&self, delay: Duration) {
        self.state.lock().page_delay = Some(delay);
    }

    pub fn add_history(&self, item: HistoryItem) {
        self.state.lock().history.push(item);
    }

    pub fn sign_in(&self, account: &str) {
        self.state.lock().account = Some(account.to_string());
    }

    // Fault injection

    pub fn fail_tab_creation(&self, url: &str) {
        self.state.lock().failing_urls.insert(url.to_string());
    }

    /// The tab is created, then disappears before anyone can look at it again
    pub fn vanish_after_create(&self, url: &str) {
        self.state.lock().vanishing_urls.insert(url.to_string());
    }

    /// Close the target window right after the `n`th tab creation
    pub fn close_window_after_creates(&self, n: usize) {
        self.state.lock().close_window_after = Some(n);
    }

    pub fn disable_groups(&self) {
        self.state.lock().groups_unavailable = true;
    }

    pub fn fail_window_creation(&self) {
        self.state.lock().window_creation_fails = true;
    }

    /// New windows are reported as created but are gone immediately after
    pub fn new_windows_vanish(&self) {
        self.state.lock().new_windows_vanish = true;
    }

    // Inspection

    pub fn window_ids(&self) -> Vec<WindowId> {
        self.state.lock().windows.keys().copied().collect()
    }

    pub fn window_urls(&self, window_id: WindowId) -> Vec<String> {
        let state = self.state.lock();
        state
            .windows
            .get(&window_id)
            .map(|w| {
                w.tabs
                    .iter()
                    .filter_map(|t| state.tabs.get(t).map(|t| t.url.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn all_urls(&self) -> Vec<String> {
        let state = self.state.lock();
        state
            .windows
            .values()
            .flat_map(|w| w.tabs.iter())
            .filter_map(|t| state.tabs.get(t).map(|t| t.url.clone()))
            .collect()
    }

    pub fn is_maximized(&self, window_id: WindowId) -> bool {
        self.state
            .lock()
            .windows
            .get(&window_id)
            .is_some_and(|w| w.maximized)
    }

    /// Live groups with their member URLs
    pub fn groups(&self) -> Vec<(LiveGroup, Vec<String>)> {
        let state = self.state.lock();
        state
            .groups
            .values()
            .map(|group| {
                let mut members: Vec<&LiveTab> =
                    state.tabs.values().filter(|t| t.group_id == group.id).collect();
                members.sort_by_key(|t| t.id);
                (
                    group.clone(),
                    members.into_iter().map(|t| t.url.clone()).collect(),
                )
            })
            .collect()
    }

    pub fn active_url(&self, window_id: WindowId) -> Option<String> {
        let state = self.state.lock();
        state
            .tabs
            .values()
            .find(|t| t.window_id == window_id && t.active)
            .map(|t| t.url.clone())
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.state.lock().notifications.clone()
    }

    /// When each `create_tab` call succeeded, in call order
    pub fn creation_times(&self) -> Vec<tokio::time::Instant> {
        self.state.lock().creation_times.clone()
    }

    pub fn tabs_created(&self) -> usize {
        self.state.lock().tabs_created
    }

    pub fn windows_created(&self) -> usize {
        self.state.lock().windows_created
    }
}

#[async_trait]
impl BrowserHost for FakeBrowser {
    async fn windows(&self) -> Result<Vec<LiveWindow>> {
        let state = self.state.lock();
        state
            .windows
            .keys()
            .map(|id| state.snapshot_window(*id))
            .collect()
    }

    async fn window(&self, id: WindowId) -> Result<LiveWindow> {
        self.state.lock().snapshot_window(id)
    }

    async fn current_window(&self) -> Result<LiveWindow> {
        let state = self.state.lock();
        let id = state.focused.ok_or(HostError::NoCurrentWindow)?;
        state.snapshot_window(id)
    }

    async fn create_window(&self, spec: NewWindow) -> Result<LiveWindow> {
        let mut state = self.state.lock();
        if state.window_creation_fails {
            return Err(HostError::Failed("window creation refused".to_string()));
        }

        let id = state.allocate_id();
        state.windows.insert(
            id,
            FakeWindow {
                kind: WindowType::Normal,
                maximized: spec.maximized,
                tabs: Vec::new(),
            },
        );
        state.windows_created += 1;

        let url = spec.url.unwrap_or_else(|| NEW_TAB_URL.to_string());
        let tab = state.insert_tab(id, &url, "")?;
        state.set_active(id, tab.id);
        if spec.focused {
            state.focused = Some(id);
        }

        let window = state.snapshot_window(id)?;
        if state.new_windows_vanish {
            state.drop_window(id);
        }
        Ok(window)
    }

    async fn remove_window(&self, id: WindowId) -> Result<()> {
        if self.state.lock().drop_window(id) {
            Ok(())
        } else {
            Err(HostError::WindowNotFound(id))
        }
    }

    async fn tab(&self, id: TabId) -> Result<LiveTab> {
        self.state
            .lock()
            .tabs
            .get(&id)
            .cloned()
            .ok_or(HostError::TabNotFound(id))
    }

    async fn create_tab(&self, spec: NewTab) -> Result<LiveTab> {
        let mut state = self.state.lock();
        if !state.windows.contains_key(&spec.window_id) {
            return Err(HostError::WindowNotFound(spec.window_id));
        }
        if state.failing_urls.contains(&spec.url) {
            return Err(HostError::Failed(format!("cannot open {}", spec.url)));
        }

        let mut tab = state.insert_tab(spec.window_id, &spec.url, "")?;
        tab.pinned = spec.pinned;
        if let Some(stored) = state.tabs.get_mut(&tab.id) {
            stored.pinned = spec.pinned;
        }
        if spec.active {
            state.set_active(spec.window_id, tab.id);
            tab.active = true;
        }
        state.tabs_created += 1;
        state.creation_times.push(tokio::time::Instant::now());

        if state.vanishing_urls.contains(&spec.url) {
            state.drop_tab(tab.id)?;
        }
        if state
            .close_window_after
            .is_some_and(|n| state.tabs_created >= n)
        {
            state.drop_window(spec.window_id);
        }

        Ok(tab)
    }

    async fn update_tab(&self, id: TabId, update: TabUpdate) -> Result<LiveTab> {
        let mut state = self.state.lock();
        let window_id = state
            .tabs
            .get(&id)
            .map(|t| t.window_id)
            .ok_or(HostError::TabNotFound(id))?;

        if let Some(url) = update.url {
            if let Some(tab) = state.tabs.get_mut(&id) {
                tab.url = url;
                tab.title.clear();
            }
        }
        if update.active == Some(true) {
            state.set_active(window_id, id);
        }

        state
            .tabs
            .get(&id)
            .cloned()
            .ok_or(HostError::TabNotFound(id))
    }

    async fn remove_tab(&self, id: TabId) -> Result<()> {
        self.state.lock().drop_tab(id)
    }

    async fn tab_groups(&self) -> Result<Vec<LiveGroup>> {
        let state = self.state.lock();
        if state.groups_unavailable {
            return Err(HostError::Unsupported("tab groups".to_string()));
        }
        Ok(state.groups.values().cloned().collect())
    }

    async fn group_tabs(&self, tabs: &[TabId]) -> Result<GroupId> {
        let mut state = self.state.lock();
        if state.groups_unavailable {
            return Err(HostError::Unsupported("tab groups".to_string()));
        }
        let first = tabs
            .first()
            .ok_or_else(|| HostError::Failed("no tabs to group".to_string()))?;
        let window_id = state
            .tabs
            .get(first)
            .map(|t| t.window_id)
            .ok_or(HostError::TabNotFound(*first))?;
        if let Some(missing) = tabs.iter().find(|t| !state.tabs.contains_key(*t)) {
            return Err(HostError::TabNotFound(*missing));
        }

        let id = state.allocate_id();
        for tab_id in tabs {
            if let Some(tab) = state.tabs.get_mut(tab_id) {
                tab.group_id = id;
            }
        }
        state.groups.insert(
            id,
            LiveGroup {
                id,
                window_id,
                title: None,
                color: GroupColor::Grey,
            },
        );
        state.prune_groups();
        Ok(id)
    }

    async fn update_group(&self, id: GroupId, title: &str, color: GroupColor) -> Result<()> {
        let mut state = self.state.lock();
        if state.groups_unavailable {
            return Err(HostError::Unsupported("tab groups".to_string()));
        }
        let group = state.groups.get_mut(&id).ok_or(HostError::GroupNotFound(id))?;
        group.title = Some(title.to_string());
        group.color = color;
        Ok(())
    }

    async fn page_document(&self, tab: TabId) -> Result<String> {
        let (html, delay) = {
            let state = self.state.lock();
            let live = state.tabs.get(&tab).ok_or(HostError::TabNotFound(tab))?;
            if live.discarded {
                return Err(HostError::ScriptFailed {
                    tab,
                    reason: "tab is discarded".to_string(),
                });
            }
            (state.pages.get(&live.url).cloned(), state.page_delay)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        html.ok_or_else(|| HostError::ScriptFailed {
            tab,
            reason: "cannot access page".to_string(),
        })
    }

    async fn history(&self, query: HistoryQuery) -> Result<Vec<HistoryItem>> {
        let state = self.state.lock();
        let text = query.text.to_lowercase();
        Ok(state
            .history
            .iter()
            .filter(|item| {
                item.last_visit_time
                    .map_or(true, |visited| visited >= query.start_time)
            })
            .filter(|item| {
                text.is_empty()
                    || item.url.to_lowercase().contains(&text)
                    || item.title.to_lowercase().contains(&text)
            })
            .take(query.max_results)
            .cloned()
            .collect())
    }

    async fn signed_in_account(&self) -> Result<Option<String>> {
        Ok(self.state.lock().account.clone())
    }

    fn notify(&self, notification: Notification) {
        self.state.lock().notifications.push(notification);
    }

    fn extension_url(&self, path: &str) -> String {
        format!("chrome-extension://tabkeep/{}", path.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_remove() {
        let browser = FakeBrowser::new();
        let window = browser
            .create_window(NewWindow {
                url: None,
                maximized: true,
                focused: true,
            })
            .await
            .unwrap();
        assert_eq!(window.tabs.len(), 1);
        assert_eq!(window.tabs[0].url, NEW_TAB_URL);
        assert!(browser.is_maximized(window.id));

        let tab = browser
            .create_tab(NewTab {
                window_id: window.id,
                url: "https://a.com".to_string(),
                pinned: false,
                active: true,
            })
            .await
            .unwrap();
        assert_eq!(browser.active_url(window.id).as_deref(), Some("https://a.com"));

        browser.remove_tab(window.tabs[0].id).await.unwrap();
        assert_eq!(browser.window_urls(window.id), vec!["https://a.com".to_string()]);

        // Last tab closes the window
        browser.remove_tab(tab.id).await.unwrap();
        assert!(matches!(
            browser.window(window.id).await,
            Err(HostError::WindowNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_fault_injection() {
        let browser = FakeBrowser::new();
        let window = browser.add_window(WindowType::Normal);
        browser.fail_tab_creation("https://bad.com");
        browser.vanish_after_create("https://gone.com");

        let spec = |url: &str| NewTab {
            window_id: window,
            url: url.to_string(),
            pinned: false,
            active: false,
        };

        assert!(browser.create_tab(spec("https://bad.com")).await.is_err());

        let gone = browser.create_tab(spec("https://gone.com")).await.unwrap();
        assert!(matches!(
            browser.tab(gone.id).await,
            Err(HostError::TabNotFound(_))
        ));

        browser.close_window_after_creates(2);
        browser.create_tab(spec("https://ok.com")).await.unwrap();
        assert!(browser.window(window).await.is_err());
    }

    #[tokio::test]
    async fn test_groups() {
        let browser = FakeBrowser::new();
        let window = browser.add_window(WindowType::Normal);
        let a = browser.add_tab(window, "https://a.com", "A");
        let b = browser.add_tab(window, "https://b.com", "B");

        let group = browser.group_tabs(&[a, b]).await.unwrap();
        browser
            .update_group(group, "Work", GroupColor::Blue)
            .await
            .unwrap();

        let groups = browser.groups();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].0.title.as_deref(), Some("Work"));
        assert_eq!(groups[0].1, vec!["https://a.com".to_string(), "https://b.com".to_string()]);

        browser.disable_groups();
        assert!(browser.tab_groups().await.is_err());
    }
}
