//! Restore Reconciler
//!
//! ```text
//! Idle -> CollectingLiveState -> Planning -> AcquiringTargetWindow
//!      -> CreatingTabs -> RegroupingTabs -> Done
//! ```
//! Any step can end in `Error`. Planning runs before a window is touched, so
//! a restore with nothing to do never opens one.

use std::collections::{BTreeMap, HashSet};

use tabkeep_host::{BrowserHost, HostError, LiveTab, NewTab, NewWindow};
use tabkeep_tabs::{GroupColor, GroupId, GroupPayload, Snapshot, TabId, WindowId};

use crate::builder::UNNAMED_GROUP;
use crate::plan::{live_open_urls, PlannedTab, RestorePlan};
use crate::policy::{pause, RestoreOptions, WindowPolicy};
use crate::{Result, SessionError};

/// Title for a group restored from a bucket that had none
pub const RESTORED_GROUP: &str = "Restored group";

const BLANK_URL: &str = "about:blank";

/// Pages a freshly opened window starts with
fn is_default_tab(url: &str) -> bool {
    url == BLANK_URL || url == "chrome://newtab/" || url.starts_with("chrome-extension://")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestorePhase {
    Idle,
    CollectingLiveState,
    Planning,
    AcquiringTargetWindow,
    CreatingTabs,
    RegroupingTabs,
    Done,
    Error,
}

impl RestorePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RestorePhase::Idle => "idle",
            RestorePhase::CollectingLiveState => "collecting-live-state",
            RestorePhase::Planning => "planning",
            RestorePhase::AcquiringTargetWindow => "acquiring-target-window",
            RestorePhase::CreatingTabs => "creating-tabs",
            RestorePhase::RegroupingTabs => "regrouping-tabs",
            RestorePhase::Done => "done",
            RestorePhase::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RestorePhase::Done | RestorePhase::Error)
    }
}

impl std::fmt::Display for RestorePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

struct PhaseTracker {
    phase: RestorePhase,
}

impl PhaseTracker {
    fn new() -> Self {
        Self {
            phase: RestorePhase::Idle,
        }
    }

    fn advance(&mut self, next: RestorePhase) {
        tracing::debug!(from = %self.phase, to = %next, "Restore phase");
        self.phase = next;
    }

    fn finish<T>(&mut self, result: &Result<T>) {
        match result {
            Ok(_) => self.advance(RestorePhase::Done),
            Err(e) => {
                tracing::error!(phase = %self.phase, error = %e, "Restore failed");
                self.advance(RestorePhase::Error);
            }
        }
    }
}

/// What the user should be told about a finished restore
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreNotice {
    Restored { restored: usize, skipped: usize },
    AllAlreadyOpen { skipped: usize },
    NothingToRestore,
    GroupRestored { title: String, restored: usize, skipped: usize },
    GroupAllOpen { title: String, skipped: usize },
    GroupEmpty { title: String },
}

impl std::fmt::Display for RestoreNotice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RestoreNotice::Restored { restored, skipped: 0 } => {
                write!(f, "Restored {} tabs", restored)
            }
            RestoreNotice::Restored { restored, skipped } => write!(
                f,
                "Restored {} tabs, skipped {} already open",
                restored, skipped
            ),
            RestoreNotice::AllAlreadyOpen { skipped } => {
                write!(f, "All {} tabs from the snapshot are already open", skipped)
            }
            RestoreNotice::NothingToRestore => write!(f, "No valid tabs to restore"),
            RestoreNotice::GroupRestored {
                title,
                restored,
                skipped,
            } => write!(
                f,
                "Group \"{}\": restored {} tabs, skipped {}",
                title, restored, skipped
            ),
            RestoreNotice::GroupAllOpen { title, skipped } => write!(
                f,
                "All {} tabs of group \"{}\" are already open",
                skipped, title
            ),
            RestoreNotice::GroupEmpty { title } => {
                write!(f, "Group \"{}\" has no tabs to restore", title)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreReport {
    pub restored: usize,
    pub skipped: usize,
    pub groups_created: usize,
    /// Window the tabs went into; `None` when nothing was restored
    pub window_id: Option<WindowId>,
    pub notice: RestoreNotice,
}

pub type GroupRestoreReport = RestoreReport;

struct TargetWindow {
    id: WindowId,
    /// Default pages of a window opened for this restore, removed once the
    /// first restored tab exists
    default_tabs: Vec<TabId>,
}

pub struct RestoreReconciler<'a, H: BrowserHost + ?Sized> {
    host: &'a H,
    options: RestoreOptions,
}

impl<'a, H: BrowserHost + ?Sized> RestoreReconciler<'a, H> {
    pub fn new(host: &'a H, options: RestoreOptions) -> Self {
        Self { host, options }
    }

    /// Recreate every snapshot tab that is not already open, then regroup
    pub async fn restore(&self, snapshot: &Snapshot) -> Result<RestoreReport> {
        let mut phase = PhaseTracker::new();
        let result = self.run_restore(snapshot, &mut phase).await;
        phase.finish(&result);
        result
    }

    /// Recreate the tabs of one group bucket as a single new group
    pub async fn restore_group(&self, payload: &GroupPayload) -> Result<RestoreReport> {
        let mut phase = PhaseTracker::new();
        let result = self.run_group_restore(payload, &mut phase).await;
        phase.finish(&result);
        result
    }

    async fn run_restore(
        &self,
        snapshot: &Snapshot,
        phase: &mut PhaseTracker,
    ) -> Result<RestoreReport> {
        phase.advance(RestorePhase::CollectingLiveState);
        let open = live_open_urls(&self.host.windows().await?);

        phase.advance(RestorePhase::Planning);
        let plan = RestorePlan::for_snapshot(snapshot, &open);
        tracing::info!(
            total = snapshot.tab_count(),
            to_restore = plan.tabs.len(),
            skipped = plan.skipped,
            groups = plan.groups.len(),
            policy = %self.options.policy,
            "Planned restore"
        );

        if plan.is_empty() {
            let notice = if plan.skipped > 0 {
                RestoreNotice::AllAlreadyOpen {
                    skipped: plan.skipped,
                }
            } else {
                RestoreNotice::NothingToRestore
            };
            return Ok(RestoreReport {
                restored: 0,
                skipped: plan.skipped,
                groups_created: 0,
                window_id: None,
                notice,
            });
        }

        phase.advance(RestorePhase::AcquiringTargetWindow);
        let mut target = self.acquire_window().await?;

        phase.advance(RestorePhase::CreatingTabs);
        let created = self
            .create_tabs(&mut target, &plan.tabs, self.options.policy.batch_size(), true)
            .await?;

        phase.advance(RestorePhase::RegroupingTabs);
        pause(self.options.timings.regroup_settle).await;
        let groups_created = self.regroup(target.id, &plan, &created).await;

        tracing::info!(
            restored = created.len(),
            skipped = plan.skipped,
            groups = groups_created,
            "Restore completed"
        );

        Ok(RestoreReport {
            restored: created.len(),
            skipped: plan.skipped,
            groups_created,
            window_id: Some(target.id),
            notice: RestoreNotice::Restored {
                restored: created.len(),
                skipped: plan.skipped,
            },
        })
    }

    async fn run_group_restore(
        &self,
        payload: &GroupPayload,
        phase: &mut PhaseTracker,
    ) -> Result<RestoreReport> {
        let title = if payload.title.trim().is_empty() {
            RESTORED_GROUP.to_string()
        } else {
            payload.title.trim().to_string()
        };

        phase.advance(RestorePhase::CollectingLiveState);
        let open = live_open_urls(&self.host.windows().await?);

        phase.advance(RestorePhase::Planning);
        let plan = RestorePlan::for_tabs(&payload.tabs, &open);
        tracing::info!(
            group = %title,
            to_restore = plan.tabs.len(),
            skipped = plan.skipped,
            "Planned group restore"
        );

        if plan.is_empty() {
            let notice = if plan.skipped > 0 {
                RestoreNotice::GroupAllOpen {
                    title,
                    skipped: plan.skipped,
                }
            } else {
                RestoreNotice::GroupEmpty { title }
            };
            return Ok(RestoreReport {
                restored: 0,
                skipped: plan.skipped,
                groups_created: 0,
                window_id: None,
                notice,
            });
        }

        phase.advance(RestorePhase::AcquiringTargetWindow);
        let mut target = self.acquire_window().await?;

        phase.advance(RestorePhase::CreatingTabs);
        let created = self
            .create_tabs(&mut target, &plan.tabs, plan.tabs.len(), false)
            .await?;

        phase.advance(RestorePhase::RegroupingTabs);
        let mut groups_created = 0;
        if !created.is_empty() {
            pause(self.options.timings.group_settle).await;
            let members: Vec<TabId> = created.values().copied().collect();
            match self.apply_group(&members, &title, payload.color).await {
                Ok(Some(group)) => {
                    tracing::info!(group, title = %title, tabs = members.len(), "Created group");
                    groups_created = 1;
                }
                Ok(None) => tracing::info!(title = %title, "No restored tab survived, group skipped"),
                Err(e) => tracing::warn!(title = %title, error = %e, "Failed to group restored tabs"),
            }
        }

        Ok(RestoreReport {
            restored: created.len(),
            skipped: plan.skipped,
            groups_created,
            window_id: Some(target.id),
            notice: RestoreNotice::GroupRestored {
                title,
                restored: created.len(),
                skipped: plan.skipped,
            },
        })
    }

    async fn acquire_window(&self) -> Result<TargetWindow> {
        if self.options.window_policy == WindowPolicy::ReuseCurrentNormal {
            match self.host.current_window().await {
                Ok(window) if window.is_normal() => {
                    tracing::debug!(window = window.id, "Restoring into current window");
                    return Ok(TargetWindow {
                        id: window.id,
                        default_tabs: Vec::new(),
                    });
                }
                Ok(window) => {
                    tracing::debug!(window = window.id, kind = %window.kind, "Current window not suitable");
                }
                Err(e) => tracing::debug!(error = %e, "No usable current window"),
            }
        }

        let window = self
            .host
            .create_window(NewWindow {
                url: Some(BLANK_URL.to_string()),
                maximized: true,
                focused: true,
            })
            .await
            .map_err(|e| SessionError::WindowUnavailable(e.to_string()))?;

        pause(self.options.timings.window_settle).await;

        // The window must still be there after settling
        let verified = self
            .host
            .window(window.id)
            .await
            .map_err(|e| SessionError::WindowUnavailable(e.to_string()))?;

        let default_tabs = verified
            .tabs
            .iter()
            .filter(|t| is_default_tab(&t.url))
            .map(|t| t.id)
            .collect();

        tracing::debug!(window = verified.id, "Opened window for restore");
        Ok(TargetWindow {
            id: verified.id,
            default_tabs,
        })
    }

    /// Create `tabs` in batches; returns plan ordinal -> new tab id for every
    /// tab that was created. Only losing the window aborts.
    async fn create_tabs(
        &self,
        target: &mut TargetWindow,
        tabs: &[PlannedTab],
        batch_size: usize,
        activate_first: bool,
    ) -> Result<BTreeMap<usize, TabId>> {
        let batch_size = batch_size.max(1);
        let batch_count = tabs.len().div_ceil(batch_size);
        let mut created = BTreeMap::new();

        for (batch_index, batch) in tabs.chunks(batch_size).enumerate() {
            for (position, planned) in batch.iter().enumerate() {
                let active = activate_first && created.is_empty();

                match self.create_one(target.id, planned, active).await {
                    Ok(tab) => {
                        tracing::debug!(url = %planned.record.url, tab = tab.id, "Created tab");
                        if created.is_empty() {
                            self.remove_default_tabs(target, tab.id).await;
                        }
                        created.insert(planned.ordinal, tab.id);
                    }
                    Err(e @ SessionError::WindowLost(_)) => return Err(e),
                    Err(e) => {
                        tracing::warn!(url = %planned.record.url, error = %e, "Failed to create tab");
                    }
                }

                if position + 1 < batch.len() {
                    pause(self.options.timings.item_delay).await;
                }
            }

            if batch_index + 1 < batch_count {
                let delay = self.options.timings.batch_delay(self.options.policy);
                tracing::debug!(batch = batch_index + 1, of = batch_count, ?delay, "Batch done");
                pause(delay).await;
            }
        }

        Ok(created)
    }

    async fn create_one(
        &self,
        window_id: WindowId,
        planned: &PlannedTab,
        active: bool,
    ) -> Result<LiveTab> {
        let lost = |e: HostError| match e {
            HostError::WindowNotFound(_) => SessionError::WindowLost(window_id),
            other => SessionError::Host(other),
        };

        self.host.window(window_id).await.map_err(lost)?;
        self.host
            .create_tab(NewTab {
                window_id,
                url: planned.record.url.clone(),
                pinned: planned.record.pinned,
                active,
            })
            .await
            .map_err(lost)
    }

    async fn remove_default_tabs(&self, target: &mut TargetWindow, keep: TabId) {
        for id in std::mem::take(&mut target.default_tabs) {
            if id == keep {
                continue;
            }
            if let Err(e) = self.host.remove_tab(id).await {
                tracing::debug!(tab = id, error = %e, "Could not remove default tab");
            }
        }
    }

    /// Recreate each pending group from the tabs this restore created,
    /// matched by URL. Returns how many groups were created.
    async fn regroup(
        &self,
        window_id: WindowId,
        plan: &RestorePlan,
        created: &BTreeMap<usize, TabId>,
    ) -> usize {
        if plan.groups.is_empty() || created.is_empty() {
            return 0;
        }

        let live = match self.host.window(window_id).await {
            Ok(window) => window,
            Err(e) => {
                tracing::warn!(window = window_id, error = %e, "Window gone before grouping, tabs left ungrouped");
                return 0;
            }
        };

        let created_ids: HashSet<TabId> = created.values().copied().collect();
        let mut claimed: HashSet<TabId> = HashSet::new();
        let mut groups_created = 0;

        for (origin, pending) in &plan.groups {
            let mut members = Vec::new();
            for url in pending.members.iter().filter_map(|o| plan.url_of(*o)) {
                let found = live.tabs.iter().find(|t| {
                    t.url == url && created_ids.contains(&t.id) && !claimed.contains(&t.id)
                });
                if let Some(tab) = found {
                    claimed.insert(tab.id);
                    members.push(tab.id);
                }
            }

            let title = pending.meta.title_or(UNNAMED_GROUP);
            match self.apply_group(&members, title, pending.meta.color).await {
                Ok(Some(group)) => {
                    tracing::info!(
                        origin,
                        group,
                        title,
                        tabs = members.len(),
                        of = pending.members.len(),
                        "Recreated group"
                    );
                    groups_created += 1;
                }
                Ok(None) => tracing::info!(origin, title, "No member survived, group skipped"),
                Err(e) => tracing::warn!(origin, title, error = %e, "Failed to recreate group"),
            }
        }

        groups_created
    }

    /// Group whichever of `candidates` still exist. `None` when none do.
    async fn apply_group(
        &self,
        candidates: &[TabId],
        title: &str,
        color: GroupColor,
    ) -> Result<Option<GroupId>> {
        let mut valid = Vec::with_capacity(candidates.len());
        for id in candidates {
            match self.host.tab(*id).await {
                Ok(_) => valid.push(*id),
                Err(e) => tracing::debug!(tab = id, error = %e, "Tab no longer exists"),
            }
        }

        if valid.is_empty() {
            return Ok(None);
        }

        let group = self.host.group_tabs(&valid).await?;
        self.host.update_group(group, title, color).await?;
        Ok(Some(group))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use crate::policy::{BatchPolicy, RestoreTimings};
    use tabkeep_host::fake::FakeBrowser;
    use tabkeep_host::WindowType;
    use tabkeep_tabs::{GroupMeta, TabRecord, WindowRecord};

    fn options(policy: BatchPolicy, window_policy: WindowPolicy) -> RestoreOptions {
        RestoreOptions {
            policy,
            window_policy,
            timings: RestoreTimings::immediate(),
        }
    }

    fn fast() -> RestoreOptions {
        options(BatchPolicy::Fast, WindowPolicy::ReuseCurrentNormal)
    }

    fn snapshot(tabs: Vec<TabRecord>, groups: Vec<(GroupId, GroupMeta)>) -> Snapshot {
        Snapshot::new(vec![WindowRecord { id: 99, tabs }], groups.into_iter().collect())
    }

    fn tabs(urls: &[&str]) -> Vec<TabRecord> {
        urls.iter().map(|u| TabRecord::new(*u, *u)).collect()
    }

    fn browser_with(urls: &[&str]) -> (FakeBrowser, WindowId) {
        let browser = FakeBrowser::new();
        let window = browser.add_window(WindowType::Normal);
        for url in urls {
            browser.add_tab(window, url, url);
        }
        (browser, window)
    }

    #[tokio::test]
    async fn test_restores_missing_tabs_into_current_window() {
        let (browser, window) = browser_with(&["https://z.com"]);
        let snap = snapshot(tabs(&["https://a.com", "https://b.com", "https://c.com"]), vec![]);

        let report = RestoreReconciler::new(&browser, fast())
            .restore(&snap)
            .await
            .unwrap();

        assert_eq!(report.restored, 3);
        assert_eq!(report.skipped, 0);
        assert_eq!(report.window_id, Some(window));
        assert_eq!(browser.windows_created(), 0);
        assert_eq!(
            browser.window_urls(window),
            vec!["https://z.com", "https://a.com", "https://b.com", "https://c.com"]
        );
        assert_eq!(browser.active_url(window).as_deref(), Some("https://a.com"));
        assert_eq!(report.notice.to_string(), "Restored 3 tabs");
    }

    #[tokio::test]
    async fn test_everything_open_creates_nothing() {
        let (browser, _) = browser_with(&["https://a.com", "https://b.com"]);
        let snap = snapshot(tabs(&["https://a.com", "https://b.com"]), vec![]);

        let report = RestoreReconciler::new(&browser, fast())
            .restore(&snap)
            .await
            .unwrap();

        assert_eq!(report.restored, 0);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.window_id, None);
        assert_eq!(report.notice, RestoreNotice::AllAlreadyOpen { skipped: 2 });
        assert_eq!(browser.tabs_created(), 0);
        assert_eq!(browser.windows_created(), 0);
    }

    #[tokio::test]
    async fn test_second_restore_is_a_no_op() {
        let (browser, _) = browser_with(&["https://a.com"]);
        let snap = snapshot(
            tabs(&["https://a.com", "https://b.com", "https://c.com", "https://d.com"]),
            vec![],
        );
        let reconciler = RestoreReconciler::new(&browser, fast());

        let first = reconciler.restore(&snap).await.unwrap();
        assert_eq!((first.restored, first.skipped), (3, 1));

        let second = reconciler.restore(&snap).await.unwrap();
        assert_eq!((second.restored, second.skipped), (0, 4));
    }

    /// Gaps between consecutive tab creations when restoring `count` tabs
    async fn creation_gaps(policy: BatchPolicy, count: usize) -> Vec<Duration> {
        let (browser, _) = browser_with(&["https://keep.com"]);
        let urls: Vec<String> = (0..count).map(|i| format!("https://t{}.com", i)).collect();
        let urls: Vec<&str> = urls.iter().map(String::as_str).collect();
        let options = RestoreOptions {
            policy,
            window_policy: WindowPolicy::ReuseCurrentNormal,
            timings: RestoreTimings {
                item_delay: Duration::from_millis(10),
                batch_delays: true,
                ..RestoreTimings::immediate()
            },
        };

        let report = RestoreReconciler::new(&browser, options)
            .restore(&snapshot(tabs(&urls), vec![]))
            .await
            .unwrap();
        assert_eq!(report.restored, count);

        browser
            .creation_times()
            .windows(2)
            .map(|pair| pair[1] - pair[0])
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_schedule_is_five_then_two() {
        let item = Duration::from_millis(10);
        let batch = Duration::from_millis(100);

        assert_eq!(
            creation_gaps(BatchPolicy::Fast, 7).await,
            vec![item, item, item, item, batch, item]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_performance_schedule_is_pairs() {
        let item = Duration::from_millis(10);
        let batch = Duration::from_millis(800);

        assert_eq!(
            creation_gaps(BatchPolicy::PerformanceFriendly, 7).await,
            vec![item, batch, item, batch, item, batch]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_small_restore_is_one_batch() {
        let item = Duration::from_millis(10);
        assert_eq!(creation_gaps(BatchPolicy::Fast, 3).await, vec![item, item]);
    }

    #[tokio::test]
    async fn test_performance_policy_restores_every_tab() {
        let (browser, window) = browser_with(&[]);
        browser.add_tab(window, "https://z.com", "Z");
        let urls: Vec<String> = (0..7).map(|i| format!("https://site{}.com", i)).collect();
        let url_refs: Vec<&str> = urls.iter().map(String::as_str).collect();
        let snap = snapshot(tabs(&url_refs), vec![]);

        let report = RestoreReconciler::new(
            &browser,
            options(BatchPolicy::PerformanceFriendly, WindowPolicy::ReuseCurrentNormal),
        )
        .restore(&snap)
        .await
        .unwrap();

        assert_eq!(report.restored, 7);
        assert_eq!(browser.window_urls(window).len(), 8);
    }

    #[tokio::test]
    async fn test_per_tab_failure_is_isolated() {
        let (browser, _) = browser_with(&["https://z.com"]);
        browser.fail_tab_creation("https://b.com");
        let snap = snapshot(tabs(&["https://a.com", "https://b.com", "https://c.com"]), vec![]);

        let report = RestoreReconciler::new(&browser, fast())
            .restore(&snap)
            .await
            .unwrap();

        assert_eq!(report.restored, 2);
        assert_eq!(report.skipped, 0);
        assert!(report.restored + report.skipped <= snap.tab_count());
    }

    #[tokio::test]
    async fn test_new_window_replaces_default_tab() {
        let browser = FakeBrowser::new();
        let popup = browser.add_window(WindowType::Popup);
        browser.add_tab(popup, "https://popup.com", "Popup");
        let snap = snapshot(tabs(&["https://a.com", "https://b.com"]), vec![]);

        let report = RestoreReconciler::new(&browser, fast())
            .restore(&snap)
            .await
            .unwrap();

        let window = report.window_id.unwrap();
        assert_ne!(window, popup);
        assert_eq!(browser.windows_created(), 1);
        assert!(browser.is_maximized(window));
        assert_eq!(browser.window_urls(window), vec!["https://a.com", "https://b.com"]);
    }

    #[tokio::test]
    async fn test_always_new_window_policy() {
        let (browser, current) = browser_with(&["https://z.com"]);
        let snap = snapshot(tabs(&["https://a.com"]), vec![]);

        let report = RestoreReconciler::new(
            &browser,
            options(BatchPolicy::Fast, WindowPolicy::AlwaysNew),
        )
        .restore(&snap)
        .await
        .unwrap();

        assert_ne!(report.window_id, Some(current));
        assert_eq!(browser.window_urls(current), vec!["https://z.com"]);
    }

    #[tokio::test]
    async fn test_unverifiable_new_window_is_fatal() {
        let browser = FakeBrowser::new();
        browser.new_windows_vanish();
        let snap = snapshot(tabs(&["https://a.com"]), vec![]);

        let err = RestoreReconciler::new(&browser, fast())
            .restore(&snap)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::WindowUnavailable(_)));
        assert_eq!(browser.tabs_created(), 0);
    }

    #[tokio::test]
    async fn test_window_lost_mid_restore_aborts() {
        let (browser, _) = browser_with(&["https://z.com"]);
        browser.close_window_after_creates(2);
        let snap = snapshot(
            tabs(&["https://a.com", "https://b.com", "https://c.com", "https://d.com"]),
            vec![],
        );

        let err = RestoreReconciler::new(&browser, fast())
            .restore(&snap)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::WindowLost(_)));
        assert_eq!(browser.tabs_created(), 2);
    }

    #[tokio::test]
    async fn test_groups_are_recreated_from_new_tabs() {
        let (browser, _) = browser_with(&["https://b.com"]);
        let snap = snapshot(
            vec![
                TabRecord::new("https://a.com", "A").with_group(7),
                TabRecord::new("https://b.com", "B").with_group(7),
                TabRecord::new("https://c.com", "C").with_group(7),
                TabRecord::new("https://d.com", "D"),
                TabRecord::new("https://e.com", "E").with_group(8),
            ],
            vec![
                (7, GroupMeta::new("Work", GroupColor::Blue)),
                (8, GroupMeta::new("", GroupColor::Red)),
            ],
        );

        let report = RestoreReconciler::new(&browser, fast())
            .restore(&snap)
            .await
            .unwrap();
        assert_eq!(report.restored, 4);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.groups_created, 2);

        let groups = browser.groups();
        let work = groups
            .iter()
            .find(|(g, _)| g.title.as_deref() == Some("Work"))
            .unwrap();
        assert_eq!(work.0.color, GroupColor::Blue);
        // b.com was already open and stays out of the group
        assert_eq!(work.1, vec!["https://a.com", "https://c.com"]);

        let unnamed = groups
            .iter()
            .find(|(g, _)| g.title.as_deref() == Some(UNNAMED_GROUP))
            .unwrap();
        assert_eq!(unnamed.1, vec!["https://e.com"]);
    }

    #[tokio::test]
    async fn test_group_without_survivors_is_skipped() {
        let (browser, _) = browser_with(&["https://z.com"]);
        browser.vanish_after_create("https://a.com");
        browser.vanish_after_create("https://b.com");
        let snap = snapshot(
            vec![
                TabRecord::new("https://a.com", "A").with_group(7),
                TabRecord::new("https://b.com", "B").with_group(7),
                TabRecord::new("https://c.com", "C"),
            ],
            vec![(7, GroupMeta::new("Work", GroupColor::Blue))],
        );

        let report = RestoreReconciler::new(&browser, fast())
            .restore(&snap)
            .await
            .unwrap();
        assert_eq!(report.groups_created, 0);
        assert!(browser.groups().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_urls_each_join_their_group() {
        let (browser, _) = browser_with(&["https://z.com"]);
        let snap = snapshot(
            vec![
                TabRecord::new("https://a.com", "A").with_group(1),
                TabRecord::new("https://a.com", "A").with_group(2),
            ],
            vec![
                (1, GroupMeta::new("One", GroupColor::Green)),
                (2, GroupMeta::new("Two", GroupColor::Pink)),
            ],
        );

        let report = RestoreReconciler::new(&browser, fast())
            .restore(&snap)
            .await
            .unwrap();
        assert_eq!(report.restored, 2);
        assert_eq!(report.groups_created, 2);
        assert!(browser.groups().iter().all(|(_, members)| members.len() == 1));
    }

    #[tokio::test]
    async fn test_grouping_failure_keeps_tabs() {
        let (browser, _) = browser_with(&["https://z.com"]);
        browser.disable_groups();
        let snap = snapshot(
            vec![TabRecord::new("https://a.com", "A").with_group(7)],
            vec![(7, GroupMeta::new("Work", GroupColor::Blue))],
        );

        let report = RestoreReconciler::new(&browser, fast())
            .restore(&snap)
            .await
            .unwrap();
        assert_eq!(report.restored, 1);
        assert_eq!(report.groups_created, 0);
    }

    #[tokio::test]
    async fn test_group_restore_skips_open_tabs() {
        let (browser, _) = browser_with(&["https://a.com"]);
        let payload = GroupPayload {
            title: "Work".to_string(),
            color: GroupColor::Cyan,
            tabs: tabs(&["https://a.com", "https://b.com"]),
        };

        let report = RestoreReconciler::new(&browser, fast())
            .restore_group(&payload)
            .await
            .unwrap();

        assert_eq!(report.restored, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.groups_created, 1);

        let groups = browser.groups();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].0.title.as_deref(), Some("Work"));
        assert_eq!(groups[0].0.color, GroupColor::Cyan);
        assert_eq!(groups[0].1, vec!["https://b.com"]);
    }

    #[tokio::test]
    async fn test_group_restore_when_all_open() {
        let (browser, _) = browser_with(&["https://a.com"]);
        let payload = GroupPayload {
            title: String::new(),
            color: GroupColor::Grey,
            tabs: tabs(&["https://a.com"]),
        };

        let report = RestoreReconciler::new(&browser, fast())
            .restore_group(&payload)
            .await
            .unwrap();

        assert_eq!(report.restored, 0);
        assert_eq!(
            report.notice,
            RestoreNotice::GroupAllOpen {
                title: RESTORED_GROUP.to_string(),
                skipped: 1
            }
        );
        assert_eq!(browser.tabs_created(), 0);
    }

    #[test]
    fn test_phase_names() {
        assert_eq!(RestorePhase::AcquiringTargetWindow.to_string(), "acquiring-target-window");
        assert!(RestorePhase::Error.is_terminal());
        assert!(!RestorePhase::Planning.is_terminal());
    }
}
