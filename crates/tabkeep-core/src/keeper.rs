//! The coordinator
//!
//! `Keeper` owns the snapshot store and the browser handle and turns UI
//! requests, shortcuts and window events into capture, restore and page
//! rendering. Save, restore and delete run one at a time behind a gate so
//! they never interleave on the stored slot.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use tabkeep_host::{BrowserHost, HostError, NewTab, NewWindow, Notification, TabUpdate};
use tabkeep_render::{fallback_page, render_history, render_snapshot, LiveSummary};
use tabkeep_session::{
    collect_history, BatchPolicy, RemoteStatus, RestoreReconciler, RestoreTimings, SaveReport,
    SnapshotBuilder, SnapshotStore,
};
use tabkeep_storage::Database;
use tabkeep_tabs::{estimate_memory_mb, is_privileged_url, GroupSelector, Snapshot, TabId, WindowId};

use crate::config::Config;
use crate::debounce::Debouncer;
use crate::error::CoreError;
use crate::message::{
    Ack, CloseReport, DeleteReport, GroupRestoreResponse, HomepageInstruction, Request, Response,
    RestoreResponse, Shortcut,
};
use crate::Result;

pub const SNAPSHOT_PAGE: &str = "snapshot.html";
pub const HISTORY_PAGE: &str = "history.html";

const RESTORE_POLICY_SETTING: &str = "restore_policy";
const NOTIFICATION_TITLE: &str = "tabkeep";

/// Pauses used by the keeper itself and by the restores it runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeeperTimings {
    pub restore: RestoreTimings,
    /// Wait after pointing a tab at the snapshot page, before closing the rest
    pub navigation_settle: Duration,
    /// Between two tab closes in save-and-close
    pub close_spacing: Duration,
}

impl Default for KeeperTimings {
    fn default() -> Self {
        Self {
            restore: RestoreTimings::default(),
            navigation_settle: Duration::from_millis(500),
            close_spacing: Duration::from_millis(50),
        }
    }
}

impl KeeperTimings {
    pub fn immediate() -> Self {
        Self {
            restore: RestoreTimings::immediate(),
            navigation_settle: Duration::ZERO,
            close_spacing: Duration::ZERO,
        }
    }
}

pub struct Keeper<H: BrowserHost + ?Sized> {
    host: Arc<H>,
    db: Database,
    store: SnapshotStore,
    config: Config,
    timings: KeeperTimings,
    gate: Arc<Mutex<()>>,
    autosave: Debouncer,
}

impl<H: BrowserHost + ?Sized> Keeper<H> {
    /// Open the database named by `config` and start a keeper on it
    pub async fn open(host: Arc<H>, config: Config) -> Result<Self> {
        if let Some(parent) = config.database_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::open(&config.database_path)?;
        Ok(Self::new(host, db, config).await)
    }

    /// Remote sync is decided here, once: it needs both the config flag and
    /// a signed-in browser profile
    pub async fn new(host: Arc<H>, db: Database, config: Config) -> Self {
        let signed_in = match host.signed_in_account().await {
            Ok(account) => account.is_some(),
            Err(e) => {
                tracing::warn!(error = %e, "Could not read account state, remote sync off");
                false
            }
        };
        let remote_enabled = config.remote_sync && signed_in;
        let store = SnapshotStore::new(&db, remote_enabled, config.remote_chunk_size);
        let autosave = Debouncer::new(config.autosave_debounce());

        tracing::info!(remote = remote_enabled, "Keeper initialized");

        Self {
            host,
            db,
            store,
            config,
            timings: KeeperTimings::default(),
            gate: Arc::new(Mutex::new(())),
            autosave,
        }
    }

    pub fn with_timings(mut self, timings: KeeperTimings) -> Self {
        self.timings = timings;
        self
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn snapshot_url(&self) -> String {
        self.host.extension_url(SNAPSHOT_PAGE)
    }

    // === Preferences ===

    /// The saved preference, else the configured default
    pub fn restore_policy(&self) -> BatchPolicy {
        match self.db.get_setting(RESTORE_POLICY_SETTING) {
            Ok(Some(raw)) => raw.parse::<BatchPolicy>().unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Ignoring saved restore policy");
                self.config.restore_policy
            }),
            Ok(None) => self.config.restore_policy,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read restore policy");
                self.config.restore_policy
            }
        }
    }

    pub fn set_restore_policy(&self, policy: BatchPolicy) -> Result<()> {
        self.db.set_setting(RESTORE_POLICY_SETTING, policy.as_str())?;
        Ok(())
    }

    // === Saving ===

    /// Capture every window, store it locally (and remotely when enabled),
    /// then render the snapshot page
    pub async fn save_session(&self) -> Result<SaveReport> {
        let _gate = self.gate.lock().await;
        let snapshot = self.capture().await?;
        self.persist(&snapshot).await
    }

    async fn capture(&self) -> Result<Snapshot> {
        let builder = SnapshotBuilder::new(self.config.builder_options());
        Ok(builder.build(self.host.as_ref()).await?)
    }

    async fn persist(&self, snapshot: &Snapshot) -> Result<SaveReport> {
        let report = self.store.save(snapshot)?;
        self.store_page(snapshot).await?;

        if let RemoteStatus::Failed(reason) = &report.remote {
            self.notify(format!("Cloud sync failed, snapshot saved locally only: {}", reason));
        }

        tracing::info!(
            windows = snapshot.windows.len(),
            tabs = snapshot.tab_count(),
            revision = report.revision,
            "Session saved"
        );
        Ok(report)
    }

    /// Unscripted capture written to the local slot only
    async fn save_basic(&self) -> Result<u64> {
        let builder = SnapshotBuilder::new(self.config.builder_options());
        let snapshot = builder.build_basic(self.host.as_ref()).await?;
        let revision = self.store.repository().put(&snapshot)?;
        self.store_page(&snapshot).await?;

        tracing::info!(tabs = snapshot.tab_count(), revision, "Basic session saved");
        Ok(revision)
    }

    // === Pages ===

    async fn live_summary(&self) -> Option<LiveSummary> {
        match self.host.windows().await {
            Ok(windows) => {
                let tabs: Vec<_> = windows
                    .iter()
                    .flat_map(|w| w.tabs.iter())
                    .filter(|t| !is_privileged_url(&t.url))
                    .collect();
                Some(LiveSummary {
                    tab_count: tabs.len(),
                    memory_mb: estimate_memory_mb(tabs.iter().copied()),
                })
            }
            Err(e) => {
                tracing::debug!(error = %e, "No live summary for snapshot page");
                None
            }
        }
    }

    async fn store_page(&self, snapshot: &Snapshot) -> Result<String> {
        let live = self.live_summary().await;
        let html = render_snapshot(snapshot, live.as_ref());
        self.store.repository().put_page(&html)?;
        Ok(html)
    }

    /// Re-render the page for the stored snapshot. `None` when nothing was
    /// ever saved; the fallback page when the stored document is unreadable.
    pub async fn generate_snapshot_html(&self) -> Result<Option<String>> {
        match self.store.load() {
            Ok(Some(snapshot)) => Ok(Some(self.store_page(&snapshot).await?)),
            Ok(None) => Ok(None),
            Err(e) => {
                tracing::warn!(error = %e, "Stored snapshot unreadable, storing fallback page");
                let html = fallback_page();
                self.store.repository().put_page(&html)?;
                Ok(Some(html))
            }
        }
    }

    /// Show the snapshot page if a snapshot with tabs exists
    pub async fn open_snapshot_page(&self) -> Result<bool> {
        let snapshot = match self.store.load()? {
            Some(snapshot) if !snapshot.is_empty() => snapshot,
            _ => {
                tracing::debug!("No snapshot to show");
                return Ok(false);
            }
        };

        self.store_page(&snapshot).await?;
        self.open_page(SNAPSHOT_PAGE).await?;
        Ok(true)
    }

    async fn open_page(&self, page: &str) -> Result<()> {
        let url = self.host.extension_url(page);
        match self.host.current_window().await {
            Ok(window) => {
                self.host
                    .create_tab(NewTab {
                        window_id: window.id,
                        url,
                        pinned: false,
                        active: true,
                    })
                    .await?;
            }
            Err(HostError::NoCurrentWindow) | Err(HostError::WindowNotFound(_)) => {
                self.host
                    .create_window(NewWindow {
                        url: Some(url),
                        maximized: false,
                        focused: true,
                    })
                    .await?;
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    pub async fn on_startup(&self) {
        match self.open_snapshot_page().await {
            Ok(true) => tracing::info!("Opened snapshot page on startup"),
            Ok(false) => {}
            Err(e) => tracing::warn!(error = %e, "Failed to open snapshot page on startup"),
        }
    }

    // === Restoring ===

    /// Restore the preferred snapshot (a newer remote copy wins) with
    /// `policy`, or the saved default
    pub async fn restore_snapshot(&self, policy: Option<BatchPolicy>) -> RestoreResponse {
        let _gate = self.gate.lock().await;

        let snapshot = match self.store.load_preferred() {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return RestoreResponse::no_snapshot(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to load snapshot");
                return RestoreResponse::failed(e);
            }
        };
        if snapshot.is_empty() {
            return RestoreResponse::empty_snapshot();
        }

        let policy = policy.unwrap_or_else(|| self.restore_policy());
        let options = self
            .config
            .restore_options(policy, self.timings.restore.clone());

        match RestoreReconciler::new(self.host.as_ref(), options)
            .restore(&snapshot)
            .await
        {
            Ok(report) => {
                RestoreResponse::restored(report.restored, report.skipped, report.notice.to_string())
            }
            Err(e) => RestoreResponse::failed(e),
        }
    }

    /// Restore one bucket of the stored snapshot into a single new group
    pub async fn restore_group(&self, selector: GroupSelector) -> GroupRestoreResponse {
        let _gate = self.gate.lock().await;

        let snapshot = match self.store.load() {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return RestoreResponse::no_snapshot(),
            Err(e) => return RestoreResponse::failed(e),
        };
        let payload = match snapshot.group_payload(selector) {
            Ok(payload) => payload,
            Err(e) => return RestoreResponse::failed(e),
        };

        let options = self
            .config
            .restore_options(self.restore_policy(), self.timings.restore.clone());

        match RestoreReconciler::new(self.host.as_ref(), options)
            .restore_group(&payload)
            .await
        {
            Ok(report) => {
                RestoreResponse::restored(report.restored, report.skipped, report.notice.to_string())
            }
            Err(e) => RestoreResponse::failed(e),
        }
    }

    // === Editing ===

    /// Drop every tab with `url` from the stored snapshot and re-render its
    /// page. The live browser is not touched.
    pub async fn delete_tab(&self, url: &str) -> Result<DeleteReport> {
        let _gate = self.gate.lock().await;
        let repository = self.store.repository();

        let before = repository.get()?.map(|s| s.tab_count()).unwrap_or(0);
        match repository.delete_tab(url)? {
            Some(updated) => {
                self.store_page(&updated).await?;
                Ok(DeleteReport {
                    removed: before.saturating_sub(updated.tab_count()),
                    remaining: updated.tab_count(),
                })
            }
            None => Ok(DeleteReport {
                removed: 0,
                remaining: before,
            }),
        }
    }

    // === Save and close ===

    /// Save, turn the active tab of `window` (default: the current window)
    /// into the snapshot page and close every other tab in it
    pub async fn save_and_close_window(&self, window: Option<WindowId>) -> Result<CloseReport> {
        {
            let _gate = self.gate.lock().await;
            let saved = match self.capture().await {
                Ok(snapshot) => self.persist(&snapshot).await.map(|_| ()),
                Err(e) => Err(e),
            };
            if let Err(e) = saved {
                tracing::warn!(error = %e, "Full save failed, trying basic save");
                if let Err(e) = self.save_basic().await {
                    tracing::warn!(error = %e, "Basic save failed, closing tabs anyway");
                }
            }
        }

        let window_id = match window {
            Some(id) => id,
            None => self.host.current_window().await?.id,
        };
        let live = self.host.window(window_id).await?;
        let initial = live.tabs.len();

        let keep = live
            .tabs
            .iter()
            .find(|t| t.active)
            .or_else(|| live.tabs.first())
            .map(|t| t.id)
            .ok_or(CoreError::NoActiveTab(window_id))?;

        let snapshot_url = self.snapshot_url();
        self.host
            .update_tab(keep, TabUpdate::navigate(snapshot_url.clone()))
            .await?;
        pause(self.timings.navigation_settle).await;

        let others: Vec<TabId> = live
            .tabs
            .iter()
            .map(|t| t.id)
            .filter(|id| *id != keep)
            .collect();

        let mut closed = 0;
        for (i, tab_id) in others.iter().enumerate() {
            if i > 0 {
                pause(self.timings.close_spacing).await;
            }
            match self.host.remove_tab(*tab_id).await {
                Ok(()) => closed += 1,
                Err(e) => tracing::warn!(tab = tab_id, error = %e, "Failed to close tab"),
            }
        }

        let remaining = match self.host.window(window_id).await {
            Ok(window) => {
                if let Some(page) = window.tabs.iter().find(|t| t.url == snapshot_url) {
                    if let Err(e) = self.host.update_tab(page.id, TabUpdate::activate()).await {
                        tracing::warn!(error = %e, "Could not activate snapshot tab");
                    }
                }
                window.tabs.len()
            }
            Err(e) => {
                tracing::warn!(window = window_id, error = %e, "Window gone after closing tabs");
                0
            }
        };

        tracing::info!(closed, remaining, initial, "Saved and closed window");
        Ok(CloseReport {
            closed,
            remaining,
            initial,
        })
    }

    // === History ===

    /// Collect the most visited sites, store them with their page and
    /// return the page URL
    pub async fn generate_history_snapshot(&self) -> Result<String> {
        let history = collect_history(self.host.as_ref()).await?;
        let html = render_history(&history);
        self.store.repository().put_history(&history, &html)?;

        tracing::info!(sites = history.sites.len(), "History snapshot stored");
        Ok(self.host.extension_url(HISTORY_PAGE))
    }

    pub fn set_homepage(&self, url: &str) -> HomepageInstruction {
        tracing::info!(url, "Asking user to set homepage");
        HomepageInstruction {
            instruct_user: true,
            url: url.to_string(),
        }
    }

    // === Events ===

    /// Feed a window-closed event. Only the last close of a burst looks at
    /// the browser, and only once no window is left.
    ///
    /// At that point the browser normally has no tabs to capture, so this
    /// keeps the stored snapshot untouched and returns `None`. A save happens
    /// only if the host still reports tabs with no window open.
    pub async fn on_window_removed(&self) -> Result<Option<SaveReport>> {
        if !self.autosave.settle().await {
            return Ok(None);
        }

        let windows = self.host.windows().await?;
        if !windows.is_empty() {
            tracing::debug!(remaining = windows.len(), "Windows still open, no auto-save");
            return Ok(None);
        }

        let _gate = self.gate.lock().await;
        let snapshot = self.capture().await?;
        if snapshot.is_empty() {
            tracing::info!("All windows closed, nothing to capture; keeping stored snapshot");
            return Ok(None);
        }

        tracing::info!("All windows closed, saving session");
        self.persist(&snapshot).await.map(Some)
    }

    // === Dispatch ===

    pub async fn handle(&self, request: Request) -> Response {
        tracing::debug!(?request, "Request");

        match request {
            Request::SaveSession => ack(self.save_session().await.map(|_| ())),
            Request::OpenSnapshot => ack(self.open_snapshot_page().await.map(|_| ())),
            Request::RestoreSnapshot { policy } => {
                Response::Restore(self.restore_snapshot(policy).await)
            }
            Request::SaveAndCloseWindow { window } => {
                match self.save_and_close_window(window).await {
                    Ok(report) => Response::Closed {
                        success: true,
                        report,
                    },
                    Err(e) => failed("Save and close", e),
                }
            }
            Request::RestoreGroup { selector } => {
                Response::Restore(self.restore_group(selector).await)
            }
            Request::DeleteTab { url } => match self.delete_tab(&url).await {
                Ok(report) => Response::Deleted {
                    success: true,
                    report,
                },
                Err(e) => failed("Delete tab", e),
            },
            Request::GenerateSnapshotHtml => match self.generate_snapshot_html().await {
                Ok(html) => Response::Html(html),
                Err(e) => {
                    tracing::error!(error = %e, "Snapshot page generation failed");
                    Response::Html(None)
                }
            },
            Request::GenerateHistorySnapshot => match self.generate_history_snapshot().await {
                Ok(url) => Response::History {
                    success: true,
                    history_snapshot_url: url,
                },
                Err(e) => failed("History snapshot", e),
            },
            Request::SetHomepage { url } => Response::Homepage {
                success: true,
                instruction: self.set_homepage(&url),
            },
        }
    }

    /// Run a keyboard command and tell the user how it went
    pub async fn handle_shortcut(&self, shortcut: Shortcut) {
        tracing::info!(%shortcut, "Shortcut");

        let outcome: Result<Option<String>> = match shortcut {
            Shortcut::SaveSnapshot => self
                .save_session()
                .await
                .map(|_| Some("Snapshot saved".to_string())),
            Shortcut::RestoreSnapshot => {
                let response = self.restore_snapshot(None).await;
                Ok(response.message.or(response.error))
            }
            Shortcut::SaveAndClose => self.save_and_close_window(None).await.map(|_| None),
            Shortcut::ViewSnapshot => self
                .open_snapshot_page()
                .await
                .map(|opened| (!opened).then(|| "No snapshot saved yet".to_string())),
        };

        match outcome {
            Ok(Some(message)) => self.notify(message),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(%shortcut, error = %e, "Shortcut failed");
                self.notify(format!("{} failed: {}", shortcut, e));
            }
        }
    }

    fn notify(&self, message: impl Into<String>) {
        self.host
            .notify(Notification::new(NOTIFICATION_TITLE, message));
    }
}

impl<H: BrowserHost + ?Sized> Clone for Keeper<H> {
    fn clone(&self) -> Self {
        Self {
            host: Arc::clone(&self.host),
            db: self.db.clone(),
            store: self.store.clone(),
            config: self.config.clone(),
            timings: self.timings.clone(),
            gate: Arc::clone(&self.gate),
            autosave: self.autosave.clone(),
        }
    }
}

fn ack(result: Result<()>) -> Response {
    match result {
        Ok(()) => Response::Ack(Ack::ok()),
        Err(e) => failed("Request", e),
    }
}

fn failed(what: &str, error: CoreError) -> Response {
    tracing::error!(error = %error, "{} failed", what);
    Response::Ack(Ack::failed(error))
}

async fn pause(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}
