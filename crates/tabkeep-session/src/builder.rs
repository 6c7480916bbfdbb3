//! Snapshot Builder
//!
//! Enumerates live windows, drops internal pages, and enriches each tab with a
//! best-effort description. Only the window enumeration itself can fail the
//! capture; group lookup and description extraction degrade to defaults.

use std::collections::BTreeMap;
use std::time::Duration;

use tabkeep_host::{BrowserHost, LiveTab};
use tabkeep_tabs::{
    is_privileged_url, GroupId, GroupMeta, Snapshot, TabRecord, WindowRecord, NO_DESCRIPTION,
};

use crate::describe::describe_document;
use crate::Result;

/// Title given to captured groups the user never named
pub const UNNAMED_GROUP: &str = "Unnamed group";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderOptions {
    /// Script each page for a description
    pub describe_pages: bool,
    pub description_timeout: Duration,
}

impl Default for BuilderOptions {
    fn default() -> Self {
        Self {
            describe_pages: true,
            description_timeout: Duration::from_millis(1500),
        }
    }
}

pub struct SnapshotBuilder {
    options: BuilderOptions,
}

impl SnapshotBuilder {
    pub fn new(options: BuilderOptions) -> Self {
        Self { options }
    }

    /// Full capture, describing every scriptable page
    pub async fn build<H: BrowserHost + ?Sized>(&self, host: &H) -> Result<Snapshot> {
        self.capture(host, self.options.describe_pages).await
    }

    /// Capture without touching page content; every description is the placeholder
    pub async fn build_basic<H: BrowserHost + ?Sized>(&self, host: &H) -> Result<Snapshot> {
        self.capture(host, false).await
    }

    async fn capture<H: BrowserHost + ?Sized>(&self, host: &H, describe: bool) -> Result<Snapshot> {
        let live_windows = host.windows().await?;
        let groups = collect_groups(host).await;

        let mut windows = Vec::with_capacity(live_windows.len());
        for window in live_windows {
            let mut tabs = Vec::with_capacity(window.tabs.len());

            for tab in &window.tabs {
                if tab.url.is_empty() || is_privileged_url(&tab.url) {
                    continue;
                }

                let description = if describe {
                    self.describe_tab(host, tab).await
                } else {
                    NO_DESCRIPTION.to_string()
                };

                tabs.push(TabRecord {
                    url: tab.url.clone(),
                    title: tab.title.clone(),
                    fav_icon_url: tab.fav_icon_url.clone(),
                    group_id: Some(tab.group_id),
                    pinned: tab.pinned,
                    description,
                });
            }

            if !tabs.is_empty() {
                windows.push(WindowRecord {
                    id: window.id,
                    tabs,
                });
            }
        }

        let snapshot = Snapshot::new(windows, groups);
        tracing::info!(
            windows = snapshot.windows.len(),
            tabs = snapshot.tab_count(),
            groups = snapshot.groups.len(),
            described = describe,
            "Captured snapshot"
        );
        Ok(snapshot)
    }

    async fn describe_tab<H: BrowserHost + ?Sized>(&self, host: &H, tab: &LiveTab) -> String {
        if tab.discarded {
            return NO_DESCRIPTION.to_string();
        }

        match tokio::time::timeout(self.options.description_timeout, host.page_document(tab.id))
            .await
        {
            Ok(Ok(html)) => describe_document(&html),
            Ok(Err(e)) => {
                tracing::debug!(url = %tab.url, error = %e, "Page description failed");
                NO_DESCRIPTION.to_string()
            }
            Err(_) => {
                tracing::debug!(url = %tab.url, "Page description timed out");
                NO_DESCRIPTION.to_string()
            }
        }
    }
}

async fn collect_groups<H: BrowserHost + ?Sized>(host: &H) -> BTreeMap<GroupId, GroupMeta> {
    match host.tab_groups().await {
        Ok(groups) => groups
            .into_iter()
            .map(|group| {
                let title = group
                    .title
                    .filter(|t| !t.trim().is_empty())
                    .unwrap_or_else(|| UNNAMED_GROUP.to_string());
                (group.id, GroupMeta::new(title, group.color))
            })
            .collect(),
        Err(e) => {
            tracing::warn!(error = %e, "Unable to read tab groups, capturing without them");
            BTreeMap::new()
        }
    }
}
