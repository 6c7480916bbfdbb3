//! Restore planning: what to recreate, what to skip

use std::collections::{BTreeMap, HashSet};

use tabkeep_host::LiveWindow;
use tabkeep_tabs::{is_privileged_url, GroupId, GroupMeta, Snapshot, TabRecord};

/// URLs currently open anywhere in the browser, internal pages excluded
pub fn live_open_urls(windows: &[LiveWindow]) -> HashSet<String> {
    windows
        .iter()
        .flat_map(|w| w.tabs.iter())
        .filter(|t| !t.url.is_empty() && !is_privileged_url(&t.url))
        .map(|t| t.url.clone())
        .collect()
}

/// A snapshot tab scheduled for recreation; `ordinal` is its position in
/// the plan and identifies it across the restore
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedTab {
    pub ordinal: usize,
    pub record: TabRecord,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingGroup {
    pub meta: GroupMeta,
    /// Ordinals of the planned tabs that belong to this group
    pub members: Vec<usize>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestorePlan {
    pub tabs: Vec<PlannedTab>,
    pub skipped: usize,
    pub groups: BTreeMap<GroupId, PendingGroup>,
}

impl RestorePlan {
    /// Plan a full restore. Groups are only scheduled when the snapshot
    /// still has their metadata and at least one member is being restored.
    pub fn for_snapshot(snapshot: &Snapshot, open: &HashSet<String>) -> Self {
        let mut plan = Self::default();

        for tab in snapshot.tabs() {
            if open.contains(&tab.url) {
                plan.skipped += 1;
                tracing::debug!(url = %tab.url, "Skipping already open tab");
                continue;
            }

            let ordinal = plan.tabs.len();
            if let Some(group_id) = tab.group() {
                if let Some(meta) = snapshot.groups.get(&group_id) {
                    plan.groups
                        .entry(group_id)
                        .or_insert_with(|| PendingGroup {
                            meta: meta.clone(),
                            members: Vec::new(),
                        })
                        .members
                        .push(ordinal);
                }
            }
            plan.tabs.push(PlannedTab {
                ordinal,
                record: tab.clone(),
            });
        }

        plan
    }

    /// Plan for a caller-supplied tab list; no groups are scheduled
    pub fn for_tabs(tabs: &[TabRecord], open: &HashSet<String>) -> Self {
        let mut plan = Self::default();

        for tab in tabs {
            if open.contains(&tab.url) {
                plan.skipped += 1;
                continue;
            }
            plan.tabs.push(PlannedTab {
                ordinal: plan.tabs.len(),
                record: tab.clone(),
            });
        }

        plan
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn url_of(&self, ordinal: usize) -> Option<&str> {
        self.tabs.get(ordinal).map(|t| t.record.url.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabkeep_host::{LiveTab, WindowType};
    use tabkeep_tabs::{GroupColor, WindowRecord};

    fn live(urls: &[&str]) -> Vec<LiveWindow> {
        vec![LiveWindow {
            id: 1,
            kind: WindowType::Normal,
            focused: true,
            tabs: urls
                .iter()
                .enumerate()
                .map(|(i, url)| LiveTab {
                    id: i as i64 + 10,
                    window_id: 1,
                    url: url.to_string(),
                    title: String::new(),
                    fav_icon_url: None,
                    group_id: -1,
                    pinned: false,
                    active: false,
                    discarded: false,
                })
                .collect(),
        }]
    }

    fn snapshot() -> Snapshot {
        let mut groups = BTreeMap::new();
        groups.insert(5, GroupMeta::new("Work", GroupColor::Blue));
        Snapshot::new(
            vec![WindowRecord {
                id: 1,
                tabs: vec![
                    TabRecord::new("https://a.com", "A").with_group(5),
                    TabRecord::new("https://b.com", "B").with_group(5),
                    TabRecord::new("https://c.com", "C"),
                    // Group without metadata is restored ungrouped
                    TabRecord::new("https://d.com", "D").with_group(6),
                ],
            }],
            groups,
        )
    }

    #[test]
    fn test_live_open_urls_exclude_internal_pages() {
        let open = live_open_urls(&live(&["https://a.com", "chrome://newtab/", "about:blank"]));
        assert_eq!(open.len(), 1);
        assert!(open.contains("https://a.com"));
    }

    #[test]
    fn test_plan_skips_open_urls() {
        let open = live_open_urls(&live(&["https://a.com"]));
        let plan = RestorePlan::for_snapshot(&snapshot(), &open);

        assert_eq!(plan.skipped, 1);
        let urls: Vec<&str> = plan.tabs.iter().map(|t| t.record.url.as_str()).collect();
        assert_eq!(urls, vec!["https://b.com", "https://c.com", "https://d.com"]);
        assert!(plan.tabs.iter().all(|t| !open.contains(&t.record.url)));

        assert_eq!(plan.groups.len(), 1);
        assert_eq!(plan.groups[&5].members, vec![0]);
        assert_eq!(plan.url_of(0), Some("https://b.com"));
    }

    #[test]
    fn test_fully_open_group_is_not_scheduled() {
        let open = live_open_urls(&live(&["https://a.com", "https://b.com"]));
        let plan = RestorePlan::for_snapshot(&snapshot(), &open);
        assert!(plan.groups.is_empty());
        assert_eq!(plan.skipped + plan.tabs.len(), 4);
    }

    #[test]
    fn test_plan_for_tabs() {
        let tabs = vec![
            TabRecord::new("https://a.com", "A"),
            TabRecord::new("https://b.com", "B"),
        ];
        let plan = RestorePlan::for_tabs(&tabs, &live_open_urls(&live(&["https://b.com"])));
        assert_eq!(plan.skipped, 1);
        assert_eq!(plan.tabs.len(), 1);
        assert!(plan.groups.is_empty());
    }
}
