//! The snapshot document
//!
//! Serialized field names match the stored `lastSession` document so that
//! snapshots written by earlier versions keep loading.

use std::collections::BTreeMap;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::group::{GroupMeta, GroupPayload, GroupSelector, UNGROUPED_TITLE};
use crate::{GroupId, Result, TabError, WindowId};

/// Description used whenever nothing better could be extracted
pub const NO_DESCRIPTION: &str = "No description available";

fn no_description() -> String {
    NO_DESCRIPTION.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabRecord {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fav_icon_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<GroupId>,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default = "no_description")]
    pub description: String,
}

impl TabRecord {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            fav_icon_url: None,
            group_id: None,
            pinned: false,
            description: no_description(),
        }
    }

    pub fn with_group(mut self, group_id: GroupId) -> Self {
        self.group_id = Some(group_id);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Group this tab belongs to; `-1`, `0` and absent all mean ungrouped
    pub fn group(&self) -> Option<GroupId> {
        self.group_id.filter(|id| *id > 0)
    }

    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            &self.url
        } else {
            &self.title
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowRecord {
    pub id: WindowId,
    #[serde(default)]
    pub tabs: Vec<TabRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub windows: Vec<WindowRecord>,
    #[serde(default)]
    pub groups: BTreeMap<GroupId, GroupMeta>,
}

/// One group's share of a snapshot, in tab order
#[derive(Debug)]
pub struct GroupBucket<'a> {
    pub id: GroupId,
    pub meta: Option<&'a GroupMeta>,
    pub tabs: Vec<&'a TabRecord>,
}

/// Snapshot tabs split into grouped buckets and the ungrouped remainder
#[derive(Debug, Default)]
pub struct Partition<'a> {
    pub groups: Vec<GroupBucket<'a>>,
    pub ungrouped: Vec<&'a TabRecord>,
}

impl Snapshot {
    pub fn new(windows: Vec<WindowRecord>, groups: BTreeMap<GroupId, GroupMeta>) -> Self {
        // Millisecond precision, matching the stored form
        Self {
            timestamp: Utc::now().trunc_subsecs(3),
            windows,
            groups,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), BTreeMap::new())
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn tabs(&self) -> impl Iterator<Item = &TabRecord> {
        self.windows.iter().flat_map(|window| window.tabs.iter())
    }

    pub fn tab_count(&self) -> usize {
        self.windows.iter().map(|window| window.tabs.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tab_count() == 0
    }

    /// Remove every tab with `url`, dropping windows and group entries left
    /// without tabs. Returns how many tabs were removed.
    pub fn remove_tab(&mut self, url: &str) -> usize {
        let before = self.tab_count();

        for window in &mut self.windows {
            window.tabs.retain(|tab| tab.url != url);
        }
        self.windows.retain(|window| !window.tabs.is_empty());

        let removed = before - self.tab_count();
        if removed > 0 {
            self.prune_groups();
        }
        removed
    }

    /// Drop group entries no tab references any more
    pub fn prune_groups(&mut self) {
        let referenced: std::collections::BTreeSet<GroupId> =
            self.tabs().filter_map(TabRecord::group).collect();
        self.groups.retain(|id, _| referenced.contains(id));
    }

    /// Bucket tabs by group, ordered by group id, with ungrouped tabs apart.
    /// Buckets never come out empty.
    pub fn partition(&self) -> Partition<'_> {
        let mut grouped: BTreeMap<GroupId, Vec<&TabRecord>> = BTreeMap::new();
        let mut ungrouped = Vec::new();

        for tab in self.tabs() {
            match tab.group() {
                Some(id) => grouped.entry(id).or_default().push(tab),
                None => ungrouped.push(tab),
            }
        }

        let groups = grouped
            .into_iter()
            .map(|(id, tabs)| GroupBucket {
                id,
                meta: self.groups.get(&id),
                tabs,
            })
            .collect();

        Partition { groups, ungrouped }
    }

    /// Collect the restore payload for one bucket of this snapshot
    pub fn group_payload(&self, selector: GroupSelector) -> Result<GroupPayload> {
        let partition = self.partition();

        let (title, color, tabs) = match selector {
            GroupSelector::Ungrouped => (
                UNGROUPED_TITLE.to_string(),
                Default::default(),
                partition.ungrouped,
            ),
            GroupSelector::Group(id) => {
                let bucket = partition
                    .groups
                    .into_iter()
                    .find(|bucket| bucket.id == id)
                    .ok_or_else(|| TabError::GroupNotFound(selector.to_string()))?;
                let meta = bucket.meta.cloned().unwrap_or_else(|| GroupMeta {
                    title: String::new(),
                    color: Default::default(),
                });
                (meta.title, meta.color, bucket.tabs)
            }
        };

        if tabs.is_empty() {
            return Err(TabError::GroupNotFound(selector.to_string()));
        }

        Ok(GroupPayload {
            title,
            color,
            tabs: tabs.into_iter().cloned().collect(),
        })
    }
}
