//! Live browser state as reported by the host

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tabkeep_tabs::{GroupColor, GroupId, MemoryProfile, TabId, WindowId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowType {
    #[default]
    Normal,
    Popup,
    App,
    DevTools,
}

impl WindowType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WindowType::Normal => "normal",
            WindowType::Popup => "popup",
            WindowType::App => "app",
            WindowType::DevTools => "devtools",
        }
    }
}

impl std::fmt::Display for WindowType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for WindowType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "normal" => Ok(WindowType::Normal),
            "popup" => Ok(WindowType::Popup),
            "app" => Ok(WindowType::App),
            "devtools" => Ok(WindowType::DevTools),
            _ => Err(format!("Unknown window type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveTab {
    pub id: TabId,
    pub window_id: WindowId,
    pub url: String,
    pub title: String,
    pub fav_icon_url: Option<String>,
    /// `-1` when the tab is not in a group
    pub group_id: GroupId,
    pub pinned: bool,
    pub active: bool,
    /// Unloaded by the browser; page scripting is not possible
    pub discarded: bool,
}

impl LiveTab {
    pub fn group(&self) -> Option<GroupId> {
        Some(self.group_id).filter(|id| *id > 0)
    }
}

impl MemoryProfile for LiveTab {
    fn url(&self) -> &str {
        &self.url
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveWindow {
    pub id: WindowId,
    pub kind: WindowType,
    pub focused: bool,
    pub tabs: Vec<LiveTab>,
}

impl LiveWindow {
    pub fn is_normal(&self) -> bool {
        self.kind == WindowType::Normal
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveGroup {
    pub id: GroupId,
    pub window_id: WindowId,
    pub title: Option<String>,
    pub color: GroupColor,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewWindow {
    /// Initial page; the browser opens its new-tab page when absent
    pub url: Option<String>,
    pub maximized: bool,
    pub focused: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTab {
    pub window_id: WindowId,
    pub url: String,
    pub pinned: bool,
    pub active: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabUpdate {
    pub url: Option<String>,
    pub active: Option<bool>,
}

impl TabUpdate {
    pub fn navigate(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            active: Some(true),
        }
    }

    pub fn activate() -> Self {
        Self {
            url: None,
            active: Some(true),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryQuery {
    pub text: String,
    pub start_time: DateTime<Utc>,
    pub max_results: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryItem {
    pub url: String,
    pub title: String,
    pub visit_count: u32,
    pub last_visit_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabkeep_tabs::NO_GROUP;

    #[test]
    fn test_window_type_parse() {
        assert_eq!("normal".parse::<WindowType>().unwrap(), WindowType::Normal);
        assert_eq!("DevTools".parse::<WindowType>().unwrap(), WindowType::DevTools);
        assert!("panel".parse::<WindowType>().is_err());
    }

    #[test]
    fn test_live_tab_group() {
        let mut tab = LiveTab {
            id: 1,
            window_id: 1,
            url: "https://a.com".to_string(),
            title: "A".to_string(),
            fav_icon_url: None,
            group_id: NO_GROUP,
            pinned: false,
            active: false,
            discarded: false,
        };
        assert_eq!(tab.group(), None);

        tab.group_id = 4;
        assert_eq!(tab.group(), Some(4));
    }
}
