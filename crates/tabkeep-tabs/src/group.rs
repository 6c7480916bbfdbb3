//! Tab group metadata

use serde::{Deserialize, Serialize};

use crate::snapshot::TabRecord;
use crate::GroupId;

/// The browser's fixed tab-group palette
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GroupColor {
    #[default]
    Grey,
    Blue,
    Red,
    Yellow,
    Green,
    Pink,
    Purple,
    Cyan,
    Orange,
}

impl GroupColor {
    pub const ALL: [GroupColor; 9] = [
        GroupColor::Grey,
        GroupColor::Blue,
        GroupColor::Red,
        GroupColor::Yellow,
        GroupColor::Green,
        GroupColor::Pink,
        GroupColor::Purple,
        GroupColor::Cyan,
        GroupColor::Orange,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GroupColor::Grey => "grey",
            GroupColor::Blue => "blue",
            GroupColor::Red => "red",
            GroupColor::Yellow => "yellow",
            GroupColor::Green => "green",
            GroupColor::Pink => "pink",
            GroupColor::Purple => "purple",
            GroupColor::Cyan => "cyan",
            GroupColor::Orange => "orange",
        }
    }

    /// Swatch used by the snapshot page
    pub fn swatch(&self) -> &'static str {
        match self {
            GroupColor::Grey => "#5a6c7d",
            GroupColor::Blue => "#4a6cf7",
            GroupColor::Red => "#6366f1",
            GroupColor::Yellow => "#8b5cf6",
            GroupColor::Green => "#667eea",
            GroupColor::Pink => "#7c3aed",
            GroupColor::Purple => "#818cf8",
            GroupColor::Cyan => "#3b82f6",
            GroupColor::Orange => "#6366f1",
        }
    }
}

impl std::fmt::Display for GroupColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for GroupColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GroupColor::ALL
            .into_iter()
            .find(|color| color.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown group color: {}", s))
    }
}

// Stored documents may carry colors from a newer palette
impl From<String> for GroupColor {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_default()
    }
}

impl From<GroupColor> for String {
    fn from(value: GroupColor) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMeta {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub color: GroupColor,
}

impl GroupMeta {
    pub fn new(title: impl Into<String>, color: GroupColor) -> Self {
        Self {
            title: title.into(),
            color,
        }
    }

    /// Title for display, or `fallback` when the stored one is blank
    pub fn title_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        let trimmed = self.title.trim();
        if trimmed.is_empty() {
            fallback
        } else {
            trimmed
        }
    }
}

/// Title given to the group recreated from the ungrouped bucket
pub const UNGROUPED_TITLE: &str = "Ungrouped tabs";

/// Which bucket of a stored snapshot a group restore refers to.
///
/// On the wire this is the page's `data-group-id` value: `"ungrouped"`, or
/// a group id given either as a number or as a numeric string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "SelectorWire", into = "String")]
pub enum GroupSelector {
    Group(GroupId),
    Ungrouped,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SelectorWire {
    Id(GroupId),
    Text(String),
}

impl TryFrom<SelectorWire> for GroupSelector {
    type Error = String;

    fn try_from(wire: SelectorWire) -> Result<Self, Self::Error> {
        match wire {
            SelectorWire::Id(id) => Ok(GroupSelector::Group(id)),
            SelectorWire::Text(text) => text.trim().parse(),
        }
    }
}

impl From<GroupSelector> for String {
    fn from(selector: GroupSelector) -> Self {
        selector.to_string()
    }
}

impl std::fmt::Display for GroupSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GroupSelector::Group(id) => write!(f, "{}", id),
            GroupSelector::Ungrouped => write!(f, "ungrouped"),
        }
    }
}

impl std::str::FromStr for GroupSelector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("ungrouped") {
            return Ok(GroupSelector::Ungrouped);
        }
        s.parse::<GroupId>()
            .map(GroupSelector::Group)
            .map_err(|_| format!("Unknown group selector: {}", s))
    }
}

/// Tabs of one bucket plus the title and color to give the recreated group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupPayload {
    pub title: String,
    #[serde(default)]
    pub color: GroupColor,
    pub tabs: Vec<TabRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_parse() {
        assert_eq!("blue".parse::<GroupColor>().unwrap(), GroupColor::Blue);
        assert_eq!("GREY".parse::<GroupColor>().unwrap(), GroupColor::Grey);
        assert!("magenta".parse::<GroupColor>().is_err());
    }

    #[test]
    fn test_unknown_color_deserializes_to_default() {
        let meta: GroupMeta = serde_json::from_str(r#"{"title":"Work","color":"magenta"}"#).unwrap();
        assert_eq!(meta.color, GroupColor::Grey);

        let meta: GroupMeta = serde_json::from_str(r#"{"title":"Work","color":"cyan"}"#).unwrap();
        assert_eq!(meta.color, GroupColor::Cyan);
        assert_eq!(serde_json::to_string(&meta).unwrap(), r#"{"title":"Work","color":"cyan"}"#);
    }

    #[test]
    fn test_title_fallback() {
        let meta = GroupMeta::new("   ", GroupColor::Red);
        assert_eq!(meta.title_or("Unnamed group"), "Unnamed group");

        let meta = GroupMeta::new("Work", GroupColor::Red);
        assert_eq!(meta.title_or("Unnamed group"), "Work");
    }

    #[test]
    fn test_selector_parse() {
        assert_eq!("ungrouped".parse::<GroupSelector>().unwrap(), GroupSelector::Ungrouped);
        assert_eq!("42".parse::<GroupSelector>().unwrap(), GroupSelector::Group(42));
        assert!("work".parse::<GroupSelector>().is_err());
    }

    #[test]
    fn test_selector_from_page_payload() {
        let parse = |raw: &str| serde_json::from_str::<GroupSelector>(raw);

        assert_eq!(parse(r#""4""#).unwrap(), GroupSelector::Group(4));
        assert_eq!(parse("4").unwrap(), GroupSelector::Group(4));
        assert_eq!(parse(r#""ungrouped""#).unwrap(), GroupSelector::Ungrouped);
        assert!(parse(r#""work""#).is_err());
        assert!(parse("true").is_err());

        assert_eq!(serde_json::to_string(&GroupSelector::Group(4)).unwrap(), r#""4""#);
        assert_eq!(
            serde_json::to_string(&GroupSelector::Ungrouped).unwrap(),
            r#""ungrouped""#
        );
    }
}
