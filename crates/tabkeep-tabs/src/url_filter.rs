//! Internal browser pages never enter a snapshot and never count as "open"

/// Scheme prefixes of pages that belong to the browser itself
pub const PRIVILEGED_PREFIXES: &[&str] = &[
    "chrome://",
    "chrome-extension://",
    "moz-extension://",
    "edge://",
    "about:",
];

pub fn is_privileged_url(url: &str) -> bool {
    PRIVILEGED_PREFIXES
        .iter()
        .any(|prefix| url.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_privileged_urls() {
        assert!(is_privileged_url("chrome://newtab/"));
        assert!(is_privileged_url("chrome-extension://abc/snapshot.html"));
        assert!(is_privileged_url("about:blank"));
        assert!(is_privileged_url("edge://settings"));
    }

    #[test]
    fn test_regular_urls() {
        assert!(!is_privileged_url("https://example.com"));
        assert!(!is_privileged_url("http://chrome.com/about:"));
        assert!(!is_privileged_url("file:///tmp/notes.txt"));
    }
}
