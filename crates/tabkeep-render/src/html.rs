//! Shared markup helpers

use chrono::{DateTime, Local, Utc};

/// Grey page glyph used when a tab has no icon
pub const FALLBACK_FAVICON: &str = "data:image/svg+xml,<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 16 16\"><path fill=\"%23999\" d=\"M2 3a1 1 0 011-1h10a1 1 0 011 1v10a1 1 0 01-1 1H3a1 1 0 01-1-1V3z\"/></svg>";

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

pub(crate) fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

pub(crate) const BASE_CSS: &str = r#"
:root {
  --bg: #f5f7fb;
  --card: #ffffff;
  --text: #2c3e50;
  --muted: #64748b;
  --border: #e5e7eb;
  --accent: #4a6cf7;
}
@media (prefers-color-scheme: dark) {
  :root { --bg: #16213e; --card: #2a2a40; --text: #e2e8f0; --muted: #94a3b8; --border: #3f3f5a; }
}
* { box-sizing: border-box; }
body { margin: 0; padding: 24px; font-family: system-ui, sans-serif; background: var(--bg); color: var(--text); }
header { display: flex; flex-wrap: wrap; align-items: center; justify-content: space-between; gap: 12px; margin-bottom: 24px; }
h1 { font-size: 22px; margin: 0; }
.stats { color: var(--muted); font-size: 14px; }
button { cursor: pointer; border: 1px solid var(--border); border-radius: 6px; background: var(--card); color: var(--text); padding: 6px 12px; }
button.primary { background: var(--accent); border-color: var(--accent); color: #fff; }
details { background: var(--card); border: 1px solid var(--border); border-radius: 10px; margin-bottom: 16px; }
summary { display: flex; align-items: center; gap: 10px; padding: 12px 16px; cursor: pointer; font-weight: 600; }
.group-indicator { width: 12px; height: 12px; border-radius: 50%; flex-shrink: 0; }
.group-count { color: var(--muted); font-weight: normal; font-size: 13px; }
.group-actions { margin-left: auto; }
.tab-grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(280px, 1fr)); gap: 12px; padding: 0 16px 16px; }
.tab-card { position: relative; display: flex; gap: 10px; padding: 12px; border: 1px solid var(--border); border-radius: 8px; }
.tab-card a { color: inherit; text-decoration: none; display: flex; gap: 10px; min-width: 0; flex: 1; }
.tab-card img { width: 16px; height: 16px; margin-top: 2px; flex-shrink: 0; }
.tab-title { font-weight: 600; white-space: nowrap; overflow: hidden; text-overflow: ellipsis; }
.tab-description, .tab-url { font-size: 12px; color: var(--muted); overflow: hidden; text-overflow: ellipsis; }
.tab-url { white-space: nowrap; }
.pinned { font-size: 11px; color: var(--accent); }
.delete-tab { position: absolute; top: 6px; right: 6px; padding: 0 6px; border: none; background: transparent; color: var(--muted); }
.no-tabs { text-align: center; color: var(--muted); padding: 64px 0; }
"#;

pub(crate) fn page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{title}</title>
<style>{css}</style>
</head>
<body>
{body}
</body>
</html>
"#,
        title = escape_html(title),
        css = BASE_CSS,
        body = body,
    )
}
