//! The snapshot page

use tabkeep_session::UNNAMED_GROUP;
use tabkeep_tabs::{
    estimate_memory_mb, format_memory, memory_summary, GroupColor, Snapshot, TabRecord,
    UNGROUPED_TITLE,
};

use crate::html::{escape_html, format_timestamp, page, FALLBACK_FAVICON};

/// Tabs open right now, for comparison with the snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveSummary {
    pub tab_count: usize,
    pub memory_mb: u64,
}

/// Render `snapshot` as a standalone page: one collapsible section per group,
/// ungrouped tabs last, or an empty-state message when there are no tabs
pub fn render_snapshot(snapshot: &Snapshot, live: Option<&LiveSummary>) -> String {
    let tab_count = snapshot.tab_count();
    let memory_mb = estimate_memory_mb(snapshot.tabs());
    let date = format_timestamp(&snapshot.timestamp);
    let partition = snapshot.partition();

    let mut body = String::new();

    body.push_str(&format!(
        r#"<header>
<div>
<h1>Tab snapshot · {date}</h1>
<div class="stats">{windows} windows · {groups} groups · {summary}</div>"#,
        date = escape_html(&date),
        windows = snapshot.windows.len(),
        groups = partition.groups.len(),
        summary = escape_html(&memory_summary(tab_count, memory_mb)),
    ));
    if let Some(live) = live {
        body.push_str(&format!(
            r#"
<div class="stats current">Current {} tabs · {}</div>"#,
            live.tab_count,
            escape_html(&format_memory(live.memory_mb)),
        ));
    }
    body.push_str("\n</div>\n");
    if tab_count > 0 {
        body.push_str(&format!(
            r#"<button class="primary" data-action="restore-snapshot" title="Restore all ({})">Restore all</button>"#,
            escape_html(&memory_summary(tab_count, memory_mb)),
        ));
    }
    body.push_str("\n</header>\n<main>\n");

    if tab_count == 0 {
        body.push_str(r#"<div class="no-tabs">No tabs in this snapshot</div>"#);
    }

    for bucket in &partition.groups {
        let (title, color) = match bucket.meta {
            Some(meta) => (meta.title_or(UNNAMED_GROUP), meta.color),
            None => (UNNAMED_GROUP, GroupColor::Grey),
        };
        render_section(
            &mut body,
            &bucket.id.to_string(),
            title,
            Some(color),
            &bucket.tabs,
        );
    }

    if !partition.ungrouped.is_empty() {
        render_section(&mut body, "ungrouped", UNGROUPED_TITLE, None, &partition.ungrouped);
    }

    body.push_str("</main>");
    page(&format!("Tab snapshot · {}", date), &body)
}

fn render_section(
    out: &mut String,
    group_key: &str,
    title: &str,
    color: Option<GroupColor>,
    tabs: &[&TabRecord],
) {
    let key = escape_html(group_key);
    out.push_str(&format!(
        r#"<details class="tab-group-section" data-group-id="{key}" open>
<summary class="group-header">"#,
    ));
    if let Some(color) = color {
        out.push_str(&format!(
            r#"<span class="group-indicator" style="background-color: {}"></span>"#,
            color.swatch()
        ));
    }
    out.push_str(&format!(
        r#"<span class="group-title">{title}</span>
<span class="group-count">{count} tabs · ~{memory}</span>
<span class="group-actions"><button data-action="restore-group" data-group-id="{key}">Restore group</button></span>
</summary>
<div class="tab-grid">
"#,
        title = escape_html(title),
        count = tabs.len(),
        memory = escape_html(&format_memory(estimate_memory_mb(tabs.iter().copied()))),
    ));

    for tab in tabs {
        render_tab(out, tab);
    }

    out.push_str("</div>\n</details>\n");
}

fn render_tab(out: &mut String, tab: &TabRecord) {
    let favicon = tab
        .fav_icon_url
        .as_deref()
        .filter(|url| !url.trim().is_empty())
        .unwrap_or(FALLBACK_FAVICON);
    let url = escape_html(&tab.url);

    out.push_str(&format!(
        r#"<div class="tab-card" data-url="{url}">
<a href="{url}" target="_blank" rel="noopener">
<img src="{favicon}" alt="" data-fallback="{fallback}">
<div class="tab-info">
<div class="tab-title">{title}</div>
<div class="tab-description">{description}</div>
<div class="tab-url">{url}</div>
"#,
        favicon = escape_html(favicon),
        fallback = escape_html(FALLBACK_FAVICON),
        title = escape_html(tab.display_title()),
        description = escape_html(&tab.description),
    ));
    if tab.pinned {
        out.push_str("<span class=\"pinned\">Pinned</span>\n");
    }
    out.push_str(&format!(
        r#"</div>
</a>
<button class="delete-tab" data-action="delete-tab" data-url="{url}" title="Remove from snapshot">×</button>
</div>
"#,
    ));
}
