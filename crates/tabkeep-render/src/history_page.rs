//! The most-visited sites page

use tabkeep_session::HistorySnapshot;

use crate::html::{escape_html, format_timestamp, page, FALLBACK_FAVICON};

/// Render the top sites as a grid of cards. Each icon carries the remaining
/// candidates in `data-fallbacks` (space separated) for the page script to try.
pub fn render_history(history: &HistorySnapshot) -> String {
    let date = format_timestamp(&history.timestamp);
    let mut body = String::new();

    body.push_str(&format!(
        r#"<header>
<div>
<h1>Most visited sites · {date}</h1>
<div class="stats">{shown} of {total} sites from the last 90 days</div>
</div>
</header>
<main>
"#,
        date = escape_html(&date),
        shown = history.sites.len(),
        total = history.total_sites,
    ));

    if history.sites.is_empty() {
        body.push_str(r#"<div class="no-tabs">No browsing history found</div>"#);
    } else {
        body.push_str("<div class=\"tab-grid\">\n");
        for (rank, site) in history.sites.iter().enumerate() {
            let (icon, fallbacks) = match site.fav_icon_url.split_first() {
                Some((first, rest)) => (first.as_str(), rest.join(" ")),
                None => (FALLBACK_FAVICON, String::new()),
            };
            let visits = match site.last_visit_time.as_ref() {
                Some(last) => format!("{} visits · last {}", site.visit_count, format_timestamp(last)),
                None => format!("{} visits", site.visit_count),
            };
            let url = escape_html(&site.url);

            body.push_str(&format!(
                r#"<div class="tab-card" data-url="{url}" data-site-id="{id}">
<a href="{url}" target="_blank" rel="noopener">
<img src="{icon}" alt="" data-fallbacks="{fallbacks}" data-fallback="{glyph}">
<div class="tab-info">
<div class="tab-title">{rank}. {title}</div>
<div class="tab-description">{visits}</div>
<div class="tab-url">{url}</div>
</div>
</a>
</div>
"#,
                id = escape_html(&site.id),
                icon = escape_html(icon),
                fallbacks = escape_html(&fallbacks),
                glyph = escape_html(FALLBACK_FAVICON),
                rank = rank + 1,
                title = escape_html(&site.title),
                visits = escape_html(&visits),
            ));
        }
        body.push_str("</div>\n");
    }

    body.push_str("</main>");
    page(&format!("Most visited sites · {}", date), &body)
}
