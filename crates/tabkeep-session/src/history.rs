//! Most-visited sites from browser history

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tabkeep_host::{BrowserHost, HistoryQuery};
use tabkeep_tabs::is_privileged_url;
use uuid::Uuid;

use crate::Result;

const LOOKBACK_DAYS: i64 = 90;
const MAX_QUERY_RESULTS: usize = 1000;
const TOP_SITES: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySite {
    pub id: String,
    pub url: String,
    pub title: String,
    pub visit_count: u32,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub last_visit_time: Option<DateTime<Utc>>,
    /// Icon sources to try in order
    pub fav_icon_url: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySnapshot {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub total_sites: usize,
    pub sites: Vec<HistorySite>,
}

/// Icon URLs for a page: two public favicon services, then the site's own
/// `/favicon.ico`. Empty when the URL has no host.
pub fn favicon_candidates(page_url: &str) -> Vec<String> {
    let Ok(parsed) = url::Url::parse(page_url) else {
        return Vec::new();
    };
    let Some(host) = parsed.host_str() else {
        return Vec::new();
    };

    vec![
        format!("https://www.google.com/s2/favicons?sz=64&domain={}", host),
        format!("https://favicon.yandex.net/favicon/{}", host),
        format!("{}://{}/favicon.ico", parsed.scheme(), host),
    ]
}

/// Top sites of the last 90 days by visit count
pub async fn collect_history<H: BrowserHost + ?Sized>(host: &H) -> Result<HistorySnapshot> {
    let items = host
        .history(HistoryQuery {
            text: String::new(),
            start_time: Utc::now() - Duration::days(LOOKBACK_DAYS),
            max_results: MAX_QUERY_RESULTS,
        })
        .await?;
    let found = items.len();

    let mut items: Vec<_> = items
        .into_iter()
        .filter(|item| {
            !item.url.is_empty()
                && !item.title.trim().is_empty()
                && !is_privileged_url(&item.url)
                && item.visit_count > 0
        })
        .collect();

    // Stable, so equally visited sites keep history order
    items.sort_by(|a, b| b.visit_count.cmp(&a.visit_count));
    items.truncate(TOP_SITES);

    let sites: Vec<HistorySite> = items
        .into_iter()
        .map(|item| HistorySite {
            id: format!("history_{}", Uuid::new_v4().simple()),
            fav_icon_url: favicon_candidates(&item.url),
            url: item.url,
            title: item.title,
            visit_count: item.visit_count,
            last_visit_time: item.last_visit_time,
        })
        .collect();

    tracing::info!(found, kept = sites.len(), "Collected history snapshot");

    Ok(HistorySnapshot {
        timestamp: Utc::now(),
        total_sites: sites.len(),
        sites,
    })
}
