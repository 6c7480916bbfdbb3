//! Rough memory estimates shown before bulk restores
//!
//! These are experience-based guesses, not measurements.

use crate::snapshot::TabRecord;

const BASE_TAB_MB: u64 = 50;
const RICH_DESCRIPTION_CHARS: usize = 100;
const RICH_DESCRIPTION_BONUS_MB: u64 = 10;

/// First matching host fragment wins
const DOMAIN_COSTS: &[(&[&str], u64)] = &[
    (&["youtube.com", "netflix.com", "twitch.tv"], 150),
    (&["gmail.com", "outlook.com"], 80),
    (&["docs.google.com", "office.com"], 120),
    (&["figma.com", "canva.com"], 200),
    (&["github.com", "gitlab.com"], 70),
    (&["facebook.com", "twitter.com", "instagram.com"], 90),
];

/// Anything that can be costed: stored tab records and live tabs alike
pub trait MemoryProfile {
    fn url(&self) -> &str;

    fn description(&self) -> Option<&str> {
        None
    }
}

impl MemoryProfile for TabRecord {
    fn url(&self) -> &str {
        &self.url
    }

    fn description(&self) -> Option<&str> {
        Some(&self.description)
    }
}

fn tab_cost<T: MemoryProfile + ?Sized>(tab: &T) -> u64 {
    let host = url::Url::parse(tab.url())
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_lowercase));

    let mut cost = host
        .and_then(|host| {
            DOMAIN_COSTS
                .iter()
                .find(|(fragments, _)| fragments.iter().any(|f| host.contains(f)))
                .map(|(_, cost)| *cost)
        })
        .unwrap_or(BASE_TAB_MB);

    if tab
        .description()
        .is_some_and(|d| d.chars().count() > RICH_DESCRIPTION_CHARS)
    {
        cost += RICH_DESCRIPTION_BONUS_MB;
    }

    cost
}

/// Estimated megabytes needed to hold `tabs` open
pub fn estimate_memory_mb<'a, T, I>(tabs: I) -> u64
where
    T: MemoryProfile + 'a,
    I: IntoIterator<Item = &'a T>,
{
    tabs.into_iter().map(tab_cost).sum()
}

pub fn format_memory(megabytes: u64) -> String {
    if megabytes < 1024 {
        format!("{} MB", megabytes)
    } else {
        format!("{:.1} GB", megabytes as f64 / 1024.0)
    }
}

/// One-line summary, e.g. `3 tabs · ~150 MB`
pub fn memory_summary(tab_count: usize, megabytes: u64) -> String {
    format!("{} tabs · ~{}", tab_count, format_memory(megabytes))
}
