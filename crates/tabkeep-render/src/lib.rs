//! tabkeep Presentation
//!
//! Pure functions from stored documents to self-contained HTML pages. Pages
//! carry `data-*` hooks (`data-action`, `data-url`, `data-group-id`) for the
//! script that wires up restore and delete buttons.

mod history_page;
mod html;
mod snapshot_page;

pub use history_page::render_history;
pub use html::{escape_html, FALLBACK_FAVICON};
pub use snapshot_page::{render_snapshot, LiveSummary};

/// Stored in place of the snapshot page when rendering fails
pub fn fallback_page() -> String {
    "<html><body><h1>Snapshot HTML generation failed</h1></body></html>".to_string()
}
