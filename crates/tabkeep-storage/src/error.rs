//! Storage error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Item '{key}' is {size} bytes, over the {limit} byte per-item quota")]
    ItemQuotaExceeded {
        key: String,
        size: usize,
        limit: usize,
    },

    #[error("Area '{area}' would hold {size} bytes, over the {limit} byte quota")]
    AreaQuotaExceeded {
        area: String,
        size: usize,
        limit: usize,
    },
}
