//! tabkeep Storage Layer
//!
//! SQLite-backed persistence for everything tabkeep keeps between runs.
//! Entries live in named areas that mirror the host browser's storage:
//! an effectively unlimited `local` area and a quota-limited `sync` area.

mod area;
mod database;
mod error;
mod migrations;

pub use area::{
    AreaTransaction, KeyValueStore, KvArea, StorageArea, SYNC_QUOTA_BYTES, SYNC_QUOTA_BYTES_PER_ITEM,
};
pub use database::Database;
pub use error::StorageError;

pub type Result<T> = std::result::Result<T, StorageError>;
