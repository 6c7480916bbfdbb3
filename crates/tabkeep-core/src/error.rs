//! Core error types

use tabkeep_tabs::WindowId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Storage error: {0}")]
    Storage(#[from] tabkeep_storage::StorageError),

    #[error("Tab error: {0}")]
    Tab(#[from] tabkeep_tabs::TabError),

    #[error("Session error: {0}")]
    Session(#[from] tabkeep_session::SessionError),

    #[error("Browser error: {0}")]
    Host(#[from] tabkeep_host::HostError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No tab to show the snapshot in window {0}")]
    NoActiveTab(WindowId),
}

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::Config(e.to_string())
    }
}
