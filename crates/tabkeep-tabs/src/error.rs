//! Tab model error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TabError {
    #[error("Snapshot document is malformed: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Group not found in snapshot: {0}")]
    GroupNotFound(String),
}
