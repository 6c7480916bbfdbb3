//! tabkeep Host Browser Interface
//!
//! Everything tabkeep needs from the browser it runs against: window and tab
//! enumeration, tab creation and removal, tab groups, read-only page access,
//! history, identity and notifications. Every call is fallible and async.

mod error;
#[cfg(any(test, feature = "fake"))]
pub mod fake;
mod host;
mod types;

pub use error::HostError;
pub use host::BrowserHost;
pub use types::{
    HistoryItem, HistoryQuery, LiveGroup, LiveTab, LiveWindow, NewTab, NewWindow, Notification,
    TabUpdate, WindowType,
};

pub type Result<T> = std::result::Result<T, HostError>;
