//! tabkeep configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tabkeep_session::{
    BatchPolicy, BuilderOptions, RestoreOptions, RestoreTimings, WindowPolicy, DEFAULT_CHUNK_SIZE,
};

use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the database file
    pub database_path: PathBuf,
    /// Restore speed used when a request does not name one
    pub restore_policy: BatchPolicy,
    /// Where restored tabs go
    pub window_policy: WindowPolicy,
    /// Script pages for a description while saving
    pub describe_pages: bool,
    pub description_timeout_ms: u64,
    /// Quiet period after the last window closes before auto-saving
    pub autosave_debounce_ms: u64,
    /// Byte budget of one chunk in the sync area
    pub remote_chunk_size: usize,
    /// Mirror snapshots to the sync area when the browser is signed in
    pub remote_sync: bool,
}

impl Config {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            database_path: data_dir.join("tabkeep.db"),
            restore_policy: BatchPolicy::Fast,
            window_policy: WindowPolicy::ReuseCurrentNormal,
            describe_pages: true,
            description_timeout_ms: 1500,
            autosave_debounce_ms: 100,
            remote_chunk_size: DEFAULT_CHUNK_SIZE,
            remote_sync: true,
        }
    }

    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir()
            .map(|d| d.join("tabkeep"))
            .unwrap_or_else(|| PathBuf::from(".tabkeep"))
    }

    /// Read a JSON config file; missing fields take their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn builder_options(&self) -> BuilderOptions {
        BuilderOptions {
            describe_pages: self.describe_pages,
            description_timeout: Duration::from_millis(self.description_timeout_ms),
        }
    }

    pub fn restore_options(&self, policy: BatchPolicy, timings: RestoreTimings) -> RestoreOptions {
        RestoreOptions {
            policy,
            window_policy: self.window_policy,
            timings,
        }
    }

    pub fn autosave_debounce(&self) -> Duration {
        Duration::from_millis(self.autosave_debounce_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Self::data_dir())
    }
}

mod dirs {
    use std::path::PathBuf;

    pub fn data_local_dir() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            std::env::var("LOCALAPPDATA").ok().map(PathBuf::from)
        }
        #[cfg(target_os = "macos")]
        {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join("Library/Application Support"))
        }
        #[cfg(target_os = "linux")]
        {
            std::env::var("XDG_DATA_HOME")
                .ok()
                .map(PathBuf::from)
                .or_else(|| {
                    std::env::var("HOME")
                        .ok()
                        .map(|h| PathBuf::from(h).join(".local/share"))
                })
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
        {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::new(PathBuf::from("/tmp/tabkeep"));
        assert_eq!(config.database_path, PathBuf::from("/tmp/tabkeep/tabkeep.db"));
        assert_eq!(config.restore_policy, BatchPolicy::Fast);
        assert_eq!(config.builder_options().description_timeout, Duration::from_millis(1500));
        assert_eq!(config.autosave_debounce(), Duration::from_millis(100));
        assert_eq!(config.remote_chunk_size, 7500);
        assert!(config.remote_sync);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"restore_policy":"performance","window_policy":"always-new","remote_sync":false}"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.restore_policy, BatchPolicy::PerformanceFriendly);
        assert_eq!(config.window_policy, WindowPolicy::AlwaysNew);
        assert!(!config.remote_sync);
        assert!(config.describe_pages);
        assert_eq!(config.description_timeout_ms, 1500);
    }
}
