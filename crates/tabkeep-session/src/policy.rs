//! Restore throttling and window selection

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How quickly tabs are recreated during a restore
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BatchPolicy {
    /// Larger batches, minimal pause between them
    #[default]
    #[serde(rename = "fast")]
    Fast,
    /// Small batches with a long pause, for restoring many tabs at once
    #[serde(rename = "performance")]
    PerformanceFriendly,
}

impl BatchPolicy {
    pub fn batch_size(&self) -> usize {
        match self {
            BatchPolicy::Fast => 5,
            BatchPolicy::PerformanceFriendly => 2,
        }
    }

    pub fn batch_delay(&self) -> Duration {
        match self {
            BatchPolicy::Fast => Duration::from_millis(100),
            BatchPolicy::PerformanceFriendly => Duration::from_millis(800),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BatchPolicy::Fast => "fast",
            BatchPolicy::PerformanceFriendly => "performance",
        }
    }
}

impl std::fmt::Display for BatchPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BatchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fast" => Ok(BatchPolicy::Fast),
            "performance" | "performance-friendly" => Ok(BatchPolicy::PerformanceFriendly),
            _ => Err(format!("Unknown restore policy: {}", s)),
        }
    }
}

/// Where restored tabs go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WindowPolicy {
    /// Use the focused window when it is a normal window, else open a new one
    #[default]
    #[serde(rename = "reuse-current")]
    ReuseCurrentNormal,
    AlwaysNew,
}

impl WindowPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            WindowPolicy::ReuseCurrentNormal => "reuse-current",
            WindowPolicy::AlwaysNew => "always-new",
        }
    }
}

impl std::str::FromStr for WindowPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reuse-current" => Ok(WindowPolicy::ReuseCurrentNormal),
            "always-new" => Ok(WindowPolicy::AlwaysNew),
            _ => Err(format!("Unknown window policy: {}", s)),
        }
    }
}

/// Pauses between restore steps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreTimings {
    pub item_delay: Duration,
    pub window_settle: Duration,
    pub regroup_settle: Duration,
    pub group_settle: Duration,
    /// Honour the batch policy's inter-batch delay
    pub batch_delays: bool,
}

impl Default for RestoreTimings {
    fn default() -> Self {
        Self {
            item_delay: Duration::from_millis(100),
            window_settle: Duration::from_millis(500),
            regroup_settle: Duration::from_millis(1000),
            group_settle: Duration::from_millis(500),
            batch_delays: true,
        }
    }
}

impl RestoreTimings {
    /// No pauses at all
    pub fn immediate() -> Self {
        Self {
            item_delay: Duration::ZERO,
            window_settle: Duration::ZERO,
            regroup_settle: Duration::ZERO,
            group_settle: Duration::ZERO,
            batch_delays: false,
        }
    }

    pub fn batch_delay(&self, policy: BatchPolicy) -> Duration {
        if self.batch_delays {
            policy.batch_delay()
        } else {
            Duration::ZERO
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreOptions {
    pub policy: BatchPolicy,
    pub window_policy: WindowPolicy,
    pub timings: RestoreTimings,
}

pub(crate) async fn pause(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}
