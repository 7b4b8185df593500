//! Adaptive tree walker.
//!
//! Directories near the root fan their children out as parallel tasks, each
//! gated by the shared concurrency limiter. Deeper directories, or any
//! directory visited after the walk switched to in-task recursion, are
//! processed synchronously by the task that reached them. Either way every
//! visited entry yields exactly one record, emitted after its subtree is
//! complete.

pub mod walker;

pub use walker::{WalkContext, normalize_path};

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// When a directory fans its children out as parallel tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AsyncPolicy {
    /// Every directory shallower than the async depth fans out.
    #[default]
    DepthBudget,
    /// As `DepthBudget`, but a directory recurses in-task while every
    /// limiter permit is taken.
    Saturation,
}

impl AsyncPolicy {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            AsyncPolicy::DepthBudget => "depth",
            AsyncPolicy::Saturation => "saturation",
        }
    }

    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label.to_ascii_lowercase().as_str() {
            "depth" | "depth_budget" => Some(AsyncPolicy::DepthBudget),
            "saturation" | "strict" => Some(AsyncPolicy::Saturation),
            _ => None,
        }
    }
}

impl std::fmt::Display for AsyncPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AsyncPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AsyncPolicy::from_label(s).ok_or_else(|| format!("unknown async policy '{s}'"))
    }
}

/// Why an entry produced no record, or produced a degraded one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The entry vanished between listing and stat
    NotFound,
    StatError,
    /// A directory (or one of its entries) could not be listed
    ListError,
    /// Symlink recorded with an empty target
    UnreadableSymlinkTarget,
    UnsupportedType,
}

/// Thread-safe tally of skipped or degraded entries.
#[derive(Debug, Default)]
pub struct WalkStats {
    not_found: AtomicU64,
    stat_errors: AtomicU64,
    list_errors: AtomicU64,
    unreadable_links: AtomicU64,
    unsupported: AtomicU64,
}

impl WalkStats {
    pub fn record(&self, reason: SkipReason) {
        let counter = match reason {
            SkipReason::NotFound => &self.not_found,
            SkipReason::StatError => &self.stat_errors,
            SkipReason::ListError => &self.list_errors,
            SkipReason::UnreadableSymlinkTarget => &self.unreadable_links,
            SkipReason::UnsupportedType => &self.unsupported,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> WalkSummary {
        WalkSummary {
            not_found: self.not_found.load(Ordering::Relaxed),
            stat_errors: self.stat_errors.load(Ordering::Relaxed),
            list_errors: self.list_errors.load(Ordering::Relaxed),
            unreadable_links: self.unreadable_links.load(Ordering::Relaxed),
            unsupported: self.unsupported.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of `WalkStats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkSummary {
    pub not_found: u64,
    pub stat_errors: u64,
    pub list_errors: u64,
    pub unreadable_links: u64,
    pub unsupported: u64,
}

impl WalkSummary {
    #[must_use]
    pub fn total(&self) -> u64 {
        self.not_found + self.stat_errors + self.list_errors + self.unreadable_links + self.unsupported
    }
}
