use serde::{Deserialize, Serialize};
use std::fmt;

/// Activity totals for one subject over a date range, as reported by the collector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivitySnapshot {
    #[serde(rename = "total_commits")]
    pub commit_count: i64,
    #[serde(rename = "total_merges")]
    pub merge_count: i64,
    /// Logged work time in seconds.
    #[serde(rename = "worklogs")]
    pub worked_seconds: i64,
}

impl ActivitySnapshot {
    /// Logged work time in whole hours, rounded down.
    pub fn worked_hours(&self) -> i64 {
        self.worked_seconds / 3600
    }
}

/// What a collector query is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorScope {
    Member,
    Group,
    GroupMember,
}

impl CollectorScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectorScope::Member => "member",
            CollectorScope::Group => "group",
            CollectorScope::GroupMember => "group-member",
        }
    }
}

impl fmt::Display for CollectorScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
