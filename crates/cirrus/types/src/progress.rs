//! Explicit progress reporting
//!
//! Operations that report progress take a `&dyn ProgressSink` argument;
//! there is no ambient per-thread task.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Receives phase/status updates from an operation.
pub trait ProgressSink: Send + Sync {
    fn record(&self, phase: &str, status: &str);

    /// Updates recorded so far; sinks that keep nothing return none.
    fn history(&self) -> Vec<StatusEntry> {
        Vec::new()
    }
}

/// One recorded status update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub phase: String,
    pub status: String,
    pub recorded_at: DateTime<Utc>,
}

impl StatusEntry {
    /// Render as `phase:status`
    pub fn message(&self) -> String {
        format!("{}:{}", self.phase, self.status)
    }
}

/// In-memory history of status updates.
#[derive(Debug, Default)]
pub struct TaskHistory {
    entries: RwLock<Vec<StatusEntry>>,
}

impl TaskHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries rendered as `phase:status`
    pub fn messages(&self) -> Vec<String> {
        self.entries.read().iter().map(StatusEntry::message).collect()
    }
}

impl ProgressSink for TaskHistory {
    fn record(&self, phase: &str, status: &str) {
        self.entries.write().push(StatusEntry {
            phase: phase.to_string(),
            status: status.to_string(),
            recorded_at: Utc::now(),
        });
    }

    fn history(&self) -> Vec<StatusEntry> {
        self.entries.read().clone()
    }
}

/// Discards all updates.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentProgress;

impl ProgressSink for SilentProgress {
    fn record(&self, _phase: &str, _status: &str) {}
}
