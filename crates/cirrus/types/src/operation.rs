//! Caller-facing last-operation results
//!
//! Every lifecycle operation summarizes its outcome as one
//! [`LastOperationResult`]. Managed operations start `InProgress` and are
//! moved to a terminal state by an external poller; synchronous operations
//! land in a terminal state directly. `NotFound` is only reached by
//! destroying something that is already gone.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of lifecycle operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationKind {
    Create,
    Update,
    Delete,
    Share,
    Unshare,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OperationKind::Create => "CREATE",
            OperationKind::Update => "UPDATE",
            OperationKind::Delete => "DELETE",
            OperationKind::Share => "SHARE",
            OperationKind::Unshare => "UNSHARE",
        };
        f.write_str(s)
    }
}

/// State of a lifecycle operation as observed at call time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationState {
    InProgress,
    Succeeded,
    Failed,
    NotFound,
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OperationState::InProgress => "IN_PROGRESS",
            OperationState::Succeeded => "SUCCEEDED",
            OperationState::Failed => "FAILED",
            OperationState::NotFound => "NOT_FOUND",
        };
        f.write_str(s)
    }
}

/// Outcome of a lifecycle operation on a named service instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastOperationResult {
    pub name: String,
    pub operation: OperationKind,
    pub state: OperationState,
}

impl LastOperationResult {
    pub fn new(name: impl Into<String>, operation: OperationKind, state: OperationState) -> Self {
        Self {
            name: name.into(),
            operation,
            state,
        }
    }
}

impl fmt::Display for LastOperationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.operation, self.name, self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_wire_names() {
        let result =
            LastOperationResult::new("db", OperationKind::Unshare, OperationState::InProgress);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["operation"], "UNSHARE");
        assert_eq!(json["state"], "IN_PROGRESS");
        assert_eq!(result.to_string(), "UNSHARE db IN_PROGRESS");
    }
}
