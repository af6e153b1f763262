//! Error taxonomy shared by the Cirrus crates

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification every Cirrus error maps onto.
///
/// Only name allocation retries anything, and only `Conflict`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Missing or contradictory caller input
    Validation,
    /// A scope, plan, catalog entry, broker or instance is absent
    NotFound,
    /// Remote state conflicts with the request
    Conflict,
    /// Transport or control-plane failure, or unreadable remote data
    RemoteFailure,
    /// Name allocation ran out of attempts
    ExhaustedRetries,
}

/// Errors returned by remote collaborators.
///
/// Cancellation and timeouts are owned by the transport and arrive here as
/// ordinary failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("timed out during {operation}")]
    Timeout { operation: String },

    /// The remote system rejected a duplicate name
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },
}

impl RemoteError {
    pub fn transport(message: impl Into<String>) -> Self {
        RemoteError::Transport(message.into())
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, RemoteError::Conflict(_))
    }
}

/// Result type for collaborator calls
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;
