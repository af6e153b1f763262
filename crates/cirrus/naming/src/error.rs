//! Naming error types

use cirrus_types::{ErrorKind, RemoteError};
use thiserror::Error;

/// Name allocation errors
#[derive(Debug, Error)]
pub enum NamingError {
    #[error("Invalid {component} '{value}': {reason}")]
    InvalidName {
        component: &'static str,
        value: String,
        reason: String,
    },

    #[error("All server group names for cluster {cluster} in {region} are taken")]
    ExhaustedRetries {
        cluster: String,
        region: String,
        attempts: u32,
    },

    #[error("Remote error while {operation}: {source}")]
    Remote {
        operation: &'static str,
        source: RemoteError,
    },

    #[error("Claiming name '{name}' failed: {source}")]
    ClaimFailed { name: String, source: RemoteError },
}

impl NamingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            NamingError::InvalidName { .. } => ErrorKind::Validation,
            NamingError::ExhaustedRetries { .. } => ErrorKind::ExhaustedRetries,
            NamingError::Remote { .. } | NamingError::ClaimFailed { .. } => {
                ErrorKind::RemoteFailure
            }
        }
    }

    pub(crate) fn remote(operation: &'static str) -> impl FnOnce(RemoteError) -> Self {
        move |source| NamingError::Remote { operation, source }
    }
}

/// Result type for naming operations
pub type Result<T> = std::result::Result<T, NamingError>;
