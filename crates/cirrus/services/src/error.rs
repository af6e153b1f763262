//! Service lifecycle error types

use cirrus_types::{ErrorKind, RemoteError};
use thiserror::Error;

use crate::metadata::MetadataError;

/// Service lifecycle errors
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Unable to destroy service instance while {count} service binding(s) exist")]
    BindingsExist { count: usize },

    #[error("Service instance '{name}' could not be created")]
    CreateFailed { name: String },

    #[error("Unreadable metadata for the service broker of '{service}': {source}")]
    BrokerMetadata {
        service: String,
        source: MetadataError,
    },

    #[error("Remote error while {operation}: {source}")]
    Remote {
        operation: String,
        source: RemoteError,
    },
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Validation(_) => ErrorKind::Validation,
            ServiceError::NotFound(_) => ErrorKind::NotFound,
            ServiceError::Conflict(_) | ServiceError::BindingsExist { .. } => ErrorKind::Conflict,
            ServiceError::CreateFailed { .. }
            | ServiceError::BrokerMetadata { .. }
            | ServiceError::Remote { .. } => ErrorKind::RemoteFailure,
        }
    }

    /// Wrap a collaborator error with the operation it interrupted.
    pub(crate) fn remote(operation: impl Into<String>) -> impl FnOnce(RemoteError) -> Self {
        let operation = operation.into();
        move |source| ServiceError::Remote { operation, source }
    }
}

/// Result type for service lifecycle operations
pub type Result<T> = std::result::Result<T, ServiceError>;
