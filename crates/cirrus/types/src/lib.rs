//! # Cirrus Types - Shared value types for the Cirrus orchestration core
//!
//! Cirrus allocates collision-free deployable-resource names and reconciles
//! the lifecycle of dependent service instances against an eventually
//! consistent remote control plane. This crate holds the vocabulary shared
//! by both halves:
//!
//! - **Identifiers**: strongly-typed remote identifiers ([`ScopeId`],
//!   [`ServiceInstanceId`], [`PlanId`], [`ServiceId`])
//! - **Scopes**: `org > space` region addressing ([`Region`], [`Scope`])
//! - **Instances**: read-through snapshots of remote service instances
//!   ([`ServiceInstanceRecord`], [`ServiceKind`])
//! - **Operations**: the caller-facing [`LastOperationResult`]
//! - **Errors**: the [`ErrorKind`] taxonomy and the collaborator-boundary
//!   [`RemoteError`]
//! - **Configuration** and explicit **progress** reporting
//!
//! Nothing in this crate talks to a remote system.

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod ids;
pub mod instance;
pub mod operation;
pub mod progress;
pub mod region;

pub use config::{CirrusConfig, ConfigError, NamingConfig, ServicesConfig};
pub use error::{ErrorKind, RemoteError, RemoteResult};
pub use ids::{PlanId, ScopeId, ServiceId, ServiceInstanceId};
pub use instance::{
    NewServiceInstance, ServiceInstanceRecord, ServiceKind, ServiceSettings, SharingEdge,
};
pub use operation::{LastOperationResult, OperationKind, OperationState};
pub use progress::{ProgressSink, SilentProgress, StatusEntry, TaskHistory};
pub use region::{Region, Scope};
