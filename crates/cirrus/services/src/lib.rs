//! # Cirrus Services - Service instance lifecycle
//!
//! Idempotent create/update, destroy, share and unshare of bindable
//! service instances against a remote control plane.
//!
//! Each operation reads the remote state first and only submits the
//! mutations needed to reach the requested state. Running an operation
//! twice against unchanged remote state submits nothing the second time.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cirrus_services::{InMemoryCloud, ServiceLifecycleManager};
//!
//! # async fn example() {
//! let cloud = Arc::new(InMemoryCloud::new());
//! cloud.add_scope("org", "dev", "space-dev");
//!
//! let manager = ServiceLifecycleManager::new(cloud.clone(), cloud);
//! let result = manager
//!     .unshare("db", &["org > dev".to_string()])
//!     .await
//!     .unwrap();
//! println!("{result}");
//! # }
//! ```

#![deny(unsafe_code)]

pub mod binding;
pub mod catalog;
pub mod error;
pub mod lifecycle;
pub mod memory;
pub mod metadata;
pub mod paging;
pub mod remote;
pub mod server_group;

pub use catalog::CatalogService;
pub use error::{Result, ServiceError};
pub use lifecycle::{ManagedInstanceRequest, ServiceLifecycleManager, UserProvidedInstanceRequest};
pub use memory::{InMemoryCloud, RecordedCall};
pub use metadata::{BrokerMetadata, MetadataError};
pub use paging::{collect_pages, Page};
pub use remote::{
    ApplicationControl, ResourceControlPlane, ScopeServiceEntry, ScopeSummary, ServiceBinding,
    ServiceOffering, ServicePlan, SpaceDirectory,
};
pub use server_group::{DeploymentResult, ServerGroupOperations, StopServerGroupDescription};
