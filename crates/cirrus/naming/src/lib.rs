//! # Cirrus Naming - Sequenced name allocation
//!
//! Produces the next unused `<cluster>-vNNN` server group name for an
//! application/stack/detail triple by consulting a remote
//! [`ClusterInventory`].
//!
//! The inventory is eventually consistent, so a visible listing only seeds
//! the candidate. Each candidate is then probed by exact name; a resource
//! that still holds the name (for example one that is draining) pushes the
//! allocator to the next sequence, up to a fixed number of attempts.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cirrus_naming::{InMemoryClusterInventory, NameAllocator};
//!
//! # async fn example() {
//! let inventory = Arc::new(InMemoryClusterInventory::new());
//! inventory.add_active("app-prod-v001", chrono::Utc::now());
//!
//! let allocator = NameAllocator::new(inventory, "ecs-cluster", "us-west-2");
//! let name = allocator
//!     .resolve_next_name("app", Some("prod"), None, false)
//!     .await
//!     .unwrap();
//! assert_eq!(name, "app-prod-v002");
//! # }
//! ```

#![deny(unsafe_code)]

pub mod allocator;
pub mod error;
pub mod inventory;
pub mod names;

pub use allocator::{Allocation, NameAllocator, NameCandidate, TakenSlot};
pub use error::{NamingError, Result};
pub use inventory::{
    ClusterInventory, FamilyMember, InMemoryClusterInventory, InventoryPage, ResourceDescription,
    ResourceStatus,
};
pub use names::{cluster_name, container_name, family_name, NameParts};
