//! Cluster inventory collaborator
//!
//! The inventory is the remote source of truth for which server groups
//! exist. Listings are paged and eventually consistent: a draining group can
//! be missing from a listing while still occupying its name, which is why
//! the allocator also probes candidates by name.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cirrus_types::RemoteResult;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

/// One remote resource returned by a family listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyMember {
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// One page of a family listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventoryPage {
    pub members: Vec<FamilyMember>,
    /// Opaque continuation token; absent or empty ends the listing
    pub next_cursor: Option<String>,
}

/// Remote status of a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceStatus {
    Active,
    Draining,
    Inactive,
}

impl ResourceStatus {
    /// Whether a resource in this status still holds its name.
    pub fn occupies_name(&self) -> bool {
        !matches!(self, ResourceStatus::Inactive)
    }
}

/// Result of a direct lookup by name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDescription {
    pub name: String,
    pub status: ResourceStatus,
}

/// Remote inventory of server groups in one cluster.
#[async_trait]
pub trait ClusterInventory: Send + Sync {
    /// Fetch one page of resources whose name contains `family_prefix`.
    async fn list_family_members(
        &self,
        family_prefix: &str,
        cursor: Option<&str>,
    ) -> RemoteResult<InventoryPage>;

    /// Look a single resource up by exact name, regardless of listing state.
    async fn describe_by_name(&self, name: &str) -> RemoteResult<Option<ResourceDescription>>;
}

#[derive(Debug, Clone)]
struct InventoryEntry {
    member: FamilyMember,
    status: ResourceStatus,
    listed: bool,
}

/// In-memory inventory for development and tests.
///
/// Only active, listed entries appear in listings; every entry is visible
/// to `describe_by_name`.
pub struct InMemoryClusterInventory {
    entries: RwLock<Vec<InventoryEntry>>,
    page_size: usize,
    probes: Mutex<Vec<String>>,
    list_calls: Mutex<Vec<Option<String>>>,
}

impl InMemoryClusterInventory {
    /// Create an empty inventory
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            page_size: 10,
            probes: Mutex::new(Vec::new()),
            list_calls: Mutex::new(Vec::new()),
        }
    }

    /// Set the listing page size
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Add an active resource that shows up in listings.
    pub fn add_active(&self, name: impl Into<String>, created_at: DateTime<Utc>) {
        self.insert(name.into(), created_at, ResourceStatus::Active, true);
    }

    /// Add a resource that listings omit but lookups still report.
    pub fn add_unlisted(&self, name: impl Into<String>, status: ResourceStatus) {
        self.insert(name.into(), Utc::now(), status, false);
    }

    fn insert(&self, name: String, created_at: DateTime<Utc>, status: ResourceStatus, listed: bool) {
        self.entries.write().push(InventoryEntry {
            member: FamilyMember { name, created_at },
            status,
            listed,
        });
    }

    /// Names passed to `describe_by_name`, in call order
    pub fn probed_names(&self) -> Vec<String> {
        self.probes.lock().clone()
    }

    /// Cursors passed to `list_family_members`, in call order
    pub fn list_calls(&self) -> Vec<Option<String>> {
        self.list_calls.lock().clone()
    }
}

impl Default for InMemoryClusterInventory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ClusterInventory for InMemoryClusterInventory {
    async fn list_family_members(
        &self,
        family_prefix: &str,
        cursor: Option<&str>,
    ) -> RemoteResult<InventoryPage> {
        self.list_calls.lock().push(cursor.map(str::to_string));

        let start = cursor.and_then(|c| c.parse::<usize>().ok()).unwrap_or(0);
        let matching: Vec<FamilyMember> = self
            .entries
            .read()
            .iter()
            .filter(|e| e.listed && e.status == ResourceStatus::Active)
            .filter(|e| e.member.name.contains(family_prefix))
            .map(|e| e.member.clone())
            .collect();

        let end = (start + self.page_size).min(matching.len());
        let members = matching.get(start..end).map(<[_]>::to_vec).unwrap_or_default();
        let next_cursor = (end < matching.len()).then(|| end.to_string());

        Ok(InventoryPage {
            members,
            next_cursor,
        })
    }

    async fn describe_by_name(&self, name: &str) -> RemoteResult<Option<ResourceDescription>> {
        self.probes.lock().push(name.to_string());

        // The newest entry under a name wins, like a recreated service.
        Ok(self
            .entries
            .read()
            .iter()
            .rev()
            .find(|e| e.member.name == name)
            .map(|e| ResourceDescription {
                name: e.member.name.clone(),
                status: e.status,
            }))
    }
}
