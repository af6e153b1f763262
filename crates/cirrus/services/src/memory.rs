//! In-memory remote control plane for development and tests
//!
//! [`InMemoryCloud`] implements every collaborator trait over one shared
//! state, so instances created through the control plane are visible
//! through the directory. Mutating calls are recorded for inspection.

use std::collections::BTreeSet;

use async_trait::async_trait;
use cirrus_types::{
    NewServiceInstance, OperationState, PlanId, RemoteError, RemoteResult, ScopeId,
    ServiceId, ServiceInstanceId, ServiceInstanceRecord, ServiceKind, ServiceSettings,
};
use dashmap::DashMap;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::paging::Page;
use crate::remote::{
    ApplicationControl, ResourceControlPlane, ScopeServiceEntry, ScopeSummary, ServiceBinding,
    ServiceOffering, ServicePlan, SpaceDirectory,
};

/// A mutating call received by the in-memory cloud
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    Create { name: String },
    Update { id: ServiceInstanceId },
    Delete { id: ServiceInstanceId },
    CreateBinding { id: ServiceInstanceId, application_id: String },
    SetShareTargets { id: ServiceInstanceId, scope_ids: BTreeSet<ScopeId> },
    RemoveShareTarget { id: ServiceInstanceId, scope_id: ScopeId },
    StopApplication { application_id: String },
}

#[derive(Debug, Clone)]
struct StoredInstance {
    scope_id: ScopeId,
    record: ServiceInstanceRecord,
}

/// In-memory implementation of the remote collaborators
pub struct InMemoryCloud {
    scopes: DashMap<(String, String), ScopeId>,
    offerings: DashMap<ServiceId, ServiceOffering>,
    plans: DashMap<PlanId, ServicePlan>,
    scope_offerings: DashMap<ScopeId, Vec<ServiceId>>,
    instances: DashMap<ServiceInstanceId, StoredInstance>,
    bindings: DashMap<ServiceInstanceId, Vec<ServiceBinding>>,
    share_targets: DashMap<ServiceInstanceId, BTreeSet<ScopeId>>,
    feature_flags: DashMap<String, bool>,
    calls: Mutex<Vec<RecordedCall>>,
    page_size: usize,
    create_yields_id: bool,
}

impl InMemoryCloud {
    /// Create an empty cloud
    pub fn new() -> Self {
        Self {
            scopes: DashMap::new(),
            offerings: DashMap::new(),
            plans: DashMap::new(),
            scope_offerings: DashMap::new(),
            instances: DashMap::new(),
            bindings: DashMap::new(),
            share_targets: DashMap::new(),
            feature_flags: DashMap::new(),
            calls: Mutex::new(Vec::new()),
            page_size: 50,
            create_yields_id: true,
        }
    }

    /// Set the page size of numbered listings
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Make `create` succeed without producing an identifier
    pub fn without_created_ids(mut self) -> Self {
        self.create_yields_id = false;
        self
    }

    /// Register a scope under an `org > space` region
    pub fn add_scope(&self, organization: &str, space: &str, id: impl Into<ScopeId>) -> ScopeId {
        let id = id.into();
        self.scopes
            .insert((organization.to_string(), space.to_string()), id.clone());
        id
    }

    /// Register a catalog offering
    pub fn add_offering(
        &self,
        id: impl Into<ServiceId>,
        label: &str,
        broker_metadata: Option<&str>,
    ) -> ServiceId {
        let id = id.into();
        self.offerings.insert(
            id.clone(),
            ServiceOffering {
                id: id.clone(),
                label: label.to_string(),
                broker_metadata: broker_metadata.map(str::to_string),
            },
        );
        id
    }

    /// Register a plan of an offering
    pub fn add_plan(&self, service_id: &ServiceId, id: impl Into<PlanId>, name: &str) -> PlanId {
        let id = id.into();
        self.plans.insert(
            id.clone(),
            ServicePlan {
                id: id.clone(),
                name: name.to_string(),
                service_id: service_id.clone(),
            },
        );
        id
    }

    /// Make an offering available in a scope
    pub fn offer_in_scope(&self, scope_id: &ScopeId, service_id: &ServiceId) {
        self.scope_offerings
            .entry(scope_id.clone())
            .or_default()
            .push(service_id.clone());
    }

    /// Place an existing instance in a scope
    pub fn add_instance(
        &self,
        scope_id: &ScopeId,
        id: impl Into<ServiceInstanceId>,
        name: &str,
        kind: ServiceKind,
    ) -> ServiceInstanceId {
        let id = id.into();
        self.instances.insert(
            id.clone(),
            StoredInstance {
                scope_id: scope_id.clone(),
                record: ServiceInstanceRecord {
                    id: id.clone(),
                    name: name.to_string(),
                    kind,
                    status: OperationState::Succeeded,
                },
            },
        );
        id
    }

    /// Attach a binding to an instance
    pub fn add_binding(&self, id: &ServiceInstanceId, application_id: &str) {
        self.bindings
            .entry(id.clone())
            .or_default()
            .push(ServiceBinding {
                id: Uuid::new_v4().to_string(),
                service_instance_id: id.clone(),
                application_id: application_id.to_string(),
            });
    }

    /// Record an existing share grant
    pub fn add_share(&self, id: &ServiceInstanceId, scope_id: &ScopeId) {
        self.share_targets
            .entry(id.clone())
            .or_default()
            .insert(scope_id.clone());
    }

    /// Define a feature flag
    pub fn set_feature_flag(&self, name: &str, enabled: bool) {
        self.feature_flags.insert(name.to_string(), enabled);
    }

    /// Mutating calls received so far
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Scopes an instance is currently shared into
    pub fn shared_scopes(&self, id: &ServiceInstanceId) -> BTreeSet<ScopeId> {
        self.share_targets
            .get(id)
            .map(|targets| targets.clone())
            .unwrap_or_default()
    }

    /// Whether an instance still exists
    pub fn has_instance(&self, id: &ServiceInstanceId) -> bool {
        self.instances.contains_key(id)
    }

    fn record(&self, call: RecordedCall) {
        self.calls.lock().push(call);
    }

    fn paginate<T: Clone>(&self, items: &[T], page: u32) -> Page<T> {
        let total_pages = items.len().div_ceil(self.page_size).max(1) as u32;
        let start = (page.saturating_sub(1) as usize) * self.page_size;
        let resources = items
            .iter()
            .skip(start)
            .take(self.page_size)
            .cloned()
            .collect();
        Page {
            resources,
            total_pages,
        }
    }

    fn kind_for(settings: &ServiceSettings) -> ServiceKind {
        match settings {
            ServiceSettings::Managed { plan_id, .. } => ServiceKind::Managed {
                plan_id: plan_id.clone(),
            },
            ServiceSettings::UserProvided { .. } => ServiceKind::UserProvided,
        }
    }
}

impl Default for InMemoryCloud {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceControlPlane for InMemoryCloud {
    async fn find_service_by_label(&self, label: &str) -> RemoteResult<Option<ServiceOffering>> {
        Ok(self
            .offerings
            .iter()
            .find(|o| o.label == label)
            .map(|o| o.value().clone()))
    }

    async fn list_service_plans(
        &self,
        service_id: &ServiceId,
        page: u32,
    ) -> RemoteResult<Page<ServicePlan>> {
        let mut plans: Vec<ServicePlan> = self
            .plans
            .iter()
            .filter(|p| &p.service_id == service_id)
            .map(|p| p.value().clone())
            .collect();
        plans.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(self.paginate(&plans, page))
    }

    async fn list_scope_services(
        &self,
        scope_id: &ScopeId,
        page: u32,
    ) -> RemoteResult<Page<ServiceOffering>> {
        let offerings: Vec<ServiceOffering> = self
            .scope_offerings
            .get(scope_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.offerings.get(id).map(|o| o.value().clone()))
                    .collect()
            })
            .unwrap_or_default();
        Ok(self.paginate(&offerings, page))
    }

    async fn create(
        &self,
        request: &NewServiceInstance,
    ) -> RemoteResult<Option<ServiceInstanceId>> {
        self.record(RecordedCall::Create {
            name: request.name.clone(),
        });

        let duplicate = self
            .instances
            .iter()
            .any(|i| i.scope_id == request.scope_id && i.record.name == request.name);
        if duplicate {
            return Err(RemoteError::Conflict(format!(
                "service instance name '{}' is taken",
                request.name
            )));
        }
        if !self.create_yields_id {
            return Ok(None);
        }

        let id = ServiceInstanceId::new(Uuid::new_v4().to_string());
        let status = match request.settings {
            ServiceSettings::Managed { .. } => OperationState::InProgress,
            ServiceSettings::UserProvided { .. } => OperationState::Succeeded,
        };
        self.instances.insert(
            id.clone(),
            StoredInstance {
                scope_id: request.scope_id.clone(),
                record: ServiceInstanceRecord {
                    id: id.clone(),
                    name: request.name.clone(),
                    kind: Self::kind_for(&request.settings),
                    status,
                },
            },
        );
        Ok(Some(id))
    }

    async fn update(
        &self,
        id: &ServiceInstanceId,
        request: &NewServiceInstance,
    ) -> RemoteResult<ServiceInstanceRecord> {
        self.record(RecordedCall::Update { id: id.clone() });

        let mut stored = self.instances.get_mut(id).ok_or_else(|| RemoteError::Rejected {
            status: 404,
            message: format!("service instance {id} not found"),
        })?;
        stored.record.kind = Self::kind_for(&request.settings);
        if stored.record.kind.is_managed() {
            stored.record.status = OperationState::InProgress;
        }
        Ok(stored.record.clone())
    }

    async fn delete(&self, id: &ServiceInstanceId) -> RemoteResult<()> {
        self.record(RecordedCall::Delete { id: id.clone() });
        self.instances.remove(id);
        self.share_targets.remove(id);
        Ok(())
    }

    async fn list_bindings(
        &self,
        id: &ServiceInstanceId,
        page: u32,
    ) -> RemoteResult<Page<ServiceBinding>> {
        let bindings = self
            .bindings
            .get(id)
            .map(|b| b.clone())
            .unwrap_or_default();
        Ok(self.paginate(&bindings, page))
    }

    async fn create_binding(
        &self,
        id: &ServiceInstanceId,
        application_id: &str,
    ) -> RemoteResult<ServiceBinding> {
        self.record(RecordedCall::CreateBinding {
            id: id.clone(),
            application_id: application_id.to_string(),
        });
        let binding = ServiceBinding {
            id: Uuid::new_v4().to_string(),
            service_instance_id: id.clone(),
            application_id: application_id.to_string(),
        };
        self.bindings
            .entry(id.clone())
            .or_default()
            .push(binding.clone());
        Ok(binding)
    }

    async fn get_share_targets(
        &self,
        id: &ServiceInstanceId,
    ) -> RemoteResult<Option<BTreeSet<ScopeId>>> {
        if !self.instances.contains_key(id) {
            return Ok(None);
        }
        Ok(Some(self.shared_scopes(id)))
    }

    async fn set_share_targets(
        &self,
        id: &ServiceInstanceId,
        scope_ids: &BTreeSet<ScopeId>,
    ) -> RemoteResult<()> {
        self.record(RecordedCall::SetShareTargets {
            id: id.clone(),
            scope_ids: scope_ids.clone(),
        });
        self.share_targets
            .entry(id.clone())
            .or_default()
            .extend(scope_ids.iter().cloned());
        Ok(())
    }

    async fn remove_share_target(
        &self,
        id: &ServiceInstanceId,
        scope_id: &ScopeId,
    ) -> RemoteResult<()> {
        self.record(RecordedCall::RemoveShareTarget {
            id: id.clone(),
            scope_id: scope_id.clone(),
        });
        if let Some(mut targets) = self.share_targets.get_mut(id) {
            targets.remove(scope_id);
        }
        Ok(())
    }

    async fn find_plan(&self, plan_id: &PlanId) -> RemoteResult<Option<ServicePlan>> {
        Ok(self.plans.get(plan_id).map(|p| p.value().clone()))
    }

    async fn find_service(&self, service_id: &ServiceId) -> RemoteResult<Option<ServiceOffering>> {
        Ok(self.offerings.get(service_id).map(|o| o.value().clone()))
    }

    async fn get_feature_flag(&self, name: &str) -> RemoteResult<Option<bool>> {
        Ok(self.feature_flags.get(name).map(|f| *f.value()))
    }
}

#[async_trait]
impl SpaceDirectory for InMemoryCloud {
    async fn resolve_scope(
        &self,
        organization: &str,
        space: &str,
    ) -> RemoteResult<Option<ScopeId>> {
        Ok(self
            .scopes
            .get(&(organization.to_string(), space.to_string()))
            .map(|id| id.value().clone()))
    }

    async fn find_instance_by_name_in_scope(
        &self,
        scope_id: &ScopeId,
        name: &str,
    ) -> RemoteResult<Option<ServiceInstanceRecord>> {
        Ok(self
            .instances
            .iter()
            .find(|i| &i.scope_id == scope_id && i.record.name == name)
            .map(|i| i.record.clone()))
    }

    async fn find_instances_by_names_in_scope(
        &self,
        scope_id: &ScopeId,
        names: &[String],
    ) -> RemoteResult<Vec<ServiceInstanceRecord>> {
        Ok(self
            .instances
            .iter()
            .filter(|i| &i.scope_id == scope_id && names.contains(&i.record.name))
            .map(|i| i.record.clone())
            .collect())
    }

    async fn get_scope_summary(&self, scope_id: &ScopeId) -> RemoteResult<Option<ScopeSummary>> {
        let known = self.scopes.iter().any(|s| s.value() == scope_id);
        if !known {
            return Ok(None);
        }

        let services = self
            .instances
            .iter()
            .filter(|i| {
                &i.scope_id == scope_id
                    || self
                        .share_targets
                        .get(i.key())
                        .is_some_and(|targets| targets.contains(scope_id))
            })
            .map(|i| ScopeServiceEntry {
                id: i.record.id.clone(),
                name: i.record.name.clone(),
            })
            .collect();
        Ok(Some(ScopeSummary { services }))
    }
}

#[async_trait]
impl ApplicationControl for InMemoryCloud {
    async fn stop_application(&self, application_id: &str) -> RemoteResult<()> {
        self.record(RecordedCall::StopApplication {
            application_id: application_id.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scope_summary_includes_shared_instances() {
        let cloud = InMemoryCloud::new();
        let dev = cloud.add_scope("org", "dev", "space-dev");
        let qa = cloud.add_scope("org", "qa", "space-qa");
        let id = cloud.add_instance(&dev, "si-1", "db", ServiceKind::UserProvided);
        cloud.add_share(&id, &qa);

        let summary = cloud.get_scope_summary(&qa).await.unwrap().unwrap();
        assert_eq!(summary.services.len(), 1);
        assert_eq!(summary.services[0].name, "db");
        assert!(cloud
            .get_scope_summary(&ScopeId::new("space-unknown"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_listings_are_paged() {
        let cloud = InMemoryCloud::new().with_page_size(2);
        let id = ServiceInstanceId::new("si-1");
        for app in ["a", "b", "c"] {
            cloud.add_binding(&id, app);
        }

        let first = cloud.list_bindings(&id, 1).await.unwrap();
        let last = cloud.list_bindings(&id, 2).await.unwrap();
        assert_eq!(first.total_pages, 2);
        assert_eq!(first.resources.len(), 2);
        assert_eq!(last.resources.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_create_conflicts() {
        let cloud = InMemoryCloud::new();
        let dev = cloud.add_scope("org", "dev", "space-dev");
        cloud.add_instance(&dev, "si-1", "db", ServiceKind::UserProvided);

        let request = NewServiceInstance {
            name: "db".to_string(),
            scope_id: dev,
            tags: BTreeSet::new(),
            settings: ServiceSettings::UserProvided {
                syslog_drain_url: None,
                credentials: Default::default(),
                route_service_url: None,
            },
        };
        let err = cloud.create(&request).await.unwrap_err();
        assert!(err.is_conflict());
    }
}
