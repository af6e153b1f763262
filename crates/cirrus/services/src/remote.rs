//! Remote collaborators of the service lifecycle manager
//!
//! [`ResourceControlPlane`] performs catalog reads and instance mutations;
//! [`SpaceDirectory`] resolves scopes and finds instances inside them;
//! [`ApplicationControl`] starts and stops deployed applications. Each call
//! is one remote round trip and nothing is cached between calls.

use std::collections::BTreeSet;

use async_trait::async_trait;
use cirrus_types::{
    NewServiceInstance, PlanId, RemoteResult, ScopeId, ServiceId, ServiceInstanceId,
    ServiceInstanceRecord,
};
use serde::{Deserialize, Serialize};

use crate::paging::Page;

/// A service catalog offering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceOffering {
    pub id: ServiceId,
    pub label: String,
    /// Opaque broker metadata, see [`crate::metadata::BrokerMetadata`]
    pub broker_metadata: Option<String>,
}

/// A plan of a service offering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePlan {
    pub id: PlanId,
    pub name: String,
    pub service_id: ServiceId,
}

/// A binding between a service instance and an application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceBinding {
    pub id: String,
    pub service_instance_id: ServiceInstanceId,
    pub application_id: String,
}

/// One service visible in a scope summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeServiceEntry {
    pub id: ServiceInstanceId,
    pub name: String,
}

/// Services visible in a scope, both owned and shared in
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeSummary {
    pub services: Vec<ScopeServiceEntry>,
}

/// Remote control plane for service catalog reads and instance mutations.
#[async_trait]
pub trait ResourceControlPlane: Send + Sync {
    /// Find a catalog offering by its label
    async fn find_service_by_label(&self, label: &str) -> RemoteResult<Option<ServiceOffering>>;

    /// List one page of the plans of an offering
    async fn list_service_plans(
        &self,
        service_id: &ServiceId,
        page: u32,
    ) -> RemoteResult<Page<ServicePlan>>;

    /// List one page of the offerings available in a scope
    async fn list_scope_services(
        &self,
        scope_id: &ScopeId,
        page: u32,
    ) -> RemoteResult<Page<ServiceOffering>>;

    /// Create an instance; `None` when the remote side produced no identifier
    async fn create(&self, request: &NewServiceInstance)
        -> RemoteResult<Option<ServiceInstanceId>>;

    /// Update an existing instance in place
    async fn update(
        &self,
        id: &ServiceInstanceId,
        request: &NewServiceInstance,
    ) -> RemoteResult<ServiceInstanceRecord>;

    /// Delete an instance
    async fn delete(&self, id: &ServiceInstanceId) -> RemoteResult<()>;

    /// List one page of the bindings attached to an instance
    async fn list_bindings(
        &self,
        id: &ServiceInstanceId,
        page: u32,
    ) -> RemoteResult<Page<ServiceBinding>>;

    /// Bind an instance to an application
    async fn create_binding(
        &self,
        id: &ServiceInstanceId,
        application_id: &str,
    ) -> RemoteResult<ServiceBinding>;

    /// Scopes an instance is currently shared into; `None` when unreadable
    async fn get_share_targets(
        &self,
        id: &ServiceInstanceId,
    ) -> RemoteResult<Option<BTreeSet<ScopeId>>>;

    /// Share an instance into additional scopes, leaving existing grants alone
    async fn set_share_targets(
        &self,
        id: &ServiceInstanceId,
        scope_ids: &BTreeSet<ScopeId>,
    ) -> RemoteResult<()>;

    /// Withdraw one share grant
    async fn remove_share_target(
        &self,
        id: &ServiceInstanceId,
        scope_id: &ScopeId,
    ) -> RemoteResult<()>;

    /// Look a plan up by id
    async fn find_plan(&self, plan_id: &PlanId) -> RemoteResult<Option<ServicePlan>>;

    /// Look the offering owning a plan up by its id
    async fn find_service(&self, service_id: &ServiceId) -> RemoteResult<Option<ServiceOffering>>;

    /// Read a feature flag; `None` when the flag is not defined
    async fn get_feature_flag(&self, name: &str) -> RemoteResult<Option<bool>>;
}

/// Remote directory of scopes and the instances they contain.
#[async_trait]
pub trait SpaceDirectory: Send + Sync {
    /// Resolve an organization/space pair to a scope id
    async fn resolve_scope(&self, organization: &str, space: &str)
        -> RemoteResult<Option<ScopeId>>;

    /// Find an instance owned by a scope
    async fn find_instance_by_name_in_scope(
        &self,
        scope_id: &ScopeId,
        name: &str,
    ) -> RemoteResult<Option<ServiceInstanceRecord>>;

    /// Find every named instance owned by a scope; missing names are omitted
    async fn find_instances_by_names_in_scope(
        &self,
        scope_id: &ScopeId,
        names: &[String],
    ) -> RemoteResult<Vec<ServiceInstanceRecord>>;

    /// Summary of the services visible in a scope
    async fn get_scope_summary(&self, scope_id: &ScopeId) -> RemoteResult<Option<ScopeSummary>>;
}

/// Remote control over deployed applications.
#[async_trait]
pub trait ApplicationControl: Send + Sync {
    async fn stop_application(&self, application_id: &str) -> RemoteResult<()>;
}
