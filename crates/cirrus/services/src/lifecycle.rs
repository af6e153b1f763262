//! Service instance lifecycle orchestration
//!
//! Every operation reads the current remote state before mutating it, so
//! repeating a call against unchanged remote state is a no-op. Mutations
//! are never retried here; a failed call is reported and the caller decides.

use std::collections::BTreeSet;
use std::sync::Arc;

use cirrus_types::{
    LastOperationResult, NewServiceInstance, OperationKind, OperationState, PlanId, Region, Scope,
    ScopeId, ServiceInstanceRecord, ServiceKind, ServiceSettings, ServicesConfig, SharingEdge,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, ServiceError};
use crate::metadata::BrokerMetadata;
use crate::paging::collect_pages;
use crate::remote::{ResourceControlPlane, SpaceDirectory};

/// Request to create or update a broker-backed instance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManagedInstanceRequest {
    pub name: String,
    /// Catalog label of the offering
    pub service: String,
    pub plan: String,
    pub tags: BTreeSet<String>,
    pub parameters: Map<String, Value>,
    pub updatable: bool,
}

/// Request to create or update a user-provided instance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProvidedInstanceRequest {
    pub name: String,
    pub syslog_drain_url: Option<String>,
    pub tags: BTreeSet<String>,
    pub credentials: Map<String, Value>,
    pub route_service_url: Option<String>,
    pub updatable: bool,
}

/// Orchestrates create/update/share/unshare/destroy of service instances.
pub struct ServiceLifecycleManager {
    pub(crate) control_plane: Arc<dyn ResourceControlPlane>,
    pub(crate) directory: Arc<dyn SpaceDirectory>,
    pub(crate) config: ServicesConfig,
}

impl ServiceLifecycleManager {
    /// Create a manager with the default configuration
    pub fn new(
        control_plane: Arc<dyn ResourceControlPlane>,
        directory: Arc<dyn SpaceDirectory>,
    ) -> Self {
        Self {
            control_plane,
            directory,
            config: ServicesConfig::default(),
        }
    }

    /// Replace the default configuration
    pub fn with_config(mut self, config: ServicesConfig) -> Self {
        self.config = config;
        self
    }

    /// Create a managed instance, or update it when asked to.
    ///
    /// An existing instance that is not `updatable` is acknowledged as a
    /// CREATE without any remote mutation.
    #[instrument(skip(self, request, scope), fields(name = %request.name, scope = %scope))]
    pub async fn create_or_update(
        &self,
        request: &ManagedInstanceRequest,
        scope: &Scope,
    ) -> Result<LastOperationResult> {
        let plans = self.find_plans_by_service_label(&request.service).await?;
        let plan = plans
            .into_iter()
            .find(|plan| plan.name == request.plan)
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Service '{}' does not have a matching plan '{}'",
                    request.service, request.plan
                ))
            })?;

        let command = NewServiceInstance {
            name: request.name.clone(),
            scope_id: scope.id.clone(),
            tags: request.tags.clone(),
            settings: ServiceSettings::Managed {
                plan_id: plan.id.clone(),
                parameters: request.parameters.clone(),
            },
        };

        let operation = self
            .apply(&command, request.updatable, scope, |existing| {
                check_same_plan(&command.name, &plan.id, existing)
            })
            .await?;

        let state = if request.updatable {
            OperationState::InProgress
        } else {
            OperationState::Succeeded
        };
        Ok(LastOperationResult::new(&request.name, operation, state))
    }

    /// Create a user-provided instance, or update it when asked to.
    #[instrument(skip(self, request, scope), fields(name = %request.name, scope = %scope))]
    pub async fn create_or_update_user_provided(
        &self,
        request: &UserProvidedInstanceRequest,
        scope: &Scope,
    ) -> Result<LastOperationResult> {
        let command = NewServiceInstance {
            name: request.name.clone(),
            scope_id: scope.id.clone(),
            tags: request.tags.clone(),
            settings: ServiceSettings::UserProvided {
                syslog_drain_url: request.syslog_drain_url.clone(),
                credentials: request.credentials.clone(),
                route_service_url: request.route_service_url.clone(),
            },
        };

        let operation = self
            .apply(&command, request.updatable, scope, |existing| {
                match existing.kind {
                    ServiceKind::UserProvided => Ok(()),
                    ServiceKind::Managed { .. } => Err(ServiceError::Conflict(format!(
                        "A managed service with name '{}' already exists",
                        command.name
                    ))),
                }
            })
            .await?;

        Ok(LastOperationResult::new(
            &request.name,
            operation,
            OperationState::Succeeded,
        ))
    }

    async fn apply<V>(
        &self,
        command: &NewServiceInstance,
        updatable: bool,
        scope: &Scope,
        validate_update: V,
    ) -> Result<OperationKind>
    where
        V: FnOnce(&ServiceInstanceRecord) -> Result<()>,
    {
        let existing = self
            .directory
            .find_instance_by_name_in_scope(&scope.id, &command.name)
            .await
            .map_err(ServiceError::remote("looking up service instance"))?;

        match existing {
            Some(existing) if updatable => {
                validate_update(&existing)?;
                self.control_plane
                    .update(&existing.id, command)
                    .await
                    .map_err(ServiceError::remote("updating service instance"))?;
                info!(name = %command.name, id = %existing.id, "Updated service instance");
                Ok(OperationKind::Update)
            }
            Some(existing) => {
                debug!(name = %command.name, id = %existing.id, "Service instance exists, not updating");
                Ok(OperationKind::Create)
            }
            None => {
                let id = self
                    .control_plane
                    .create(command)
                    .await
                    .map_err(ServiceError::remote("creating service instance"))?
                    .ok_or_else(|| ServiceError::CreateFailed {
                        name: command.name.clone(),
                    })?;
                info!(name = %command.name, id = %id, "Created service instance");
                Ok(OperationKind::Create)
            }
        }
    }

    /// Destroy an instance that has no bindings.
    ///
    /// An instance that is already gone reports `NOT_FOUND`. Bindings are
    /// counted before deleting and any binding blocks the delete.
    #[instrument(skip(self, scope), fields(scope = %scope))]
    pub async fn destroy(&self, scope: &Scope, name: &str) -> Result<LastOperationResult> {
        let Some(instance) = self
            .directory
            .find_instance_by_name_in_scope(&scope.id, name)
            .await
            .map_err(ServiceError::remote("looking up service instance"))?
        else {
            debug!(name = name, "Service instance already absent");
            return Ok(LastOperationResult::new(
                name,
                OperationKind::Delete,
                OperationState::NotFound,
            ));
        };

        let control_plane = &self.control_plane;
        let id = &instance.id;
        let bindings = collect_pages("service bindings", move |page| {
            control_plane.list_bindings(id, page)
        })
        .await?;

        if !bindings.is_empty() {
            warn!(name = name, bindings = bindings.len(), "Refusing to destroy bound instance");
            return Err(ServiceError::BindingsExist {
                count: bindings.len(),
            });
        }

        self.control_plane
            .delete(&instance.id)
            .await
            .map_err(ServiceError::remote("deleting service instance"))?;
        info!(name = name, id = %instance.id, "Deleted service instance");

        let state = match instance.kind {
            ServiceKind::Managed { .. } => OperationState::InProgress,
            // Reported as observed on the remote side for synchronous deletes.
            ServiceKind::UserProvided => OperationState::NotFound,
        };
        Ok(LastOperationResult::new(name, OperationKind::Delete, state))
    }

    /// Share an instance from `region` into each of `share_to_regions`.
    ///
    /// Scopes the instance is already shared into are not resubmitted.
    #[instrument(skip(self))]
    pub async fn share(
        &self,
        region: &str,
        name: &str,
        share_to_regions: &[String],
    ) -> Result<LastOperationResult> {
        if region.trim().is_empty() {
            return Err(ServiceError::Validation(
                "Please specify a region for the sharing service instance".to_string(),
            ));
        }
        check_sharing_arguments(Some(region), name, share_to_regions, "sharing")?;

        let source = self
            .resolve_region(region)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cannot find region '{region}'")))?;
        let targets = self
            .resolve_sharing_regions(Some(&source), share_to_regions, "sharing")
            .await?;

        let instance = self
            .directory
            .find_instance_by_name_in_scope(&source.id, name)
            .await
            .map_err(ServiceError::remote("looking up service instance"))?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Cannot find service '{name}' in region '{region}'"
                ))
            })?;

        if let Some(plan_id) = instance.kind.plan_id() {
            self.check_shareable(name, plan_id).await?;
        }

        let shared_to = self
            .control_plane
            .get_share_targets(&instance.id)
            .await
            .map_err(ServiceError::remote("fetching share targets"))?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Could not fetch spaces to which '{name}' has been shared"
                ))
            })?;

        let requested: BTreeSet<SharingEdge> = targets
            .into_iter()
            .map(|target| SharingEdge {
                from_scope: source.id.clone(),
                to_scope: target.id,
                service_instance_id: instance.id.clone(),
            })
            .collect();
        let missing: BTreeSet<ScopeId> = requested
            .into_iter()
            .filter(|edge| !shared_to.contains(&edge.to_scope))
            .map(|edge| edge.to_scope)
            .collect();

        if missing.is_empty() {
            debug!(name = name, "Service instance already shared to every target");
        } else {
            self.control_plane
                .set_share_targets(&instance.id, &missing)
                .await
                .map_err(ServiceError::remote("sharing service instance"))?;
            info!(name = name, scopes = missing.len(), "Shared service instance");
        }

        Ok(LastOperationResult::new(
            name,
            OperationKind::Share,
            OperationState::Succeeded,
        ))
    }

    /// Withdraw shares of `name` from each of `unshare_from_regions`.
    ///
    /// Scopes where the instance is not visible are skipped.
    #[instrument(skip(self))]
    pub async fn unshare(
        &self,
        name: &str,
        unshare_from_regions: &[String],
    ) -> Result<LastOperationResult> {
        check_sharing_arguments(None, name, unshare_from_regions, "unsharing")?;
        let scopes = self
            .resolve_sharing_regions(None, unshare_from_regions, "unsharing")
            .await?;

        for scope in &scopes {
            let summary = self
                .directory
                .get_scope_summary(&scope.id)
                .await
                .map_err(ServiceError::remote("fetching scope summary"))?;

            let Some(summary) = summary else {
                debug!(scope = %scope, "No summary for scope, skipping");
                continue;
            };

            for entry in summary.services.iter().filter(|entry| entry.name == name) {
                self.control_plane
                    .remove_share_target(&entry.id, &scope.id)
                    .await
                    .map_err(ServiceError::remote("unsharing service instance"))?;
                info!(name = name, scope = %scope, "Unshared service instance");
            }
        }

        Ok(LastOperationResult::new(
            name,
            OperationKind::Unshare,
            OperationState::Succeeded,
        ))
    }

    /// Find an instance by name in a region.
    pub async fn get_service_instance(
        &self,
        region: &str,
        name: &str,
    ) -> Result<Option<ServiceInstanceRecord>> {
        let scope = self
            .resolve_region(region)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cannot find region '{region}'")))?;

        self.directory
            .find_instance_by_name_in_scope(&scope.id, name)
            .await
            .map_err(ServiceError::remote("looking up service instance"))
    }

    /// Resolve an `org > space` region to a scope.
    pub async fn resolve_region(&self, region: &str) -> Result<Option<Scope>> {
        let parsed = Region::parse_with(region, &self.config.region_separator).ok_or_else(|| {
            ServiceError::Validation(format!(
                "Region '{region}' is not of the form 'organization{}space'",
                self.config.region_separator
            ))
        })?;

        let scope_id = self
            .directory
            .resolve_scope(&parsed.organization, &parsed.space)
            .await
            .map_err(ServiceError::remote("resolving region"))?;

        Ok(scope_id.map(|id| Scope::new(id, parsed)))
    }

    /// Resolve each distinct region; with a `source`, none may resolve to it.
    async fn resolve_sharing_regions(
        &self,
        source: Option<&Scope>,
        regions: &[String],
        gerund: &str,
    ) -> Result<Vec<Scope>> {
        let unique: BTreeSet<&String> = regions.iter().collect();
        let mut scopes: Vec<Scope> = Vec::with_capacity(unique.len());
        for region in unique {
            let scope = self.resolve_region(region).await?.ok_or_else(|| {
                ServiceError::NotFound(format!("Cannot find region '{region}' for {gerund}"))
            })?;
            if source.is_some_and(|source| source.id == scope.id) {
                return Err(ServiceError::Validation(format!(
                    "Cannot specify '{region}' as any of the {gerund} regions"
                )));
            }
            if scopes.iter().all(|known| known.id != scope.id) {
                scopes.push(scope);
            }
        }
        Ok(scopes)
    }

    /// Check that a managed instance may be shared across scopes.
    pub async fn check_shareable(&self, name: &str, plan_id: &PlanId) -> Result<()> {
        let flag = &self.config.sharing_feature_flag;
        match self
            .control_plane
            .get_feature_flag(flag)
            .await
            .map_err(ServiceError::remote("reading feature flags"))?
        {
            Some(true) => {}
            Some(false) => {
                return Err(ServiceError::Conflict(format!(
                    "'{flag}' flag must be enabled in order to share services"
                )))
            }
            None => {
                return Err(ServiceError::NotFound(format!(
                    "'{flag}' flag is not defined; it must be enabled in order to share services"
                )))
            }
        }

        let plan = self
            .control_plane
            .find_plan(plan_id)
            .await
            .map_err(ServiceError::remote("looking up service plan"))?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("The service plan for '{name}' was not found"))
            })?;

        let service = self
            .control_plane
            .find_service(&plan.service_id)
            .await
            .map_err(ServiceError::remote("looking up service offering"))?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("The service broker for '{name}' was not found"))
            })?;

        let raw = service.broker_metadata.ok_or_else(|| {
            ServiceError::NotFound(format!(
                "The service broker for '{name}' has no metadata; it must be configured as 'shareable' in order to share services"
            ))
        })?;

        let metadata = BrokerMetadata::parse(&raw).map_err(|source| ServiceError::BrokerMetadata {
            service: name.to_string(),
            source,
        })?;

        if !metadata.shareable {
            return Err(ServiceError::Conflict(
                "The service broker must be configured as 'shareable' in order to share services"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

/// Argument checks that need no remote state.
fn check_sharing_arguments(
    shared_from: Option<&str>,
    name: &str,
    regions: &[String],
    gerund: &str,
) -> Result<()> {
    if name.trim().is_empty() {
        return Err(ServiceError::Validation(format!(
            "Please specify a name for the {gerund} service instance"
        )));
    }
    if regions.is_empty() {
        return Err(ServiceError::Validation(format!(
            "Please specify a list of regions for {gerund} '{name}'"
        )));
    }
    if let Some(shared_from) = shared_from {
        if regions.iter().any(|r| r == shared_from) {
            return Err(ServiceError::Validation(format!(
                "Cannot specify '{shared_from}' as any of the {gerund} regions"
            )));
        }
    }
    Ok(())
}

fn check_same_plan(name: &str, plan_id: &PlanId, existing: &ServiceInstanceRecord) -> Result<()> {
    match &existing.kind {
        ServiceKind::Managed { plan_id: current } if current == plan_id => Ok(()),
        ServiceKind::Managed { .. } => Err(ServiceError::Conflict(format!(
            "A service with name '{name}' exists but has a different plan"
        ))),
        ServiceKind::UserProvided => Err(ServiceError::Conflict(format!(
            "A user-provided service with name '{name}' already exists"
        ))),
    }
}
