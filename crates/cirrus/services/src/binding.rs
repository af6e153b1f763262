//! Binding service instances to applications

use cirrus_types::Scope;
use tracing::{info, instrument};

use crate::error::{Result, ServiceError};
use crate::lifecycle::ServiceLifecycleManager;
use crate::remote::ServiceBinding;

impl ServiceLifecycleManager {
    /// Bind every named instance in `scope` to an application.
    ///
    /// All names must resolve before any binding is created.
    #[instrument(skip(self, scope), fields(scope = %scope))]
    pub async fn bind_services_by_name(
        &self,
        scope: &Scope,
        application_id: &str,
        service_names: &[String],
    ) -> Result<Vec<ServiceBinding>> {
        if service_names.is_empty() {
            return Ok(Vec::new());
        }

        let instances = self
            .directory
            .find_instances_by_names_in_scope(&scope.id, service_names)
            .await
            .map_err(ServiceError::remote("looking up service instances"))?;

        if instances.len() != service_names.len() {
            return Err(ServiceError::NotFound(
                "Number of service instances does not match the number of service names"
                    .to_string(),
            ));
        }

        let mut bindings = Vec::with_capacity(instances.len());
        for instance in &instances {
            let binding = self
                .control_plane
                .create_binding(&instance.id, application_id)
                .await
                .map_err(ServiceError::remote("binding service instance"))?;
            info!(service = %instance.name, application_id = application_id, "Bound service instance");
            bindings.push(binding);
        }
        Ok(bindings)
    }
}
