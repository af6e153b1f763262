//! Service catalog lookups

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{Result, ServiceError};
use crate::lifecycle::ServiceLifecycleManager;
use crate::paging::collect_pages;
use crate::remote::ServicePlan;

/// A catalog offering available in a region, with its plans
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogService {
    pub name: String,
    pub plans: Vec<ServicePlan>,
}

impl ServiceLifecycleManager {
    /// All plans of the offering labelled `label`.
    ///
    /// An unknown label, or an offering without plans, is not found.
    pub async fn find_plans_by_service_label(&self, label: &str) -> Result<Vec<ServicePlan>> {
        let no_plans =
            || ServiceError::NotFound(format!("No plans available for service name '{label}'"));

        let service = self
            .control_plane
            .find_service_by_label(label)
            .await
            .map_err(ServiceError::remote("looking up service by label"))?
            .ok_or_else(no_plans)?;

        let control_plane = &self.control_plane;
        let service_id = &service.id;
        let plans = collect_pages("service plans", move |page| {
            control_plane.list_service_plans(service_id, page)
        })
        .await?;

        if plans.is_empty() {
            return Err(no_plans());
        }
        Ok(plans)
    }

    /// Every offering visible in `region`, with its plans.
    ///
    /// A region that does not resolve has no services.
    #[instrument(skip(self))]
    pub async fn find_all_services_by_region(&self, region: &str) -> Result<Vec<CatalogService>> {
        let Some(scope) = self.resolve_region(region).await? else {
            debug!(region = region, "Region not found, no services");
            return Ok(Vec::new());
        };

        let control_plane = &self.control_plane;
        let scope_id = &scope.id;
        let offerings = collect_pages("services in scope", move |page| {
            control_plane.list_scope_services(scope_id, page)
        })
        .await?;

        let mut services = Vec::with_capacity(offerings.len());
        for offering in offerings {
            let service_id = &offering.id;
            let plans = collect_pages("service plans", move |page| {
                control_plane.list_service_plans(service_id, page)
            })
            .await?;
            services.push(CatalogService {
                name: offering.label,
                plans,
            });
        }
        Ok(services)
    }
}
