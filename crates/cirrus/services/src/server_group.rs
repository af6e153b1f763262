//! Server group operations driven through [`ApplicationControl`]

use std::collections::BTreeMap;
use std::sync::Arc;

use cirrus_types::ProgressSink;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::{Result, ServiceError};
use crate::remote::ApplicationControl;

const STOP_PHASE: &str = "STOP_SERVER_GROUP";

/// Identifies the server group to stop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopServerGroupDescription {
    pub region: String,
    pub server_group_name: String,
    pub server_group_id: String,
}

/// Outcome of a server group operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentResult {
    /// Affected server groups as `region:name`
    pub server_group_names: Vec<String>,
    pub server_group_name_by_region: BTreeMap<String, String>,
    /// Progress history as `phase:status`
    pub messages: Vec<String>,
}

/// Stops and reports on deployed server groups.
pub struct ServerGroupOperations {
    applications: Arc<dyn ApplicationControl>,
}

impl ServerGroupOperations {
    pub fn new(applications: Arc<dyn ApplicationControl>) -> Self {
        Self { applications }
    }

    /// Stop a server group, recording progress to `progress`.
    #[instrument(skip(self, progress), fields(server_group = %description.server_group_name))]
    pub async fn stop(
        &self,
        progress: &dyn ProgressSink,
        description: &StopServerGroupDescription,
    ) -> Result<DeploymentResult> {
        progress.record(
            STOP_PHASE,
            &format!("Stopping '{}'", description.server_group_name),
        );

        self.applications
            .stop_application(&description.server_group_id)
            .await
            .map_err(ServiceError::remote("stopping application"))?;
        info!(region = %description.region, "Stopped server group");

        let mut by_region = BTreeMap::new();
        by_region.insert(
            description.region.clone(),
            description.server_group_name.clone(),
        );

        Ok(DeploymentResult {
            server_group_names: vec![format!(
                "{}:{}",
                description.region, description.server_group_name
            )],
            server_group_name_by_region: by_region,
            messages: progress.history().iter().map(|entry| entry.message()).collect(),
        })
    }
}
