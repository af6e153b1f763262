//! Service instance snapshots and creation requests

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

use crate::ids::{PlanId, ScopeId, ServiceInstanceId};
use crate::operation::OperationState;

/// The kind of a service instance, with kind-specific fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServiceKind {
    /// Broker-backed instance, provisioned asynchronously against a plan.
    Managed { plan_id: PlanId },
    /// Credentials record supplied by the user, applied synchronously.
    UserProvided,
}

impl ServiceKind {
    pub fn is_managed(&self) -> bool {
        matches!(self, ServiceKind::Managed { .. })
    }

    pub fn plan_id(&self) -> Option<&PlanId> {
        match self {
            ServiceKind::Managed { plan_id } => Some(plan_id),
            ServiceKind::UserProvided => None,
        }
    }
}

/// Read-through snapshot of a remote service instance.
///
/// Never cached; every operation re-reads it from the remote directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInstanceRecord {
    pub id: ServiceInstanceId,
    pub name: String,
    pub kind: ServiceKind,
    /// State of the last remote operation on this instance
    pub status: OperationState,
}

/// Kind-specific settings of a create or update request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServiceSettings {
    Managed {
        plan_id: PlanId,
        parameters: Map<String, Value>,
    },
    UserProvided {
        syslog_drain_url: Option<String>,
        credentials: Map<String, Value>,
        route_service_url: Option<String>,
    },
}

/// Body of a remote create or update call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewServiceInstance {
    pub name: String,
    pub scope_id: ScopeId,
    pub tags: BTreeSet<String>,
    pub settings: ServiceSettings,
}

/// A cross-scope visibility grant of one service instance.
///
/// Grants are set-valued; ordering lets callers collect them into sets.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SharingEdge {
    pub from_scope: ScopeId,
    pub to_scope: ScopeId,
    pub service_instance_id: ServiceInstanceId,
}
