use std::collections::BTreeSet;
use std::sync::Arc;

use cirrus_services::{
    InMemoryCloud, ManagedInstanceRequest, RecordedCall, ServiceError, ServiceLifecycleManager,
    UserProvidedInstanceRequest,
};
use cirrus_types::{
    ErrorKind, OperationKind, OperationState, PlanId, Region, Scope, ServiceKind, ServicesConfig,
};

struct Fixture {
    cloud: Arc<InMemoryCloud>,
    manager: ServiceLifecycleManager,
    scope: Scope,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn fixture() -> Fixture {
    init_tracing();
    let cloud = Arc::new(InMemoryCloud::new().with_page_size(2));
    let scope_id = cloud.add_scope("org", "dev", "space-dev");
    let service = cloud.add_offering("svc-mysql", "mysql", Some(r#"{"shareable": true}"#));
    cloud.add_plan(&service, "plan-small", "small");
    cloud.add_plan(&service, "plan-large", "large");
    cloud.offer_in_scope(&scope_id, &service);

    let manager = ServiceLifecycleManager::new(cloud.clone(), cloud.clone());
    Fixture {
        cloud,
        manager,
        scope: Scope::new(scope_id, Region::new("org", "dev")),
    }
}

fn managed(name: &str, plan: &str, updatable: bool) -> ManagedInstanceRequest {
    ManagedInstanceRequest {
        name: name.to_string(),
        service: "mysql".to_string(),
        plan: plan.to_string(),
        updatable,
        ..Default::default()
    }
}

fn user_provided(name: &str, updatable: bool) -> UserProvidedInstanceRequest {
    UserProvidedInstanceRequest {
        name: name.to_string(),
        syslog_drain_url: Some("syslog://logs.example.com".to_string()),
        updatable,
        ..Default::default()
    }
}

#[tokio::test]
async fn creates_missing_managed_instance() {
    let f = fixture();

    let result = f
        .manager
        .create_or_update(&managed("db", "small", false), &f.scope)
        .await
        .unwrap();

    assert_eq!(result.operation, OperationKind::Create);
    assert_eq!(result.state, OperationState::Succeeded);
    assert_eq!(
        f.cloud.calls(),
        vec![RecordedCall::Create {
            name: "db".to_string()
        }]
    );
}

#[tokio::test]
async fn updatable_create_reports_in_progress() {
    let f = fixture();

    let result = f
        .manager
        .create_or_update(&managed("db", "small", true), &f.scope)
        .await
        .unwrap();

    assert_eq!(result.operation, OperationKind::Create);
    assert_eq!(result.state, OperationState::InProgress);
}

#[tokio::test]
async fn existing_instance_without_update_is_untouched() {
    let f = fixture();
    f.cloud.add_instance(
        &f.scope.id,
        "si-1",
        "db",
        ServiceKind::Managed {
            plan_id: PlanId::new("plan-small"),
        },
    );

    let result = f
        .manager
        .create_or_update(&managed("db", "large", false), &f.scope)
        .await
        .unwrap();

    assert_eq!(result.operation, OperationKind::Create);
    assert_eq!(result.state, OperationState::Succeeded);
    assert!(f.cloud.calls().is_empty());
}

#[tokio::test]
async fn update_keeps_the_plan() {
    let f = fixture();
    let id = f.cloud.add_instance(
        &f.scope.id,
        "si-1",
        "db",
        ServiceKind::Managed {
            plan_id: PlanId::new("plan-small"),
        },
    );

    let result = f
        .manager
        .create_or_update(&managed("db", "small", true), &f.scope)
        .await
        .unwrap();

    assert_eq!(result.operation, OperationKind::Update);
    assert_eq!(result.state, OperationState::InProgress);
    assert_eq!(f.cloud.calls(), vec![RecordedCall::Update { id }]);
}

#[tokio::test]
async fn plan_change_is_rejected_without_update() {
    let f = fixture();
    f.cloud.add_instance(
        &f.scope.id,
        "si-1",
        "db",
        ServiceKind::Managed {
            plan_id: PlanId::new("plan-small"),
        },
    );

    let err = f
        .manager
        .create_or_update(&managed("db", "large", true), &f.scope)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert!(err.to_string().contains("different plan"));
    assert!(f.cloud.calls().is_empty());
}

#[tokio::test]
async fn unknown_plan_is_not_found() {
    let f = fixture();

    let err = f
        .manager
        .create_or_update(&managed("db", "huge", false), &f.scope)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(
        err.to_string(),
        "Service 'mysql' does not have a matching plan 'huge'"
    );
    assert!(f.cloud.calls().is_empty());
}

#[tokio::test]
async fn unknown_service_has_no_plans() {
    let f = fixture();
    let mut request = managed("db", "small", false);
    request.service = "redis".to_string();

    let err = f
        .manager
        .create_or_update(&request, &f.scope)
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "No plans available for service name 'redis'"
    );
}

#[tokio::test]
async fn create_without_identifier_fails() {
    let cloud = Arc::new(InMemoryCloud::new().without_created_ids());
    let scope_id = cloud.add_scope("org", "dev", "space-dev");
    let service = cloud.add_offering("svc-mysql", "mysql", None);
    cloud.add_plan(&service, "plan-small", "small");
    let manager = ServiceLifecycleManager::new(cloud.clone(), cloud.clone());
    let scope = Scope::new(scope_id, Region::new("org", "dev"));

    let err = manager
        .create_or_update(&managed("db", "small", false), &scope)
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::CreateFailed { .. }));
    assert_eq!(err.kind(), ErrorKind::RemoteFailure);
}

#[tokio::test]
async fn user_provided_create_and_update() {
    let f = fixture();

    let created = f
        .manager
        .create_or_update_user_provided(&user_provided("logs", true), &f.scope)
        .await
        .unwrap();
    assert_eq!(created.operation, OperationKind::Create);
    assert_eq!(created.state, OperationState::Succeeded);

    let updated = f
        .manager
        .create_or_update_user_provided(&user_provided("logs", true), &f.scope)
        .await
        .unwrap();
    assert_eq!(updated.operation, OperationKind::Update);
    assert_eq!(updated.state, OperationState::Succeeded);

    let repeated = f
        .manager
        .create_or_update_user_provided(&user_provided("logs", false), &f.scope)
        .await
        .unwrap();
    assert_eq!(repeated.operation, OperationKind::Create);
    assert_eq!(f.cloud.calls().len(), 2);
}

#[tokio::test]
async fn user_provided_update_of_managed_instance_conflicts() {
    let f = fixture();
    f.cloud.add_instance(
        &f.scope.id,
        "si-1",
        "db",
        ServiceKind::Managed {
            plan_id: PlanId::new("plan-small"),
        },
    );

    let err = f
        .manager
        .create_or_update_user_provided(&user_provided("db", true), &f.scope)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert!(f.cloud.calls().is_empty());
}

#[tokio::test]
async fn destroy_absent_instance_is_not_found() {
    let f = fixture();

    let result = f.manager.destroy(&f.scope, "ghost").await.unwrap();

    assert_eq!(result.operation, OperationKind::Delete);
    assert_eq!(result.state, OperationState::NotFound);
    assert!(f.cloud.calls().is_empty());
}

#[tokio::test]
async fn destroy_refuses_bound_instance() {
    let f = fixture();
    let id = f.cloud.add_instance(
        &f.scope.id,
        "si-1",
        "db",
        ServiceKind::Managed {
            plan_id: PlanId::new("plan-small"),
        },
    );
    // Page size is two, so the count spans pages.
    for app in ["app-1", "app-2", "app-3"] {
        f.cloud.add_binding(&id, app);
    }

    let err = f.manager.destroy(&f.scope, "db").await.unwrap_err();

    assert!(matches!(err, ServiceError::BindingsExist { count: 3 }));
    assert_eq!(
        err.to_string(),
        "Unable to destroy service instance while 3 service binding(s) exist"
    );
    assert!(f.cloud.calls().is_empty());
    assert!(f.cloud.has_instance(&id));
}

#[tokio::test]
async fn destroy_managed_instance_deletes_once() {
    let f = fixture();
    let id = f.cloud.add_instance(
        &f.scope.id,
        "si-1",
        "db",
        ServiceKind::Managed {
            plan_id: PlanId::new("plan-small"),
        },
    );

    let result = f.manager.destroy(&f.scope, "db").await.unwrap();

    assert_eq!(result.state, OperationState::InProgress);
    assert_eq!(f.cloud.calls(), vec![RecordedCall::Delete { id }]);

    let again = f.manager.destroy(&f.scope, "db").await.unwrap();
    assert_eq!(again.state, OperationState::NotFound);
    assert_eq!(f.cloud.calls().len(), 1);
}

#[tokio::test]
async fn destroy_user_provided_reports_not_found() {
    let f = fixture();
    f.cloud
        .add_instance(&f.scope.id, "si-2", "logs", ServiceKind::UserProvided);

    let result = f.manager.destroy(&f.scope, "logs").await.unwrap();

    assert_eq!(result.operation, OperationKind::Delete);
    assert_eq!(result.state, OperationState::NotFound);
    assert_eq!(f.cloud.calls().len(), 1);
}

#[tokio::test]
async fn bind_by_name_requires_every_instance() {
    let f = fixture();
    f.cloud
        .add_instance(&f.scope.id, "si-2", "logs", ServiceKind::UserProvided);

    let names = vec!["logs".to_string(), "missing".to_string()];
    let err = f
        .manager
        .bind_services_by_name(&f.scope, "app-1", &names)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(f.cloud.calls().is_empty());

    let bindings = f
        .manager
        .bind_services_by_name(&f.scope, "app-1", &names[..1])
        .await
        .unwrap();
    assert_eq!(bindings.len(), 1);
    assert_eq!(bindings[0].application_id, "app-1");
}

#[tokio::test]
async fn bind_with_no_names_is_a_no_op() {
    let f = fixture();

    let bindings = f
        .manager
        .bind_services_by_name(&f.scope, "app-1", &[])
        .await
        .unwrap();

    assert!(bindings.is_empty());
    assert!(f.cloud.calls().is_empty());
}

#[tokio::test]
async fn catalog_lists_services_with_plans() {
    let f = fixture();

    let services = f
        .manager
        .find_all_services_by_region("org > dev")
        .await
        .unwrap();
    assert_eq!(services.len(), 1);
    assert_eq!(services[0].name, "mysql");
    let plans: BTreeSet<&str> = services[0].plans.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(plans, BTreeSet::from(["small", "large"]));

    let unknown = f
        .manager
        .find_all_services_by_region("org > prod")
        .await
        .unwrap();
    assert!(unknown.is_empty());
}

#[tokio::test]
async fn malformed_region_is_a_validation_error() {
    let f = fixture();

    let err = f
        .manager
        .get_service_instance("org-dev", "db")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn resolved_scope_renders_with_configured_separator() {
    let f = fixture();
    let manager = ServiceLifecycleManager::new(f.cloud.clone(), f.cloud.clone()).with_config(
        ServicesConfig {
            region_separator: "/".to_string(),
            ..ServicesConfig::default()
        },
    );

    let scope = manager.resolve_region("org/dev").await.unwrap().unwrap();

    assert_eq!(scope.id.as_str(), "space-dev");
    assert_eq!(scope.region.to_string(), "org/dev");
    assert_eq!(scope.to_string(), "org/dev (space-dev)");
}
