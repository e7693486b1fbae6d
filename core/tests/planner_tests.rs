use rollout_core::catalog::{Environment, RequestContext, StaticProvider};
use rollout_core::keys::KeyPair;
use rollout_core::model::{Blueprint, Component, Deployment, EnvironmentDef, JsonMap};
use rollout_core::operation::{get_status, PostbackHandler};
use rollout_core::resolver::ResolverError;
use rollout_core::{Config, DefaultPlanner, DeploymentStatus, PlannerError, ResourceId, ResourceStatus};
use serde_json::json;
use std::sync::Arc;

fn environment(components: serde_json::Value) -> Arc<Environment> {
    let components: Vec<Component> = serde_json::from_value(components).unwrap();
    Arc::new(Environment::new().with_provider(Arc::new(StaticProvider::new(
        "test-cloud",
        components,
    ))))
}

fn deployment(blueprint: serde_json::Value) -> Deployment {
    let blueprint: Blueprint = serde_json::from_value(blueprint).unwrap();
    Deployment::new(blueprint, EnvironmentDef::default())
}

fn web_db_catalog() -> Arc<Environment> {
    environment(json!([
        {"id": "web-vm", "provides": [{"compute": "mysql"}]},
        {"id": "mysql-db", "provides": [{"database": "mysql"}],
         "requires": {"client": {"interface": "mysql"}}},
    ]))
}

fn web_db_blueprint() -> serde_json::Value {
    json!({
        "services": {
            "web": {"component": {"type": "compute"}},
            "db": {
                "component": {"type": "database"},
                "relations": {"web": {"service": "web", "interface": "mysql"}}
            }
        }
    })
}

#[tokio::test]
async fn plans_a_two_service_blueprint_into_two_connected_resources() {
    let mut deployment = deployment(web_db_blueprint());
    let planner = DefaultPlanner::new(Config::default(), web_db_catalog());

    let resources = planner
        .plan(&mut deployment, &RequestContext::default())
        .await
        .unwrap();

    assert_eq!(resources.len(), 2);
    assert_eq!(deployment.status(), DeploymentStatus::Planned);
    assert_eq!(deployment.connections()["web"].interface, "mysql");

    // Services materialize in name order: db gets index 0, web index 1.
    let db = deployment.resource(&ResourceId::Dynamic(0)).unwrap();
    assert_eq!(db.service(), Some("db"));
    assert_eq!(db.status(), ResourceStatus::Planned);

    let web = deployment.resource(&ResourceId::Dynamic(1)).unwrap();
    assert_eq!(web.service(), Some("web"));

    // Exactly one relation-instance pair: the db side points at the web
    // resource, the web side points back.
    let db_relation = db.relation("web-1").unwrap();
    assert_eq!(db_relation.target, Some(ResourceId::Dynamic(1)));
    assert_eq!(db_relation.source, None);

    let web_relation = web.relation("web-0").unwrap();
    assert_eq!(web_relation.source, Some(ResourceId::Dynamic(0)));
    assert_eq!(web_relation.target, None);
}

#[tokio::test]
async fn service_counts_fan_relations_out_per_instance_pair() {
    let mut deployment = deployment(json!({
        "services": {
            "web": {
                "component": {"type": "compute"},
                "constraints": [{"count": 3}]
            },
            "db": {
                "component": {"type": "database"},
                "relations": {"web": {"service": "web", "interface": "mysql"}}
            }
        }
    }));
    let planner = DefaultPlanner::new(Config::default(), web_db_catalog());

    let resources = planner
        .plan(&mut deployment, &RequestContext::default())
        .await
        .unwrap();

    assert_eq!(resources.len(), 4);

    let web_count = deployment
        .resources()
        .values()
        .filter(|r| r.service() == Some("web"))
        .count();
    assert_eq!(web_count, 3);

    // One write per (db instance, web instance) pair on the db resource.
    let db = deployment.resource(&ResourceId::Dynamic(0)).unwrap();
    let fan_out: Vec<&String> = db
        .relations()
        .keys()
        .filter(|key| key.starts_with("web-"))
        .collect();
    assert_eq!(fan_out.len(), 3);
}

#[tokio::test]
async fn all_resource_indices_are_unique_and_ordered() {
    let mut deployment = deployment(json!({
        "services": {
            "web": {
                "component": {"type": "compute"},
                "constraints": [{"count": 4}]
            },
            "db": {"component": {"type": "database"}}
        }
    }));
    let planner = DefaultPlanner::new(Config::default(), web_db_catalog());

    let resources = planner
        .plan(&mut deployment, &RequestContext::default())
        .await
        .unwrap();

    let dynamic: Vec<u64> = resources
        .keys()
        .filter_map(|id| match id {
            ResourceId::Dynamic(index) => Some(*index),
            ResourceId::Static(_) => None,
        })
        .collect();
    assert_eq!(dynamic, (0..5).collect::<Vec<u64>>());
}

#[tokio::test]
async fn host_requirements_materialize_hosting_pairs() {
    let environment = environment(json!([
        {"id": "wordpress", "provides": [{"application": "http"}],
         "requires": {"host": {"interface": "linux.instance", "relation": "host"}}},
        {"id": "tiny-vm", "provides": [{"compute": "linux.instance"}]},
    ]));
    let mut deployment = deployment(json!({
        "services": {"web": {"component": {"id": "wordpress"}}}
    }));
    let planner = DefaultPlanner::new(Config::default(), environment);

    let resources = planner
        .plan(&mut deployment, &RequestContext::default())
        .await
        .unwrap();
    assert_eq!(resources.len(), 2);

    let app = deployment.resource(&ResourceId::Dynamic(0)).unwrap();
    assert_eq!(app.component(), Some("wordpress"));
    assert_eq!(app.hosted_on(), Some(&ResourceId::Dynamic(1)));
    let host_relation = app.relation("host").unwrap();
    assert_eq!(host_relation.target, Some(ResourceId::Dynamic(1)));

    let vm = deployment.resource(&ResourceId::Dynamic(1)).unwrap();
    assert_eq!(vm.component(), Some("tiny-vm"));
    assert_eq!(vm.hosts(), &[ResourceId::Dynamic(0)]);

    // Hosts come first in the provisioning order.
    let graph = planner.task_graph(&deployment).unwrap();
    let order: Vec<&ResourceId> = graph.tasks().iter().map(|t| &t.resource).collect();
    assert_eq!(order, vec![&ResourceId::Dynamic(1), &ResourceId::Dynamic(0)]);
}

#[tokio::test]
async fn failed_planning_leaves_the_deployment_untouched() {
    let environment = environment(json!([
        {"id": "a", "provides": [{"service-a": "a"}],
         "requires": {"needs-b": {"interface": "b"}}},
        {"id": "b", "provides": [{"service-b": "b"}],
         "requires": {"needs-a": {"interface": "a"}}},
    ]));
    let mut deployment = deployment(json!({
        "services": {"app": {"component": {"id": "a"}}}
    }));
    let planner = DefaultPlanner::new(Config::default(), environment);

    let result = planner
        .plan(&mut deployment, &RequestContext::default())
        .await;
    assert!(matches!(
        result,
        Err(PlannerError::ResolverError(
            ResolverError::DependencyLoopDetected { .. }
        ))
    ));

    // No partial publish: the deployment can be re-planned from NEW.
    assert_eq!(deployment.status(), DeploymentStatus::New);
    assert!(deployment.resources().is_empty());
    assert!(deployment.connections().is_empty());
}

#[tokio::test]
async fn planning_twice_requires_a_fresh_deployment() {
    let mut deployment = deployment(web_db_blueprint());
    let planner = DefaultPlanner::new(Config::default(), web_db_catalog());

    planner
        .plan(&mut deployment, &RequestContext::default())
        .await
        .unwrap();
    let result = planner
        .plan(&mut deployment, &RequestContext::default())
        .await;
    assert!(matches!(
        result,
        Err(PlannerError::DeploymentNotNew {
            status: DeploymentStatus::Planned
        })
    ));
}

#[tokio::test]
async fn static_users_get_generated_credentials() {
    let mut deployment = deployment(json!({
        "services": {"web": {"component": {"type": "compute"}}},
        "resources": {"myUser": {"type": "user"}}
    }));
    let planner = DefaultPlanner::new(Config::default(), web_db_catalog());

    planner
        .plan(&mut deployment, &RequestContext::default())
        .await
        .unwrap();

    let user = deployment
        .resource(&ResourceId::Static("myUser".to_string()))
        .unwrap();
    assert_eq!(user.resource_type(), "user");

    let instance = user.instance();
    assert_eq!(instance["name"], "admin");
    assert_eq!(instance["password"].as_str().unwrap().len(), 12);

    let hash = instance["hash"].as_str().unwrap();
    let parts: Vec<&str> = hash.splitn(4, '$').collect();
    assert_eq!(parts[1], "6");
    assert!(!parts[2].is_empty());
    assert!(parts[3].bytes().all(|b| b.is_ascii_hexdigit()));
}

#[tokio::test]
async fn supplied_private_keys_are_completed_not_replaced() {
    let pair = KeyPair::generate(2048).unwrap();
    let mut deployment = deployment(json!({
        "services": {"web": {"component": {"type": "compute"}}},
        "resources": {
            "deployer-keys": {"type": "key-pair", "private_key": pair.private_pem()}
        }
    }));
    let planner = DefaultPlanner::new(Config::default(), web_db_catalog());

    planner
        .plan(&mut deployment, &RequestContext::default())
        .await
        .unwrap();

    let keys = deployment
        .resource(&ResourceId::Static("deployer-keys".to_string()))
        .unwrap();
    let instance = keys.instance();
    assert_eq!(instance["private_key"], pair.private_pem());
    assert_eq!(instance["public_key"], pair.public_pem());
    assert_eq!(instance["public_key_ssh"], pair.public_ssh());
}

#[tokio::test]
async fn postbacks_drive_the_deployment_lifecycle() {
    let mut deployment = deployment(web_db_blueprint());
    let planner = DefaultPlanner::new(Config::default(), web_db_catalog());
    planner
        .plan(&mut deployment, &RequestContext::default())
        .await
        .unwrap();

    let handler = PostbackHandler::new(&Config::default());
    let build: JsonMap = json!({
        "instance:0": {"status": "BUILD"},
        "instance:1": {"status": "ACTIVE", "ip": "1.2.3.4"}
    })
    .as_object()
    .unwrap()
    .clone();
    handler.apply_postback(&mut deployment, &build).unwrap();

    // One building resource holds the whole deployment in BUILD.
    assert_eq!(deployment.status(), DeploymentStatus::Build);

    let done: JsonMap = json!({"instance:0": {"status": "ACTIVE"}})
        .as_object()
        .unwrap()
        .clone();
    handler.apply_postback(&mut deployment, &done).unwrap();
    assert_eq!(deployment.status(), DeploymentStatus::Active);

    let report = get_status(&deployment);
    assert_eq!(report.status, DeploymentStatus::Active);
    assert_eq!(
        report.resources[&ResourceId::Dynamic(1)],
        ResourceStatus::Active
    );
    assert!(report.errors.is_empty());
}

#[tokio::test]
async fn planning_announces_itself_on_the_event_channel() {
    use rollout_core::events::event::{Event, PlannerEvent};

    let config = Config::default();
    let consumer = config.event_channel().consumer();

    let mut deployment = deployment(web_db_blueprint());
    let planner = DefaultPlanner::new(config, web_db_catalog());
    planner
        .plan(&mut deployment, &RequestContext::default())
        .await
        .unwrap();

    consumer.fetch();
    let events: Vec<Event> = (&consumer).collect();
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::PlannerEvent(PlannerEvent::PlanningStarted { .. }))));
    assert!(events.iter().any(|e| matches!(
        e,
        Event::PlannerEvent(PlannerEvent::PlanningCompleted { resource_count: 2, .. })
    )));
}
