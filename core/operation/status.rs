use crate::model::{
    Deployment, DeploymentStatus, Operation, OperationStatus, ResourceId, ResourceStatus,
};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::*;

/// Derive a deployment's aggregate status from its dynamic resources'
/// statuses and record any resource errors.
///
/// ERROR is handled first and is sticky: any resource in ERROR forces the
/// deployment to ERROR (collecting its message, deduplicated), and an ERROR
/// deployment stays in ERROR until an external reset. Otherwise the
/// precedence is: any DELETING; all DELETED; all PLANNED; all NEW; all
/// ACTIVE; any CONFIGURE; any BUILD. A mix matching none of these leaves the
/// status unchanged.
///
/// Postbacks can arrive out of order and duplicated, so this is re-evaluated
/// from scratch on every call rather than assumed monotonic.
#[instrument(name = "check_and_set_dep_status", skip(deployment))]
pub fn check_and_set_dep_status(deployment: &mut Deployment) -> DeploymentStatus {
    let error_messages: Vec<String> = deployment
        .dynamic_resources()
        .filter(|r| r.status() == ResourceStatus::Error)
        .filter_map(|r| r.error_message().map(String::from))
        .collect();
    let any_error = deployment
        .dynamic_resources()
        .any(|r| r.status() == ResourceStatus::Error);

    for message in error_messages {
        deployment.push_error_message(message);
    }

    if any_error || deployment.status() == DeploymentStatus::Error {
        deployment.set_status(DeploymentStatus::Error);
        sync_operation(deployment);
        return DeploymentStatus::Error;
    }

    let mut total = 0usize;
    let mut counts: BTreeMap<ResourceStatus, usize> = BTreeMap::new();
    for resource in deployment.dynamic_resources() {
        total += 1;
        *counts.entry(resource.status()).or_default() += 1;
    }
    let count = |status: ResourceStatus| counts.get(&status).copied().unwrap_or(0);

    if total == 0 {
        debug!(
            "Deployment {} has no dynamic resources; leaving status {}",
            deployment.id(),
            deployment.status()
        );
        return deployment.status();
    }

    let next = if count(ResourceStatus::Deleting) > 0 {
        Some(DeploymentStatus::Deleting)
    } else if count(ResourceStatus::Deleted) == total {
        Some(DeploymentStatus::Deleted)
    } else if count(ResourceStatus::Planned) == total {
        Some(DeploymentStatus::Planned)
    } else if count(ResourceStatus::New) == total {
        Some(DeploymentStatus::New)
    } else if count(ResourceStatus::Active) == total {
        Some(DeploymentStatus::Active)
    } else if count(ResourceStatus::Configure) > 0 {
        Some(DeploymentStatus::Configure)
    } else if count(ResourceStatus::Build) > 0 {
        Some(DeploymentStatus::Build)
    } else {
        None
    };

    match next {
        Some(status) => deployment.set_status(status),
        None => debug!(
            "Deployment {} resource statuses are indeterminate ({:?}); leaving status {}",
            deployment.id(),
            counts,
            deployment.status()
        ),
    }

    sync_operation(deployment);
    deployment.status()
}

/// Keep the active operation's aggregate fields in step with the deployment.
fn sync_operation(deployment: &mut Deployment) {
    let status = deployment.status();
    let complete = deployment
        .dynamic_resources()
        .filter(|r| r.status() == ResourceStatus::Active)
        .count();
    let errors: Vec<String> = deployment.error_messages().to_vec();

    let Some(operation) = deployment.operation_mut() else {
        return;
    };
    operation.set_complete(complete);
    for error in errors {
        operation.push_error(error);
    }
    let op_status = match status {
        DeploymentStatus::Error => OperationStatus::Error,
        DeploymentStatus::Active | DeploymentStatus::Deleted => OperationStatus::Complete,
        DeploymentStatus::New | DeploymentStatus::Planned => OperationStatus::New,
        _ => OperationStatus::InProgress,
    };
    operation.set_status(op_status);
}

/// What status-reporting callers get to see of a deployment.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub status: DeploymentStatus,
    pub resources: BTreeMap<ResourceId, ResourceStatus>,
    pub operation: Option<Operation>,
    pub errors: Vec<String>,
}

pub fn get_status(deployment: &Deployment) -> StatusReport {
    StatusReport {
        status: deployment.status(),
        resources: deployment
            .resources()
            .iter()
            .map(|(id, resource)| (id.clone(), resource.status()))
            .collect(),
        operation: deployment.operation().cloned(),
        errors: deployment.error_messages().to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Blueprint, EnvironmentDef, Resource};

    fn deployment_with_statuses(statuses: &[ResourceStatus]) -> Deployment {
        let mut deployment = Deployment::new(Blueprint::default(), EnvironmentDef::default());
        let mut resources = BTreeMap::new();
        for (index, status) in statuses.iter().enumerate() {
            let resource = Resource::builder()
                .id(ResourceId::Dynamic(index as u64))
                .resource_type("compute".to_string())
                .provider(Some("test-cloud".to_string()))
                .status(*status)
                .build()
                .unwrap();
            resources.insert(resource.id().clone(), resource);
        }
        deployment.commit_plan(resources, Default::default());
        deployment
    }

    #[test]
    fn all_planned_resources_mean_a_planned_deployment() {
        let mut deployment =
            deployment_with_statuses(&[ResourceStatus::Planned, ResourceStatus::Planned]);
        assert_eq!(
            check_and_set_dep_status(&mut deployment),
            DeploymentStatus::Planned
        );
    }

    #[test]
    fn one_building_resource_keeps_the_deployment_in_build() {
        let mut deployment =
            deployment_with_statuses(&[ResourceStatus::Build, ResourceStatus::Active]);
        assert_eq!(
            check_and_set_dep_status(&mut deployment),
            DeploymentStatus::Build
        );
    }

    #[test]
    fn configure_outranks_build() {
        let mut deployment = deployment_with_statuses(&[
            ResourceStatus::Build,
            ResourceStatus::Configure,
            ResourceStatus::Active,
        ]);
        assert_eq!(
            check_and_set_dep_status(&mut deployment),
            DeploymentStatus::Configure
        );
    }

    #[test]
    fn any_deleting_resource_wins() {
        let mut deployment =
            deployment_with_statuses(&[ResourceStatus::Deleting, ResourceStatus::Active]);
        assert_eq!(
            check_and_set_dep_status(&mut deployment),
            DeploymentStatus::Deleting
        );
    }

    #[test]
    fn errors_are_sticky_and_collect_messages_once() {
        let mut deployment =
            deployment_with_statuses(&[ResourceStatus::Error, ResourceStatus::Active]);
        deployment
            .resource_mut(&ResourceId::Dynamic(0))
            .unwrap()
            .set_error_message("disk on fire");

        assert_eq!(
            check_and_set_dep_status(&mut deployment),
            DeploymentStatus::Error
        );
        assert_eq!(deployment.error_messages(), &["disk on fire"]);

        // Re-aggregating with the same error does not duplicate the message,
        // and a recovered resource does not clear the sticky status.
        check_and_set_dep_status(&mut deployment);
        assert_eq!(deployment.error_messages(), &["disk on fire"]);

        deployment
            .resource_mut(&ResourceId::Dynamic(0))
            .unwrap()
            .set_status(ResourceStatus::Active);
        assert_eq!(
            check_and_set_dep_status(&mut deployment),
            DeploymentStatus::Error
        );
    }

    #[test]
    fn static_resources_do_not_count() {
        let mut deployment = deployment_with_statuses(&[ResourceStatus::Active]);
        let user = Resource::builder()
            .id(ResourceId::Static("myUser".to_string()))
            .resource_type("user".to_string())
            .status(ResourceStatus::Planned)
            .build()
            .unwrap();
        let mut resources = deployment.resources().clone();
        resources.insert(user.id().clone(), user);
        let connections = deployment.connections().clone();
        deployment.commit_plan(resources, connections);
        deployment.set_status(DeploymentStatus::Build);

        assert_eq!(
            check_and_set_dep_status(&mut deployment),
            DeploymentStatus::Active
        );
    }

    #[test]
    fn mixed_terminal_states_leave_the_status_alone() {
        let mut deployment =
            deployment_with_statuses(&[ResourceStatus::Deleted, ResourceStatus::Active]);
        deployment.set_status(DeploymentStatus::Active);
        assert_eq!(
            check_and_set_dep_status(&mut deployment),
            DeploymentStatus::Active
        );
    }
}
