use super::{Plan, PlannerError, ResourceMaterializer, TaskGraph};
use crate::catalog::{Environment, RequestContext};
use crate::events::event::{OperationEvent, PlannerEvent};
use crate::events::EventChannel;
use crate::model::{Deployment, DeploymentStatus, Operation, OperationKind, Resource, ResourceId};
use crate::resolver::BlueprintResolver;
use crate::sync::Arc;
use std::collections::BTreeMap;
use tracing::*;

/// The public planning entry point: runs the resolver and the materializer
/// over a private [`Plan`] and commits the result to the deployment.
///
/// All-or-nothing: a failed pass returns the error and leaves the
/// deployment's resources and status exactly as they were, so planning can
/// be retried from a clean NEW state.
pub struct DefaultPlanner {
    config: crate::Config,
    environment: Arc<Environment>,
    resolver: BlueprintResolver,
    materializer: ResourceMaterializer,
    event_channel: Arc<EventChannel>,
}

impl DefaultPlanner {
    pub fn new(config: crate::Config, environment: Arc<Environment>) -> Self {
        let resolver = BlueprintResolver::new(config.clone(), environment.clone());
        let materializer = ResourceMaterializer::new(config.clone(), environment.clone());
        let event_channel = config.event_channel();
        Self {
            config,
            environment,
            resolver,
            materializer,
            event_channel,
        }
    }

    #[instrument(name = "DefaultPlanner::plan", skip(self, deployment, ctx))]
    pub async fn plan(
        &self,
        deployment: &mut Deployment,
        ctx: &RequestContext,
    ) -> Result<BTreeMap<ResourceId, Resource>, PlannerError> {
        if deployment.status() != DeploymentStatus::New {
            return Err(PlannerError::DeploymentNotNew {
                status: deployment.status(),
            });
        }
        if deployment.blueprint().is_none() {
            return Err(PlannerError::MissingBlueprint);
        }
        if self.environment.is_empty() {
            return Err(PlannerError::EmptyEnvironment);
        }

        self.event_channel.send(PlannerEvent::PlanningStarted {
            deployment: deployment.id().to_string(),
        });

        // Warm the catalog cache up front; lookups fan out once instead of
        // trickling through resolution.
        self.environment.prefetch_catalogs(ctx).await?;

        let mut plan = Plan::new();
        self.resolver.resolve(deployment, ctx, &mut plan).await?;
        self.materializer
            .add_resources(&mut plan, deployment, ctx)
            .await?;
        self.materializer.connect_resources(&mut plan)?;
        self.materializer
            .add_static_resources(&mut plan, deployment, ctx)
            .await?;

        for resource in plan.resources().values() {
            resource.validate()?;
        }

        let (resources, connections) = plan.into_parts();
        let resource_count = resources.len();
        deployment.commit_plan(resources, connections);
        deployment.open_operation(Operation::build_operation(resource_count));
        self.event_channel.send(OperationEvent::OperationOpened {
            deployment: deployment.id().to_string(),
            kind: OperationKind::Build,
        });

        self.event_channel.send(PlannerEvent::PlanningCompleted {
            deployment: deployment.id().to_string(),
            resource_count,
        });
        info!(
            "Planned deployment {} into {} resources",
            deployment.id(),
            resource_count
        );

        Ok(deployment.resources().clone())
    }

    /// The ordered provisioning work for a planned deployment, as handed to
    /// the external workflow engine.
    #[instrument(name = "DefaultPlanner::task_graph", skip(self, deployment))]
    pub fn task_graph(&self, deployment: &Deployment) -> Result<TaskGraph, PlannerError> {
        TaskGraph::for_deployment(deployment)
    }

    pub fn config(&self) -> &crate::Config {
        &self.config
    }
}
