use super::PlannerError;
use crate::model::{Deployment, Direction, ResourceId};
use daggy::{Dag, NodeIndex};
use fxhash::FxHashMap;

/// One provisioning task the external workflow engine should run, with the
/// resources that must exist before it starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionTask {
    pub resource: ResourceId,
    pub depends_on: Vec<ResourceId>,
}

/// A dependency-ordered description of the provisioning work for a planned
/// deployment: hosts before the resources they host, connection targets
/// before the resources that point at them.
#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    tasks: Vec<ProvisionTask>,
}

impl TaskGraph {
    /// Derive the task graph from a planned deployment's resources. The
    /// resolver already refuses cyclic plans, so a cycle here means the
    /// resource map was corrupted after planning.
    pub fn for_deployment(deployment: &Deployment) -> Result<Self, PlannerError> {
        let mut dag: Dag<ResourceId, (), u32> = Dag::new();
        let mut nodes: FxHashMap<ResourceId, NodeIndex> = FxHashMap::default();

        for id in deployment.resources().keys() {
            let node = dag.add_node(id.clone());
            nodes.insert(id.clone(), node);
        }

        let mut dependencies: FxHashMap<ResourceId, Vec<ResourceId>> = FxHashMap::default();
        for (id, resource) in deployment.resources() {
            let mut deps = vec![];
            if let Some(host) = resource.hosted_on() {
                deps.push(host.clone());
            }
            for relation in resource.relations().values() {
                // Outbound references point at resources that must exist
                // first. Host relations are covered by hosted_on above.
                if relation.kind.is_host() {
                    continue;
                }
                if let Some(target) = &relation.target {
                    deps.push(target.clone());
                }
            }
            deps.sort();
            deps.dedup();

            for dep in &deps {
                let (Some(&from), Some(&to)) = (nodes.get(dep), nodes.get(id)) else {
                    continue;
                };
                dag.add_edge(from, to, ())
                    .map_err(|_| PlannerError::TaskGraphCycle {
                        resource: id.clone(),
                    })?;
            }
            dependencies.insert(id.clone(), deps);
        }

        let sorted = daggy::petgraph::algo::toposort(dag.graph(), None).map_err(|cycle| {
            PlannerError::TaskGraphCycle {
                resource: dag[cycle.node_id()].clone(),
            }
        })?;

        let tasks = sorted
            .into_iter()
            .map(|node| {
                let resource = dag[node].clone();
                let depends_on = dependencies.remove(&resource).unwrap_or_default();
                ProvisionTask {
                    resource,
                    depends_on,
                }
            })
            .collect();

        Ok(TaskGraph { tasks })
    }

    /// Tasks in an order that satisfies every dependency.
    pub fn tasks(&self) -> &[ProvisionTask] {
        self.tasks.as_ref()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Blueprint, EnvironmentDef, RelationInstance, RelationKind, Resource, ResourceStatus,
    };

    fn resource(id: u64) -> Resource {
        Resource::builder()
            .id(ResourceId::Dynamic(id))
            .resource_type("compute".to_string())
            .provider(Some("test-cloud".to_string()))
            .status(ResourceStatus::Planned)
            .build()
            .unwrap()
    }

    fn deployment_with(resources: Vec<Resource>) -> Deployment {
        let mut deployment = Deployment::new(Blueprint::default(), EnvironmentDef::default());
        let mut map = std::collections::BTreeMap::new();
        for resource in resources {
            map.insert(resource.id().clone(), resource);
        }
        deployment.commit_plan(map, Default::default());
        deployment
    }

    #[test]
    fn hosts_come_before_the_resources_they_host() {
        let mut hosted = resource(0);
        hosted.assign_host(ResourceId::Dynamic(1)).unwrap();
        let host = resource(1);

        let deployment = deployment_with(vec![hosted, host]);
        let graph = TaskGraph::for_deployment(&deployment).unwrap();

        let order: Vec<&ResourceId> = graph.tasks().iter().map(|t| &t.resource).collect();
        let host_pos = order
            .iter()
            .position(|id| **id == ResourceId::Dynamic(1))
            .unwrap();
        let hosted_pos = order
            .iter()
            .position(|id| **id == ResourceId::Dynamic(0))
            .unwrap();
        assert!(host_pos < hosted_pos);
        assert_eq!(
            graph.tasks()[hosted_pos].depends_on,
            vec![ResourceId::Dynamic(1)]
        );
    }

    #[test]
    fn connection_targets_come_before_their_sources() {
        let mut source = resource(0);
        source.add_relation(
            "backend-1",
            RelationInstance {
                interface: "mysql".to_string(),
                state: "planned".to_string(),
                name: "backend".to_string(),
                kind: RelationKind::Reference,
                source: None,
                target: Some(ResourceId::Dynamic(1)),
                requires_key: None,
                attribute: None,
            },
        );
        let target = resource(1);

        let deployment = deployment_with(vec![source, target]);
        let graph = TaskGraph::for_deployment(&deployment).unwrap();

        let order: Vec<&ResourceId> = graph.tasks().iter().map(|t| &t.resource).collect();
        assert_eq!(order, vec![&ResourceId::Dynamic(1), &ResourceId::Dynamic(0)]);
    }
}
