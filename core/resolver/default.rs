use super::ResolverError;
use crate::catalog::{Environment, RequestContext};
use crate::events::event::ResolverEvent;
use crate::events::EventChannel;
use crate::model::{
    Blueprint, Component, ComponentSelector, Deployment, RelationKind, Satisfaction,
};
use crate::planner::{ComponentRef, ComponentSlot, Plan};
use crate::sync::Arc;
use fxhash::FxHashSet;
use std::collections::VecDeque;
use tracing::*;

/// Resolves a blueprint's abstract service graph into concrete components
/// and connections on a [`Plan`].
///
/// Resolution runs in three passes over the plan, each only ever appending
/// information: bind every service to a component, wire every declared
/// relation, then auto-resolve whatever requirements are still open (a
/// work-list that follows requirements of auto-resolved components until
/// none remain).
pub struct BlueprintResolver {
    config: crate::Config,
    environment: Arc<Environment>,
    event_channel: Arc<EventChannel>,
}

impl BlueprintResolver {
    pub fn new(config: crate::Config, environment: Arc<Environment>) -> Self {
        let event_channel = config.event_channel();
        Self {
            config,
            environment,
            event_channel,
        }
    }

    #[instrument(name = "BlueprintResolver::resolve", skip(self, deployment, ctx, plan))]
    pub async fn resolve(
        &self,
        deployment: &Deployment,
        ctx: &RequestContext,
        plan: &mut Plan,
    ) -> Result<(), ResolverError> {
        let blueprint = deployment
            .blueprint()
            .ok_or(ResolverError::MissingBlueprint)?;

        self.resolve_components(blueprint, ctx, plan).await?;
        self.resolve_relations(blueprint, plan)?;
        self.resolve_remaining_requirements(ctx, plan).await?;
        Ok(())
    }

    /// Bind every service to the component its selector matches in the
    /// environment's catalogs.
    #[instrument(name = "BlueprintResolver::resolve_components", skip(self, blueprint, ctx, plan))]
    async fn resolve_components(
        &self,
        blueprint: &Blueprint,
        ctx: &RequestContext,
        plan: &mut Plan,
    ) -> Result<(), ResolverError> {
        for (service_name, service_def) in &blueprint.services {
            let component = self
                .lookup_component(ctx, service_name, &service_def.component)
                .await?;

            self.event_channel.send(ResolverEvent::ComponentResolved {
                service: service_name.clone(),
                component: component.id().to_string(),
                provider: component.provider_key().to_string(),
            });
            plan.add_service(service_name.clone(), component);
        }
        Ok(())
    }

    /// Wire every relation the blueprint declares between two services.
    #[instrument(name = "BlueprintResolver::resolve_relations", skip(self, blueprint, plan))]
    fn resolve_relations(&self, blueprint: &Blueprint, plan: &mut Plan) -> Result<(), ResolverError> {
        for (service_name, service_def) in &blueprint.services {
            for (relation_name, relation) in service_def.relations(service_name)? {
                let source_ref = ComponentRef::main(service_name.clone());

                if relation.is_host_shorthand() {
                    // No target service; make sure the component carries the
                    // host requirement so auto-resolution picks it up.
                    let component = plan
                        .component_mut(&source_ref)
                        .expect("service was resolved in the previous pass");
                    if component
                        .requirement_keys_for_interface(&relation.interface)
                        .is_empty()
                    {
                        component.ensure_requirement(
                            "host",
                            &relation.interface,
                            RelationKind::Host,
                        );
                    }
                    continue;
                }

                let target_service = relation.service.clone().unwrap();
                if plan.service(&target_service).is_none() {
                    return Err(ResolverError::UnknownServiceTarget {
                        service: service_name.clone(),
                        relation: relation_name.clone(),
                        target: target_service,
                    });
                }

                let source_component = plan.component(&source_ref).unwrap();
                let source_component_id = source_component.id().to_string();
                let requirement_keys =
                    source_component.requirement_keys_for_interface(&relation.interface);
                let Some(requirement_key) = requirement_keys.first().map(|k| k.to_string())
                else {
                    return Err(ResolverError::UnmetRequirement {
                        service: service_name.clone(),
                        component: source_component_id,
                        interface: relation.interface.clone(),
                    });
                };
                let already_satisfied = source_component
                    .requirement(&requirement_key)
                    .map(|r| r.is_satisfied())
                    .unwrap_or(false);
                if already_satisfied {
                    // Tolerated for older blueprints that declare overlapping
                    // relations; the requirement is reused, never re-resolved.
                    warn!(
                        "Relation {} on service {} reuses the already-satisfied requirement {}",
                        relation_name, service_name, requirement_key
                    );
                }

                let target_ref = ComponentRef::main(target_service.clone());
                let target_component = plan.component(&target_ref).unwrap();
                let provides = target_component.provides_matching(&relation.interface);
                if provides.is_empty() {
                    return Err(ResolverError::UnmetRequirement {
                        service: target_service.clone(),
                        component: target_component.id().to_string(),
                        interface: relation.interface.clone(),
                    });
                }
                if provides.len() > 1 && !relation.kind.is_host() {
                    return Err(ResolverError::AmbiguousInterface {
                        service: target_service.clone(),
                        interface: relation.interface.clone(),
                        count: provides.len(),
                    });
                }
                let provides_key = provides[0].key.clone();
                let target_component_id = target_component.id().to_string();

                if !already_satisfied {
                    plan.component_mut(&source_ref).unwrap().satisfy(
                        &requirement_key,
                        Satisfaction {
                            service: target_service.clone(),
                            component_id: target_component_id.clone(),
                            provides_key: provides_key.clone(),
                            name: relation_name.clone(),
                            relation_key: Some(relation_name.clone()),
                        },
                    )?;
                    if relation.kind.is_host() {
                        plan.component_mut(&source_ref)
                            .unwrap()
                            .mark_host_key(&requirement_key);
                    }
                }

                plan.connect(
                    &source_ref,
                    &target_ref,
                    &relation.interface,
                    &relation_name,
                    relation.kind,
                    Some(&requirement_key),
                    &provides_key,
                    Some(&relation_name),
                    relation.attribute.as_deref(),
                );
                plan.register_connection(&relation_name, &relation.interface);

                self.event_channel.send(ResolverEvent::RelationResolved {
                    service: service_name.clone(),
                    relation: relation_name.clone(),
                    target: target_service.clone(),
                });
            }
        }
        Ok(())
    }

    /// Auto-resolve every requirement still unsatisfied after relation
    /// wiring, following requirements of freshly resolved components until
    /// the plan reaches a fixpoint.
    ///
    /// A visited set of `(service, component-id)` signatures catches
    /// dependency cycles; seeing a signature twice means the catalog routes a
    /// requirement back into a component that is already part of this
    /// service, and resolution would never terminate.
    #[instrument(
        name = "BlueprintResolver::resolve_remaining_requirements",
        skip(self, ctx, plan)
    )]
    async fn resolve_remaining_requirements(
        &self,
        ctx: &RequestContext,
        plan: &mut Plan,
    ) -> Result<(), ResolverError> {
        let mut history: FxHashSet<(String, String)> = plan
            .services()
            .iter()
            .map(|(name, planned)| (name.clone(), planned.component().id().to_string()))
            .collect();

        let mut queue: VecDeque<(String, ComponentSlot, String)> = VecDeque::new();
        for (service_name, planned) in plan.services() {
            for requirement_key in planned.component().unsatisfied_requirement_keys() {
                queue.push_back((service_name.clone(), ComponentSlot::Main, requirement_key));
            }
        }

        let mut steps = 0;
        while let Some((service_name, slot, requirement_key)) = queue.pop_front() {
            steps += 1;
            if steps > self.config.max_resolution_depth() {
                return Err(ResolverError::MaxDepthExceeded {
                    limit: self.config.max_resolution_depth(),
                });
            }

            let owner_ref = ComponentRef {
                service: service_name.clone(),
                slot: slot.clone(),
            };
            let Some(owner) = plan.component(&owner_ref) else {
                continue;
            };
            let Some(requirement) = owner.requirement(&requirement_key) else {
                continue;
            };
            if requirement.is_satisfied() {
                continue;
            }
            let interface = requirement.interface.clone();
            let kind = requirement.kind;

            // The relation kind never reaches the catalog; lookups go by
            // interface alone.
            let selector = ComponentSelector::by_interface(interface.clone());
            let component = self
                .lookup_component(ctx, &service_name, &selector)
                .await?;

            let signature = (service_name.clone(), component.id().to_string());
            if history.contains(&signature) {
                return Err(ResolverError::DependencyLoopDetected {
                    service: service_name,
                    component: component.id().to_string(),
                });
            }
            history.insert(signature);

            let provides_key = component
                .first_provides(&interface)
                .map(|p| p.key.clone())
                .ok_or_else(|| ResolverError::UnmetRequirement {
                    service: service_name.clone(),
                    component: component.id().to_string(),
                    interface: interface.clone(),
                })?;
            let component_id = component.id().to_string();

            let extra_key = match &slot {
                ComponentSlot::Main => requirement_key.clone(),
                ComponentSlot::Extra(parent) => format!("{}/{}", parent, requirement_key),
            };

            plan.add_extra_component(&service_name, &extra_key, component);

            plan.component_mut(&owner_ref).unwrap().satisfy(
                &requirement_key,
                Satisfaction {
                    service: service_name.clone(),
                    component_id: component_id.clone(),
                    provides_key: provides_key.clone(),
                    name: extra_key.clone(),
                    relation_key: None,
                },
            )?;
            if kind.is_host() {
                plan.component_mut(&owner_ref)
                    .unwrap()
                    .mark_host_key(&requirement_key);
            }

            let extra_ref = ComponentRef::extra(service_name.clone(), extra_key.clone());
            plan.connect(
                &owner_ref,
                &extra_ref,
                &interface,
                &extra_key,
                kind,
                Some(&requirement_key),
                &provides_key,
                None,
                None,
            );
            plan.register_connection(&extra_key, &interface);

            self.event_channel
                .send(ResolverEvent::RequirementAutoResolved {
                    service: service_name.clone(),
                    requirement: requirement_key.clone(),
                    component: component_id,
                });

            for new_key in plan
                .component(&extra_ref)
                .unwrap()
                .unsatisfied_requirement_keys()
            {
                queue.push_back((
                    service_name.clone(),
                    ComponentSlot::Extra(extra_key.clone()),
                    new_key,
                ));
            }
        }
        Ok(())
    }

    /// One catalog lookup with the ambiguity policy applied: zero matches is
    /// fatal, several matches either warn-and-pick-first or (in strict mode)
    /// abort.
    async fn lookup_component(
        &self,
        ctx: &RequestContext,
        service_name: &str,
        selector: &ComponentSelector,
    ) -> Result<Component, ResolverError> {
        let mut matches = self.environment.find_components(ctx, selector).await?;
        if matches.is_empty() {
            return Err(ResolverError::ComponentNotFound {
                service: service_name.to_string(),
                selector: selector.clone(),
            });
        }
        if matches.len() > 1 {
            if self.config.strict_ambiguous_matches() {
                return Err(ResolverError::AmbiguousComponent {
                    service: service_name.to_string(),
                    selector: selector.clone(),
                    count: matches.len(),
                });
            }
            warn!(
                "{} components match {} for service {}; picking {}",
                matches.len(),
                selector,
                service_name,
                matches[0].1.id()
            );
            self.event_channel
                .send(ResolverEvent::AmbiguousComponentMatch {
                    service: service_name.to_string(),
                    component: matches[0].1.id().to_string(),
                    match_count: matches.len(),
                });
        }
        let (_, component) = matches.remove(0);
        Ok(component)
    }
}
