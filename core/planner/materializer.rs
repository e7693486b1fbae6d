use super::{ComponentRef, ComponentSlot, Plan, PlannerError};
use crate::catalog::{Environment, RequestContext};
use crate::events::event::PlannerEvent;
use crate::events::EventChannel;
use crate::keys;
use crate::model::{
    Deployment, Direction, JsonMap, RelationInstance, Resource, ResourceId, ResourceStatus,
    StaticResourceDef,
};
use crate::settings::SettingsChain;
use crate::sync::Arc;
use tracing::*;

/// Walks a resolved plan and emits concrete resources: one per service
/// instance (plus extra-component instances), hosting links, the N×M
/// relation fan-out, and the blueprint's static resources.
pub struct ResourceMaterializer {
    environment: Arc<Environment>,
    event_channel: Arc<EventChannel>,
}

impl ResourceMaterializer {
    pub fn new(config: crate::Config, environment: Arc<Environment>) -> Self {
        let event_channel = config.event_channel();
        Self {
            environment,
            event_channel,
        }
    }

    /// Create one resource per required instance of every component in the
    /// plan, then wire hosting pairs.
    #[instrument(name = "ResourceMaterializer::add_resources", skip_all)]
    pub async fn add_resources(
        &self,
        plan: &mut Plan,
        deployment: &Deployment,
        ctx: &RequestContext,
    ) -> Result<(), PlannerError> {
        let service_names: Vec<String> = plan.services().keys().cloned().collect();

        for service_name in &service_names {
            let count = self.instance_count(deployment, plan, service_name)?;

            let mut refs = vec![ComponentRef::main(service_name.clone())];
            for key in plan
                .service(service_name)
                .unwrap()
                .extra_components()
                .keys()
            {
                refs.push(ComponentRef::extra(service_name.clone(), key.clone()));
            }

            for component_ref in refs {
                self.materialize_component(plan, deployment, ctx, &component_ref, count)
                    .await?;
            }
        }

        self.connect_hosts(plan)?;
        Ok(())
    }

    /// Effective instance count for a service: the `count` setting, default
    /// one. Anything that is not a positive integer is a validation error.
    fn instance_count(
        &self,
        deployment: &Deployment,
        plan: &Plan,
        service_name: &str,
    ) -> Result<usize, PlannerError> {
        let component = plan.service(service_name).unwrap().component();
        let chain = SettingsChain::new(deployment);
        let value = chain.get_setting(
            "count",
            component.resource_type(),
            Some(service_name),
            Some(component.provider_key()),
            Some(1.into()),
        )?;

        let value = value.unwrap_or_else(|| 1.into());
        match value.as_u64() {
            Some(count) if count >= 1 => Ok(count as usize),
            _ => Err(PlannerError::InvalidCount {
                service: service_name.to_string(),
                value,
            }),
        }
    }

    async fn materialize_component(
        &self,
        plan: &mut Plan,
        deployment: &Deployment,
        ctx: &RequestContext,
        component_ref: &ComponentRef,
        count: usize,
    ) -> Result<(), PlannerError> {
        let component = plan.component(component_ref).unwrap();
        let component_id = component.id().to_string();
        let provider_key = component.provider_key().to_string();
        let resource_type = component
            .resource_type()
            .unwrap_or("application")
            .to_string();
        let service_name = component_ref.service.clone();

        let provider = self.environment.get_provider(&provider_key).ok_or(
            crate::catalog::CatalogError::ProviderNotFound {
                key: provider_key.clone(),
            },
        )?;

        for index in 0..count {
            let name = match &component_ref.slot {
                ComponentSlot::Main => format!("{}{}", service_name, index + 1),
                ComponentSlot::Extra(key) => {
                    format!("{}-{}{}", service_name, key.replace('/', "-"), index + 1)
                }
            };
            let template = provider
                .generate_template(deployment, &resource_type, &service_name, ctx, &name)
                .await?;

            let id = plan.next_resource_id();
            let resource = Resource::builder()
                .id(id.clone())
                .resource_type(template.resource_type)
                .provider(Some(template.provider))
                .service(Some(service_name.clone()))
                .component(Some(component_id.clone()))
                .dns_name(template.dns_name)
                .status(ResourceStatus::Planned)
                .instance(template.instance)
                .build()?;

            plan.insert_resource(resource);
            plan.component_mut(component_ref)
                .unwrap()
                .push_instance(id.clone());

            self.event_channel.send(PlannerEvent::ResourceMaterialized {
                resource: id.to_string(),
                service: service_name.clone(),
            });
        }
        Ok(())
    }

    /// Pair every component's instances with its host component's instances,
    /// one to one: instance `i` runs on host instance `i`.
    fn connect_hosts(&self, plan: &mut Plan) -> Result<(), PlannerError> {
        for component_ref in plan.component_refs() {
            let component = plan.component(&component_ref).unwrap();
            let host_connections: Vec<(String, crate::model::ConnectionInfo)> = component
                .connections()
                .iter()
                .filter(|(_, conn)| conn.kind.is_host() && conn.direction == Direction::Outbound)
                .map(|(key, conn)| (key.clone(), conn.clone()))
                .collect();
            let instances: Vec<ResourceId> = component.instances().to_vec();

            for (connection_key, connection) in host_connections {
                let host_ref = ComponentRef {
                    service: connection.service.clone(),
                    slot: connection
                        .extra_key
                        .clone()
                        .map(ComponentSlot::Extra)
                        .unwrap_or(ComponentSlot::Main),
                };
                let host_instances: Vec<ResourceId> = plan
                    .component(&host_ref)
                    .map(|host| host.instances().to_vec())
                    .unwrap_or_default();

                for (hosted_id, host_id) in instances.iter().zip(host_instances.iter()) {
                    let hosted = plan.resource_mut(hosted_id).unwrap();
                    hosted.assign_host(host_id.clone())?;
                    hosted.add_relation(
                        "host",
                        RelationInstance {
                            interface: connection.interface.clone(),
                            state: "planned".to_string(),
                            name: connection_key.clone(),
                            kind: connection.kind,
                            source: None,
                            target: Some(host_id.clone()),
                            requires_key: connection.requires_key.clone(),
                            attribute: None,
                        },
                    );

                    let host = plan.resource_mut(host_id).unwrap();
                    host.push_hosted(hosted_id.clone());
                }
            }
        }
        Ok(())
    }

    /// Fan every non-host connection out across both components' instances:
    /// one relation-instance write per (instance, peer-instance) pair, keyed
    /// `{connection_key}-{peer index}`.
    #[instrument(name = "ResourceMaterializer::connect_resources", skip_all)]
    pub fn connect_resources(&self, plan: &mut Plan) -> Result<(), PlannerError> {
        for component_ref in plan.component_refs() {
            let component = plan.component(&component_ref).unwrap();
            let connections: Vec<(String, crate::model::ConnectionInfo)> = component
                .connections()
                .iter()
                .filter(|(_, conn)| !conn.kind.is_host())
                .map(|(key, conn)| (key.clone(), conn.clone()))
                .collect();
            let instances: Vec<ResourceId> = component.instances().to_vec();

            for (connection_key, connection) in connections {
                let peer_ref = ComponentRef {
                    service: connection.service.clone(),
                    slot: connection
                        .extra_key
                        .clone()
                        .map(ComponentSlot::Extra)
                        .unwrap_or(ComponentSlot::Main),
                };
                let peer_instances: Vec<ResourceId> = plan
                    .component(&peer_ref)
                    .map(|peer| peer.instances().to_vec())
                    .unwrap_or_default();

                for own_id in &instances {
                    for peer_id in &peer_instances {
                        let write_key = format!("{}-{}", connection_key, peer_id);
                        let (source, target) = match connection.direction {
                            Direction::Outbound => (None, Some(peer_id.clone())),
                            Direction::Inbound => (Some(peer_id.clone()), None),
                        };
                        let relation = RelationInstance {
                            interface: connection.interface.clone(),
                            state: "planned".to_string(),
                            name: connection_key.clone(),
                            kind: connection.kind,
                            source,
                            target,
                            requires_key: connection.requires_key.clone(),
                            attribute: connection.attribute.clone(),
                        };
                        plan.resource_mut(own_id).unwrap().add_relation(&write_key, relation);
                    }
                }
            }
        }
        Ok(())
    }

    /// Materialize the blueprint's static (provider-less) resources:
    /// provider-backed when the environment can supply them, otherwise the
    /// built-in `user` and `key-pair` kinds.
    #[instrument(name = "ResourceMaterializer::add_static_resources", skip_all)]
    pub async fn add_static_resources(
        &self,
        plan: &mut Plan,
        deployment: &Deployment,
        ctx: &RequestContext,
    ) -> Result<(), PlannerError> {
        let Some(blueprint) = deployment.blueprint() else {
            return Ok(());
        };

        for (key, def) in &blueprint.resources {
            let id = ResourceId::Static(key.clone());

            let resource = match self.environment.find_component(ctx, &def.selector()).await? {
                Some((provider_key, component)) => {
                    let provider = self.environment.get_provider(&provider_key).unwrap();
                    let template = provider
                        .generate_template(deployment, &def.resource_type, key, ctx, key)
                        .await?;
                    Resource::builder()
                        .id(id.clone())
                        .resource_type(template.resource_type)
                        .provider(Some(template.provider))
                        .component(Some(component.id().to_string()))
                        .dns_name(template.dns_name)
                        .status(ResourceStatus::Planned)
                        .instance(template.instance)
                        .build()?
                }
                None => match def.resource_type.as_str() {
                    "user" => self.materialize_user(deployment, key, def)?,
                    "key-pair" | "key_pair" => self.materialize_key_pair(deployment, key, def)?,
                    other => {
                        return Err(PlannerError::UnknownStaticResource {
                            key: key.clone(),
                            resource_type: other.to_string(),
                        })
                    }
                },
            };

            resource.validate()?;
            plan.insert_resource(resource);
            self.event_channel
                .send(PlannerEvent::StaticResourceMaterialized {
                    resource: key.clone(),
                });
        }
        Ok(())
    }

    /// Look one static-resource field up: deployment input override first,
    /// then the blueprint declaration.
    fn static_field(
        deployment: &Deployment,
        def: &StaticResourceDef,
        key: &str,
        field: &str,
    ) -> Option<String> {
        deployment
            .inputs()
            .resource_setting(key, field)
            .or_else(|| def.field(field))
            .and_then(|v| v.as_str())
            .map(String::from)
    }

    fn materialize_user(
        &self,
        deployment: &Deployment,
        key: &str,
        def: &StaticResourceDef,
    ) -> Result<Resource, PlannerError> {
        let id = ResourceId::Static(key.to_string());
        let existing = deployment
            .resource(&id)
            .map(|r| r.instance().clone())
            .unwrap_or_default();

        let name = Self::static_field(deployment, def, key, "name")
            .or_else(|| existing.get("name").and_then(|v| v.as_str()).map(String::from))
            .unwrap_or_else(|| "admin".to_string());

        // Re-planning keeps an already-issued password stable.
        let password = existing
            .get("password")
            .and_then(|v| v.as_str())
            .map(String::from)
            .or_else(|| Self::static_field(deployment, def, key, "password"))
            .unwrap_or_else(|| keys::generate_password(12));

        let hash = existing
            .get("hash")
            .and_then(|v| v.as_str())
            .map(String::from)
            .unwrap_or_else(|| keys::hash_password(&password, None));

        let mut instance = JsonMap::new();
        instance.insert("name".into(), name.into());
        // The plaintext rides along with the hash so later tasks can inject
        // it into provisioned hosts. Flagged as a known weakness.
        instance.insert("password".into(), password.into());
        instance.insert("hash".into(), hash.into());

        Ok(Resource::builder()
            .id(id)
            .resource_type("user".to_string())
            .status(ResourceStatus::Planned)
            .instance(instance)
            .build()?)
    }

    fn materialize_key_pair(
        &self,
        deployment: &Deployment,
        key: &str,
        def: &StaticResourceDef,
    ) -> Result<Resource, PlannerError> {
        let id = ResourceId::Static(key.to_string());
        let existing = deployment
            .resource(&id)
            .map(|r| r.instance().clone())
            .unwrap_or_default();

        // An existing private key is never regenerated; the public forms are
        // always derivable from it.
        let private_pem = existing
            .get("private_key")
            .and_then(|v| v.as_str())
            .map(String::from)
            .or_else(|| Self::static_field(deployment, def, key, "private_key"));

        let pair = match private_pem {
            Some(pem) => keys::KeyPair::from_private_pem(&pem)?,
            None => keys::KeyPair::generate(keys::DEFAULT_KEY_BITS)?,
        };

        let mut instance = JsonMap::new();
        instance.insert("private_key".into(), pair.private_pem().into());
        instance.insert("public_key".into(), pair.public_pem().into());
        instance.insert("public_key_ssh".into(), pair.public_ssh().into());

        Ok(Resource::builder()
            .id(id)
            .resource_type("key-pair".to_string())
            .status(ResourceStatus::Planned)
            .instance(instance)
            .build()?)
    }
}
