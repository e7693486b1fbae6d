use super::{JsonMap, RelationKind, ResourceId, ResourceStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::*;

/// One concrete relation between two materialized resources. Exactly one of
/// `source`/`target` is set: a resource records its outbound relations with
/// `target` pointing at the peer, and its inbound ones with `source`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationInstance {
    pub interface: String,

    pub state: String,

    pub name: String,

    #[serde(rename = "relation")]
    pub kind: RelationKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ResourceId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<ResourceId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

/// A materialized unit of the plan: one instance created from a component,
/// or one static (provider-less) entry such as a user or a key-pair.
#[derive(Builder, Debug, Clone, Serialize, Deserialize)]
#[builder(build_fn(error = "ResourceError"))]
pub struct Resource {
    id: ResourceId,

    #[serde(rename = "type")]
    resource_type: String,

    #[builder(default)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    provider: Option<String>,

    #[builder(default)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    service: Option<String>,

    #[builder(default)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    component: Option<String>,

    #[builder(default)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dns_name: Option<String>,

    #[builder(default)]
    #[serde(default)]
    status: ResourceStatus,

    /// Provisioning data; populated by the workflow engine via postbacks.
    #[builder(default)]
    #[serde(default)]
    instance: JsonMap,

    #[builder(default)]
    #[serde(default)]
    relations: BTreeMap<String, RelationInstance>,

    #[builder(default)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    hosted_on: Option<ResourceId>,

    #[builder(default)]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    hosts: Vec<ResourceId>,

    #[builder(default)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
}

impl Resource {
    pub fn builder() -> ResourceBuilder {
        Default::default()
    }

    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    pub fn resource_type(&self) -> &str {
        self.resource_type.as_ref()
    }

    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    pub fn set_provider<S: Into<String>>(&mut self, provider: S) {
        self.provider = Some(provider.into());
    }

    pub fn service(&self) -> Option<&str> {
        self.service.as_deref()
    }

    pub fn set_service<S: Into<String>>(&mut self, service: S) {
        self.service = Some(service.into());
    }

    pub fn component(&self) -> Option<&str> {
        self.component.as_deref()
    }

    pub fn set_component<S: Into<String>>(&mut self, component: S) {
        self.component = Some(component.into());
    }

    pub fn dns_name(&self) -> Option<&str> {
        self.dns_name.as_deref()
    }

    pub fn status(&self) -> ResourceStatus {
        self.status
    }

    pub fn set_status(&mut self, status: ResourceStatus) {
        self.status = status;
    }

    pub fn instance(&self) -> &JsonMap {
        &self.instance
    }

    pub fn instance_mut(&mut self) -> &mut JsonMap {
        &mut self.instance
    }

    pub fn relations(&self) -> &BTreeMap<String, RelationInstance> {
        &self.relations
    }

    pub fn relation(&self, key: &str) -> Option<&RelationInstance> {
        self.relations.get(key)
    }

    /// Record a relation instance. An existing entry under the same key is
    /// left untouched.
    pub fn add_relation(&mut self, key: &str, relation: RelationInstance) -> bool {
        if self.relations.contains_key(key) {
            return false;
        }
        self.relations.insert(key.to_string(), relation);
        true
    }

    pub fn hosted_on(&self) -> Option<&ResourceId> {
        self.hosted_on.as_ref()
    }

    /// Assign the host of this resource. A resource only ever has one host;
    /// assigning a different one is an error, re-assigning the same one is a
    /// no-op.
    pub fn assign_host(&mut self, host: ResourceId) -> Result<(), ResourceError> {
        match &self.hosted_on {
            Some(existing) if *existing == host => Ok(()),
            Some(existing) => Err(ResourceError::ConflictingHostAssignment {
                resource: self.id.clone(),
                assigned: existing.clone(),
                requested: host,
            }),
            None => {
                self.hosted_on = Some(host);
                Ok(())
            }
        }
    }

    pub fn hosts(&self) -> &[ResourceId] {
        self.hosts.as_ref()
    }

    pub fn push_hosted(&mut self, hosted: ResourceId) {
        if !self.hosts.iter().any(|id| *id == hosted) {
            self.hosts.push(hosted);
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn set_error_message<S: Into<String>>(&mut self, message: S) {
        self.error_message = Some(message.into());
    }

    /// Schema check run on every materialized resource before it is allowed
    /// into a deployment.
    pub fn validate(&self) -> Result<(), ResourceError> {
        if self.resource_type.is_empty() {
            return Err(ResourceError::MissingField {
                resource: self.id.clone(),
                field: "type",
            });
        }
        if self.id.is_dynamic() && self.provider.is_none() {
            return Err(ResourceError::MissingField {
                resource: self.id.clone(),
                field: "provider",
            });
        }
        if self.hosted_on.as_ref() == Some(&self.id) {
            return Err(ResourceError::SelfHosted {
                resource: self.id.clone(),
            });
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum ResourceError {
    #[error("Resource {resource} is missing required field {field}")]
    MissingField {
        resource: ResourceId,
        field: &'static str,
    },

    #[error("Resource {resource} cannot host itself")]
    SelfHosted { resource: ResourceId },

    #[error("Resource {resource} is already hosted on {assigned} and cannot move to {requested}")]
    ConflictingHostAssignment {
        resource: ResourceId,
        assigned: ResourceId,
        requested: ResourceId,
    },

    #[error(transparent)]
    BuilderError(derive_builder::UninitializedFieldError),
}

impl From<derive_builder::UninitializedFieldError> for ResourceError {
    fn from(value: derive_builder::UninitializedFieldError) -> Self {
        ResourceError::BuilderError(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compute_resource(id: u64) -> Resource {
        Resource::builder()
            .id(ResourceId::Dynamic(id))
            .resource_type("compute".to_string())
            .provider(Some("test-cloud".to_string()))
            .build()
            .unwrap()
    }

    #[test]
    fn dynamic_resources_without_a_provider_fail_validation() {
        let resource = Resource::builder()
            .id(ResourceId::Dynamic(0))
            .resource_type("compute".to_string())
            .build()
            .unwrap();

        assert_matches!(
            resource.validate(),
            Err(ResourceError::MissingField { field: "provider", .. })
        );
    }

    #[test]
    fn static_resources_do_not_need_a_provider() {
        let resource = Resource::builder()
            .id(ResourceId::Static("myUser".to_string()))
            .resource_type("user".to_string())
            .build()
            .unwrap();

        assert_matches!(resource.validate(), Ok(()));
    }

    #[test]
    fn a_resource_keeps_its_first_host() {
        let mut resource = compute_resource(0);
        resource.assign_host(ResourceId::Dynamic(1)).unwrap();
        assert_matches!(resource.assign_host(ResourceId::Dynamic(1)), Ok(()));
        assert_matches!(
            resource.assign_host(ResourceId::Dynamic(2)),
            Err(ResourceError::ConflictingHostAssignment { assigned, requested, .. }) => {
                assert_eq!(assigned, ResourceId::Dynamic(1));
                assert_eq!(requested, ResourceId::Dynamic(2));
            }
        );
    }

    #[test]
    fn duplicate_relation_keys_keep_the_first_entry() {
        let mut resource = compute_resource(0);
        let relation = RelationInstance {
            interface: "mysql".to_string(),
            state: "planned".to_string(),
            name: "backend".to_string(),
            kind: RelationKind::Reference,
            source: None,
            target: Some(ResourceId::Dynamic(1)),
            requires_key: Some("database".to_string()),
            attribute: None,
        };

        assert!(resource.add_relation("backend-1", relation.clone()));
        let mut second = relation;
        second.target = Some(ResourceId::Dynamic(2));
        assert!(!resource.add_relation("backend-1", second));
        assert_eq!(
            resource.relation("backend-1").unwrap().target,
            Some(ResourceId::Dynamic(1))
        );
    }
}
