use super::{
    Blueprint, ConnectionDef, DeploymentStatus, JsonMap, Operation, Resource, ResourceId,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// User-supplied overrides, scoped the way the settings chain consumes them:
/// per-service, per-provider, per-static-resource, blueprint-wide, or global.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct Inputs {
    #[serde(default, skip_serializing_if = "JsonMap::is_empty")]
    blueprint: JsonMap,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    services: BTreeMap<String, JsonMap>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    providers: BTreeMap<String, JsonMap>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    resources: BTreeMap<String, JsonMap>,

    /// Unscoped inputs; anything not under one of the named scopes.
    #[serde(flatten)]
    global: JsonMap,
}

impl Inputs {
    pub fn global(&self, name: &str) -> Option<&serde_json::Value> {
        self.global.get(name)
    }

    pub fn set_global<S: Into<String>>(&mut self, name: S, value: serde_json::Value) {
        self.global.insert(name.into(), value);
    }

    pub fn blueprint(&self, name: &str) -> Option<&serde_json::Value> {
        self.blueprint.get(name)
    }

    pub fn set_blueprint<S: Into<String>>(&mut self, name: S, value: serde_json::Value) {
        self.blueprint.insert(name.into(), value);
    }

    /// `inputs/services/{service}/{resource_type}/{name}`
    pub fn service_setting(
        &self,
        service: &str,
        resource_type: &str,
        name: &str,
    ) -> Option<&serde_json::Value> {
        self.services
            .get(service)?
            .get(resource_type)?
            .as_object()?
            .get(name)
    }

    pub fn set_service_setting(
        &mut self,
        service: &str,
        resource_type: &str,
        name: &str,
        value: serde_json::Value,
    ) {
        let scope = self.services.entry(service.to_string()).or_default();
        let by_type = scope
            .entry(resource_type.to_string())
            .or_insert_with(|| serde_json::Value::Object(JsonMap::new()));
        if let Some(by_type) = by_type.as_object_mut() {
            by_type.insert(name.to_string(), value);
        }
    }

    /// `inputs/providers/{provider}/{resource_type}/{name}`
    pub fn provider_setting(
        &self,
        provider: &str,
        resource_type: &str,
        name: &str,
    ) -> Option<&serde_json::Value> {
        self.providers
            .get(provider)?
            .get(resource_type)?
            .as_object()?
            .get(name)
    }

    /// `inputs/resources/{key}/{field}` — overrides for static resources.
    pub fn resource_setting(&self, key: &str, field: &str) -> Option<&serde_json::Value> {
        self.resources.get(key)?.get(field)
    }

    pub fn set_resource_setting(&mut self, key: &str, field: &str, value: serde_json::Value) {
        self.resources
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value);
    }
}

/// One provider entry in a deployment's environment section. The runtime
/// provider implementation is looked up by key; this record carries the
/// declarative side (vendor and constraint entries) the settings chain reads.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct ProviderDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,

    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub constraints: serde_json::Value,

    #[serde(flatten)]
    pub extra: JsonMap,
}

#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub providers: BTreeMap<String, ProviderDef>,
}

impl EnvironmentDef {
    pub fn provider(&self, key: &str) -> Option<&ProviderDef> {
        self.providers.get(key)
    }
}

/// The top-level aggregate: a blueprint, the environment it deploys into,
/// the inputs supplied for this deployment, and the materialized resources
/// with their lifecycle state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deployment {
    id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,

    #[serde(default)]
    status: DeploymentStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    blueprint: Option<Blueprint>,

    #[serde(default)]
    environment: EnvironmentDef,

    #[serde(default)]
    inputs: Inputs,

    #[serde(default)]
    resources: BTreeMap<ResourceId, Resource>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    connections: BTreeMap<String, ConnectionDef>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    operation: Option<Operation>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    operations_history: Vec<Operation>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    error_messages: Vec<String>,

    #[serde(flatten)]
    extra: JsonMap,
}

impl Deployment {
    pub fn new(blueprint: Blueprint, environment: EnvironmentDef) -> Self {
        Deployment {
            id: uuid::Uuid::new_v4().to_string(),
            name: None,
            status: DeploymentStatus::New,
            blueprint: Some(blueprint),
            environment,
            inputs: Inputs::default(),
            resources: BTreeMap::new(),
            connections: BTreeMap::new(),
            operation: None,
            operations_history: vec![],
            error_messages: vec![],
            extra: JsonMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        self.id.as_ref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn status(&self) -> DeploymentStatus {
        self.status
    }

    pub fn set_status(&mut self, status: DeploymentStatus) {
        self.status = status;
    }

    pub fn blueprint(&self) -> Option<&Blueprint> {
        self.blueprint.as_ref()
    }

    pub fn environment(&self) -> &EnvironmentDef {
        &self.environment
    }

    pub fn inputs(&self) -> &Inputs {
        &self.inputs
    }

    pub fn inputs_mut(&mut self) -> &mut Inputs {
        &mut self.inputs
    }

    pub fn resources(&self) -> &BTreeMap<ResourceId, Resource> {
        &self.resources
    }

    pub fn resource(&self, id: &ResourceId) -> Option<&Resource> {
        self.resources.get(id)
    }

    pub fn resource_mut(&mut self, id: &ResourceId) -> Option<&mut Resource> {
        self.resources.get_mut(id)
    }

    /// The dynamically-created (numeric-indexed) resources; status
    /// aggregation only looks at these.
    pub fn dynamic_resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources
            .values()
            .filter(|resource| resource.id().is_dynamic())
    }

    pub fn connections(&self) -> &BTreeMap<String, ConnectionDef> {
        &self.connections
    }

    pub fn connection_mut(&mut self, key: &str) -> Option<&mut ConnectionDef> {
        self.connections.get_mut(key)
    }

    /// Replace this deployment's resource and connection maps with a freshly
    /// planned set. Only the planner calls this, and only on success.
    pub fn commit_plan(
        &mut self,
        resources: BTreeMap<ResourceId, Resource>,
        connections: BTreeMap<String, ConnectionDef>,
    ) {
        self.resources = resources;
        self.connections = connections;
        self.status = DeploymentStatus::Planned;
    }

    pub fn operation(&self) -> Option<&Operation> {
        self.operation.as_ref()
    }

    pub fn operation_mut(&mut self) -> Option<&mut Operation> {
        self.operation.as_mut()
    }

    pub fn operations_history(&self) -> &[Operation] {
        self.operations_history.as_ref()
    }

    /// Open a new operation, rotating any current one into the history.
    pub fn open_operation(&mut self, operation: Operation) {
        if let Some(previous) = self.operation.take() {
            self.operations_history.push(previous);
        }
        self.operation = Some(operation);
    }

    pub fn error_messages(&self) -> &[String] {
        self.error_messages.as_ref()
    }

    /// Record a provisioning error message, deduplicated.
    pub fn push_error_message<S: Into<String>>(&mut self, message: S) {
        let message = message.into();
        if !self.error_messages.iter().any(|m| *m == message) {
            self.error_messages.push(message);
        }
    }

    /// Slash-delimited path lookup into a materialized resource:
    /// `{resource-id}/{field}/...`.
    pub fn resource_path(&self, path: &str) -> Option<serde_json::Value> {
        let mut segments = path.split('/');
        let id: ResourceId = segments.next()?.into();
        let resource = self.resources.get(&id)?;
        let mut value = serde_json::to_value(resource).ok()?;
        for segment in segments {
            value = value.as_object()?.get(segment)?.clone();
        }
        Some(value)
    }

    /// Slash-delimited path lookup into the deployment's unmodeled top-level
    /// data.
    pub fn extra_path(&self, path: &str) -> Option<serde_json::Value> {
        let mut segments = path.split('/');
        let mut value = self.extra.get(segments.next()?)?.clone();
        for segment in segments {
            value = value.as_object()?.get(segment)?.clone();
        }
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inputs_keep_their_scopes_apart() {
        let mut inputs = Inputs::default();
        inputs.set_global("domain", "a.com".into());
        inputs.set_blueprint("domain", "b.com".into());
        inputs.set_service_setting("web", "compute", "count", 3.into());

        assert_eq!(*inputs.global("domain").unwrap(), "a.com");
        assert_eq!(*inputs.blueprint("domain").unwrap(), "b.com");
        assert_eq!(inputs.service_setting("web", "compute", "count").unwrap(), 3);
        assert_eq!(inputs.service_setting("web", "database", "count"), None);
    }

    #[test]
    fn opening_an_operation_rotates_the_previous_one() {
        let mut deployment = Deployment::new(Blueprint::default(), EnvironmentDef::default());
        assert!(deployment.operation().is_none());

        deployment.open_operation(Operation::build_operation(4));
        deployment.open_operation(Operation::build_operation(2));

        assert_eq!(deployment.operation().unwrap().tasks(), 2);
        assert_eq!(deployment.operations_history().len(), 1);
        assert_eq!(deployment.operations_history()[0].tasks(), 4);
    }

    #[test]
    fn error_messages_are_deduplicated() {
        let mut deployment = Deployment::new(Blueprint::default(), EnvironmentDef::default());
        deployment.push_error_message("boom");
        deployment.push_error_message("boom");
        deployment.push_error_message("crash");
        assert_eq!(deployment.error_messages(), &["boom", "crash"]);
    }
}
