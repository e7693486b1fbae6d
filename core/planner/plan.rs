use crate::model::{
    Component, ConnectionDef, ConnectionInfo, Direction, RelationKind, Resource, ResourceId,
};
use std::collections::BTreeMap;

/// Address of a component within a plan: a service's main component, or one
/// of the extra components auto-resolution attached to it.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct ComponentRef {
    pub service: String,
    pub slot: ComponentSlot,
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum ComponentSlot {
    Main,
    Extra(String),
}

impl ComponentRef {
    pub fn main<S: Into<String>>(service: S) -> Self {
        ComponentRef {
            service: service.into(),
            slot: ComponentSlot::Main,
        }
    }

    pub fn extra<S: Into<String>, K: Into<String>>(service: S, key: K) -> Self {
        ComponentRef {
            service: service.into(),
            slot: ComponentSlot::Extra(key.into()),
        }
    }
}

/// One service slot in a plan: its resolved main component plus any extra
/// components pulled in to satisfy requirements.
#[derive(Debug, Clone)]
pub struct PlannedService {
    component: Component,
    extra_components: BTreeMap<String, Component>,
}

impl PlannedService {
    pub fn new(component: Component) -> Self {
        PlannedService {
            component,
            extra_components: BTreeMap::new(),
        }
    }

    pub fn component(&self) -> &Component {
        &self.component
    }

    pub fn component_mut(&mut self) -> &mut Component {
        &mut self.component
    }

    pub fn extra_components(&self) -> &BTreeMap<String, Component> {
        &self.extra_components
    }

    pub fn extra(&self, key: &str) -> Option<&Component> {
        self.extra_components.get(key)
    }
}

/// The working state of one planning pass. Built from scratch on every pass,
/// owned by it alone, and discarded once its resources are committed to the
/// deployment; a failed pass leaves no trace.
#[derive(Default, Debug, Clone)]
pub struct Plan {
    services: BTreeMap<String, PlannedService>,
    resources: BTreeMap<ResourceId, Resource>,
    connections: BTreeMap<String, ConnectionDef>,
    next_index: u64,
}

impl Plan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_service<S: Into<String>>(&mut self, name: S, component: Component) {
        self.services
            .insert(name.into(), PlannedService::new(component));
    }

    pub fn services(&self) -> &BTreeMap<String, PlannedService> {
        &self.services
    }

    pub fn service(&self, name: &str) -> Option<&PlannedService> {
        self.services.get(name)
    }

    pub fn service_mut(&mut self, name: &str) -> Option<&mut PlannedService> {
        self.services.get_mut(name)
    }

    pub fn add_extra_component(&mut self, service: &str, key: &str, component: Component) {
        if let Some(planned) = self.services.get_mut(service) {
            planned
                .extra_components
                .insert(key.to_string(), component);
        }
    }

    pub fn component(&self, at: &ComponentRef) -> Option<&Component> {
        let planned = self.services.get(&at.service)?;
        match &at.slot {
            ComponentSlot::Main => Some(&planned.component),
            ComponentSlot::Extra(key) => planned.extra_components.get(key),
        }
    }

    pub fn component_mut(&mut self, at: &ComponentRef) -> Option<&mut Component> {
        let planned = self.services.get_mut(&at.service)?;
        match &at.slot {
            ComponentSlot::Main => Some(&mut planned.component),
            ComponentSlot::Extra(key) => planned.extra_components.get_mut(key),
        }
    }

    /// Every component in the plan, services in name order, each service's
    /// main component before its extras.
    pub fn component_refs(&self) -> Vec<ComponentRef> {
        let mut refs = vec![];
        for (service, planned) in &self.services {
            refs.push(ComponentRef::main(service.clone()));
            for key in planned.extra_components.keys() {
                refs.push(ComponentRef::extra(service.clone(), key.clone()));
            }
        }
        refs
    }

    /// Hand out the next dynamic resource index. Monotonic within the plan,
    /// starting at `"0"`.
    pub fn next_resource_id(&mut self) -> ResourceId {
        let id = ResourceId::Dynamic(self.next_index);
        self.next_index += 1;
        id
    }

    pub fn insert_resource(&mut self, resource: Resource) {
        self.resources.insert(resource.id().clone(), resource);
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

    pub fn connections(&self) -> &BTreeMap<String, ConnectionDef> {
        &self.connections
    }

    /// Record a named connection at the plan level. First writer wins.
    pub fn register_connection(&mut self, name: &str, interface: &str) {
        self.connections
            .entry(name.to_string())
            .or_insert_with(|| ConnectionDef::new(interface));
    }

    /// Wire two components together under `connection_key`, writing the
    /// symmetric outbound/inbound pair onto their connection maps.
    ///
    /// Idempotent: if either endpoint already has an entry under the key,
    /// nothing is written and `false` is returned.
    #[allow(clippy::too_many_arguments)]
    pub fn connect(
        &mut self,
        source: &ComponentRef,
        target: &ComponentRef,
        interface: &str,
        connection_key: &str,
        kind: RelationKind,
        requires_key: Option<&str>,
        provides_key: &str,
        relation_key: Option<&str>,
        attribute: Option<&str>,
    ) -> bool {
        let source_has = self
            .component(source)
            .map(|c| c.connections().contains_key(connection_key))
            .unwrap_or(true);
        let target_has = self
            .component(target)
            .map(|c| c.connections().contains_key(connection_key))
            .unwrap_or(true);
        if source_has || target_has {
            return false;
        }

        let outbound = ConnectionInfo {
            direction: Direction::Outbound,
            service: target.service.clone(),
            interface: interface.to_string(),
            requires_key: requires_key.map(String::from),
            provides_key: provides_key.to_string(),
            kind,
            relation_key: relation_key.map(String::from),
            extra_key: match &target.slot {
                ComponentSlot::Extra(key) => Some(key.clone()),
                ComponentSlot::Main => None,
            },
            attribute: attribute.map(String::from),
        };
        let inbound = ConnectionInfo {
            direction: Direction::Inbound,
            service: source.service.clone(),
            interface: interface.to_string(),
            requires_key: None,
            provides_key: provides_key.to_string(),
            kind,
            relation_key: relation_key.map(String::from),
            extra_key: match &source.slot {
                ComponentSlot::Extra(key) => Some(key.clone()),
                ComponentSlot::Main => None,
            },
            attribute: attribute.map(String::from),
        };

        if let Some(component) = self.component_mut(source) {
            component.add_connection(connection_key, outbound);
        }
        if let Some(component) = self.component_mut(target) {
            component.add_connection(connection_key, inbound);
        }
        true
    }

    /// Tear the plan down into the maps a deployment commits.
    pub fn into_parts(
        self,
    ) -> (
        BTreeMap<ResourceId, Resource>,
        BTreeMap<String, ConnectionDef>,
    ) {
        (self.resources, self.connections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Direction;

    fn component(id: &str) -> Component {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "provides": [{"widget": "http"}],
        }))
        .unwrap()
    }

    #[test]
    fn resource_ids_are_monotonic_from_zero() {
        let mut plan = Plan::new();
        assert_eq!(plan.next_resource_id(), ResourceId::Dynamic(0));
        assert_eq!(plan.next_resource_id(), ResourceId::Dynamic(1));
        assert_eq!(plan.next_resource_id(), ResourceId::Dynamic(2));
    }

    #[test]
    fn connect_writes_a_symmetric_pair() {
        let mut plan = Plan::new();
        plan.add_service("db", component("mysql-server"));
        plan.add_service("web", component("wordpress"));

        let connected = plan.connect(
            &ComponentRef::main("db"),
            &ComponentRef::main("web"),
            "mysql",
            "backend",
            RelationKind::Reference,
            Some("database"),
            "widget:http",
            Some("backend"),
            None,
        );
        assert!(connected);

        let outbound = &plan
            .component(&ComponentRef::main("db"))
            .unwrap()
            .connections()["backend"];
        assert_eq!(outbound.direction, Direction::Outbound);
        assert_eq!(outbound.service, "web");
        assert_eq!(outbound.requires_key.as_deref(), Some("database"));

        let inbound = &plan
            .component(&ComponentRef::main("web"))
            .unwrap()
            .connections()["backend"];
        assert_eq!(inbound.direction, Direction::Inbound);
        assert_eq!(inbound.service, "db");
        assert_eq!(inbound.requires_key, None);
    }

    #[test]
    fn connect_is_idempotent() {
        let mut plan = Plan::new();
        plan.add_service("db", component("mysql-server"));
        plan.add_service("web", component("wordpress"));

        let source = ComponentRef::main("db");
        let target = ComponentRef::main("web");
        assert!(plan.connect(
            &source,
            &target,
            "mysql",
            "backend",
            RelationKind::Reference,
            Some("database"),
            "widget:http",
            None,
            None,
        ));
        assert!(!plan.connect(
            &source,
            &target,
            "mysql",
            "backend",
            RelationKind::Reference,
            Some("database"),
            "widget:http",
            None,
            None,
        ));

        let db = plan.component(&source).unwrap();
        assert_eq!(db.connections().len(), 1);
        let web = plan.component(&target).unwrap();
        assert_eq!(web.connections().len(), 1);
    }
}
