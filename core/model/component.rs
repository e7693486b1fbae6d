use super::{ComponentSelector, RelationKind, ResourceId};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::*;

/// A capability a component offers: a resource-type/interface pair under a
/// stable key. Catalogs write these either in full or as a one-entry
/// `{resource_type: interface}` shorthand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvidesEntry {
    pub key: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub interface: String,
}

struct ProvidesVisitor;

impl<'de> Visitor<'de> for ProvidesVisitor {
    type Value = ProvidesEntry;

    fn expecting(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(fmt, "a provides entry ({{resource_type: interface}} or {{key, type, interface}})")
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut key: Option<String> = None;
        let mut resource_type: Option<String> = None;
        let mut interface: Option<String> = None;
        let mut shorthand: Option<(String, String)> = None;

        while let Some(field) = access.next_key::<String>()? {
            match field.as_str() {
                "key" => key = Some(access.next_value()?),
                "type" | "resource_type" => resource_type = Some(access.next_value()?),
                "interface" => interface = Some(access.next_value()?),
                other => {
                    let value: String = access.next_value()?;
                    shorthand = Some((other.to_string(), value));
                }
            }
        }

        let (resource_type, interface) = match (resource_type, interface, shorthand) {
            (Some(rt), Some(iface), _) => (rt, iface),
            (None, None, Some((rt, iface))) => (rt, iface),
            _ => {
                return Err(serde::de::Error::custom(
                    "provides entry needs a resource type and an interface",
                ))
            }
        };
        let key = key.unwrap_or_else(|| format!("{}:{}", resource_type, interface));
        Ok(ProvidesEntry {
            key,
            resource_type,
            interface,
        })
    }
}

impl<'de> Deserialize<'de> for ProvidesEntry {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_map(ProvidesVisitor)
    }
}

/// The record written onto a requirement once the resolver has matched it to
/// a concrete component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Satisfaction {
    pub service: String,
    pub component_id: String,
    pub provides_key: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawRequirement {
    Interface(String),
    Full {
        interface: String,
        #[serde(default, rename = "relation")]
        kind: RelationKind,
    },
}

/// A named dependency a component declares. Once `satisfied_by` is set the
/// requirement is resolved and is never resolved again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawRequirement")]
pub struct Requirement {
    pub interface: String,
    #[serde(rename = "relation")]
    pub kind: RelationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub satisfied_by: Option<Satisfaction>,
}

impl From<RawRequirement> for Requirement {
    fn from(raw: RawRequirement) -> Self {
        match raw {
            RawRequirement::Interface(interface) => Requirement {
                interface,
                kind: RelationKind::Reference,
                satisfied_by: None,
            },
            RawRequirement::Full { interface, kind } => Requirement {
                interface,
                kind,
                satisfied_by: None,
            },
        }
    }
}

impl Requirement {
    pub fn new<S: Into<String>>(interface: S, kind: RelationKind) -> Self {
        Requirement {
            interface: interface.into(),
            kind,
            satisfied_by: None,
        }
    }

    pub fn is_satisfied(&self) -> bool {
        self.satisfied_by.is_some()
    }
}

/// A resolved catalog entry: what a provider can create, what it requires,
/// what it provides, and (once planning is underway) how it is wired to the
/// rest of the plan.
#[derive(Builder, Debug, Clone, Serialize, Deserialize)]
#[builder(build_fn(error = "ComponentError"))]
pub struct Component {
    id: String,

    #[builder(default)]
    #[serde(default)]
    provider_key: String,

    #[builder(default)]
    #[serde(default)]
    role: Option<String>,

    #[builder(default)]
    #[serde(default)]
    provides: Vec<ProvidesEntry>,

    #[builder(default)]
    #[serde(default)]
    requires: BTreeMap<String, Requirement>,

    #[builder(default)]
    #[serde(default)]
    connections: BTreeMap<String, super::ConnectionInfo>,

    #[builder(default)]
    #[serde(default)]
    host_keys: Vec<String>,

    #[builder(default)]
    #[serde(default)]
    instances: Vec<ResourceId>,
}

impl Component {
    pub fn builder() -> ComponentBuilder {
        Default::default()
    }

    pub fn id(&self) -> &str {
        self.id.as_ref()
    }

    pub fn provider_key(&self) -> &str {
        self.provider_key.as_ref()
    }

    pub fn set_provider_key<S: Into<String>>(&mut self, key: S) {
        self.provider_key = key.into();
    }

    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    pub fn provides(&self) -> &[ProvidesEntry] {
        self.provides.as_ref()
    }

    pub fn requires(&self) -> &BTreeMap<String, Requirement> {
        &self.requires
    }

    pub fn connections(&self) -> &BTreeMap<String, super::ConnectionInfo> {
        &self.connections
    }

    pub fn host_keys(&self) -> &[String] {
        self.host_keys.as_ref()
    }

    pub fn instances(&self) -> &[ResourceId] {
        self.instances.as_ref()
    }

    /// The resource type this component materializes as, taken from its
    /// first provides entry.
    pub fn resource_type(&self) -> Option<&str> {
        self.provides.first().map(|p| p.resource_type.as_str())
    }

    pub fn provides_matching(&self, interface: &str) -> Vec<&ProvidesEntry> {
        self.provides
            .iter()
            .filter(|p| p.interface == interface)
            .collect()
    }

    pub fn first_provides(&self, interface: &str) -> Option<&ProvidesEntry> {
        self.provides.iter().find(|p| p.interface == interface)
    }

    pub fn requirement(&self, key: &str) -> Option<&Requirement> {
        self.requires.get(key)
    }

    /// Requirement keys declaring the given interface, unsatisfied ones
    /// first. Order within each group follows the declaration map order.
    pub fn requirement_keys_for_interface(&self, interface: &str) -> Vec<&str> {
        let mut unsatisfied = vec![];
        let mut satisfied = vec![];
        for (key, requirement) in &self.requires {
            if requirement.interface == interface {
                if requirement.is_satisfied() {
                    satisfied.push(key.as_str());
                } else {
                    unsatisfied.push(key.as_str());
                }
            }
        }
        unsatisfied.extend(satisfied);
        unsatisfied
    }

    pub fn unsatisfied_requirement_keys(&self) -> Vec<String> {
        self.requires
            .iter()
            .filter(|(_, requirement)| !requirement.is_satisfied())
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Ensure a requirement exists under `key`; used when a blueprint's
    /// hosting shorthand names an interface the component never declared.
    pub fn ensure_requirement(&mut self, key: &str, interface: &str, kind: RelationKind) {
        self.requires
            .entry(key.to_string())
            .or_insert_with(|| Requirement::new(interface, kind));
    }

    pub fn satisfy(&mut self, key: &str, satisfaction: Satisfaction) -> Result<(), ComponentError> {
        let requirement =
            self.requires
                .get_mut(key)
                .ok_or_else(|| ComponentError::UnknownRequirement {
                    component: self.id.clone(),
                    key: key.to_string(),
                })?;
        if requirement.is_satisfied() {
            return Err(ComponentError::AlreadySatisfied {
                component: self.id.clone(),
                key: key.to_string(),
            });
        }
        requirement.satisfied_by = Some(satisfaction);
        Ok(())
    }

    /// Record a connection endpoint. Returns false (and leaves the existing
    /// entry untouched) when the key is already present.
    pub fn add_connection(&mut self, key: &str, info: super::ConnectionInfo) -> bool {
        if self.connections.contains_key(key) {
            return false;
        }
        self.connections.insert(key.to_string(), info);
        true
    }

    pub fn mark_host_key(&mut self, key: &str) {
        if !self.host_keys.iter().any(|k| k == key) {
            self.host_keys.push(key.to_string());
        }
    }

    pub fn is_host_key(&self, key: &str) -> bool {
        self.host_keys.iter().any(|k| k == key)
    }

    pub fn push_instance(&mut self, id: ResourceId) {
        self.instances.push(id);
    }

    pub fn matches_selector(&self, selector: &ComponentSelector) -> bool {
        match selector {
            ComponentSelector::ById(id) => self.id == *id,
            ComponentSelector::ByTraits {
                resource_type,
                interface,
                role,
            } => {
                if let Some(resource_type) = resource_type {
                    if !self
                        .provides
                        .iter()
                        .any(|p| p.resource_type == *resource_type)
                    {
                        return false;
                    }
                }
                if let Some(interface) = interface {
                    if !self.provides.iter().any(|p| p.interface == *interface) {
                        return false;
                    }
                }
                if let Some(role) = role {
                    if self.role.as_deref() != Some(role.as_str()) {
                        return false;
                    }
                }
                true
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum ComponentError {
    #[error("Component {component} has no requirement named {key}")]
    UnknownRequirement { component: String, key: String },

    #[error("Requirement {key} on component {component} is already satisfied and must not be resolved again")]
    AlreadySatisfied { component: String, key: String },

    #[error(transparent)]
    BuilderError(derive_builder::UninitializedFieldError),
}

impl From<derive_builder::UninitializedFieldError> for ComponentError {
    fn from(value: derive_builder::UninitializedFieldError) -> Self {
        ComponentError::BuilderError(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provides_shorthand_expands_to_a_full_entry() {
        let entry: ProvidesEntry = serde_json::from_str(r#"{"database": "mysql"}"#).unwrap();
        assert_eq!(entry.key, "database:mysql");
        assert_eq!(entry.resource_type, "database");
        assert_eq!(entry.interface, "mysql");
    }

    #[test]
    fn requirements_parse_from_bare_interface_strings() {
        let requirement: Requirement = serde_json::from_str(r#""mysql""#).unwrap();
        assert_eq!(requirement.interface, "mysql");
        assert_eq!(requirement.kind, RelationKind::Reference);
        assert!(!requirement.is_satisfied());
    }

    #[test]
    fn requirements_parse_host_relations() {
        let requirement: Requirement =
            serde_json::from_str(r#"{"interface": "linux.instance", "relation": "host"}"#).unwrap();
        assert_eq!(requirement.kind, RelationKind::Host);
    }

    #[test]
    fn satisfying_a_requirement_twice_is_an_error() {
        let mut component = Component::builder()
            .id("db".to_string())
            .requires(
                [(
                    "database".to_string(),
                    Requirement::new("mysql", RelationKind::Reference),
                )]
                .into(),
            )
            .build()
            .unwrap();

        let satisfaction = Satisfaction {
            service: "db".to_string(),
            component_id: "mysql-server".to_string(),
            provides_key: "database:mysql".to_string(),
            name: "backend".to_string(),
            relation_key: None,
        };

        component.satisfy("database", satisfaction.clone()).unwrap();
        assert_matches!(
            component.satisfy("database", satisfaction),
            Err(ComponentError::AlreadySatisfied { key, .. }) if key == "database"
        );
    }

    #[test]
    fn requirement_keys_prefer_unsatisfied_entries() {
        let mut component = Component::builder()
            .id("app".to_string())
            .requires(
                [
                    (
                        "primary".to_string(),
                        Requirement::new("mysql", RelationKind::Reference),
                    ),
                    (
                        "replica".to_string(),
                        Requirement::new("mysql", RelationKind::Reference),
                    ),
                ]
                .into(),
            )
            .build()
            .unwrap();

        component
            .satisfy(
                "primary",
                Satisfaction {
                    service: "db".to_string(),
                    component_id: "mysql-server".to_string(),
                    provides_key: "database:mysql".to_string(),
                    name: "primary".to_string(),
                    relation_key: None,
                },
            )
            .unwrap();

        assert_eq!(
            component.requirement_keys_for_interface("mysql"),
            vec!["replica", "primary"]
        );
    }
}
