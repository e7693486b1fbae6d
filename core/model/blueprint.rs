use super::{ComponentSelector, JsonMap, RelationDef, RelationError, RelationSource};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A deployable option a blueprint exposes to its users. `constrains` is kept
/// in its raw document form; the settings module parses it on demand.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptionDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub option_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub constrains: serde_json::Value,
}

/// A provider-less or shared resource declared at the blueprint level
/// (users, key-pairs). Unknown fields (name, password, private_key, ...) are
/// kept verbatim for the materializer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticResourceDef {
    #[serde(rename = "type")]
    pub resource_type: String,

    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub constrains: serde_json::Value,

    #[serde(flatten)]
    pub extra: JsonMap,
}

impl StaticResourceDef {
    pub fn field(&self, name: &str) -> Option<&serde_json::Value> {
        self.extra.get(name)
    }

    pub fn selector(&self) -> ComponentSelector {
        ComponentSelector::by_type(self.resource_type.clone())
    }
}

/// A named slot in a blueprint: the component selector it binds to, its
/// declared relations (kept raw, normalized via [`ServiceDef::relations`]),
/// and its constraints (count and friends).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceDef {
    pub component: ComponentSelector,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    relations: BTreeMap<String, serde_json::Value>,

    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub constraints: serde_json::Value,
}

impl ServiceDef {
    pub fn new(component: ComponentSelector) -> Self {
        ServiceDef {
            component,
            relations: BTreeMap::new(),
            constraints: serde_json::Value::Null,
        }
    }

    pub fn with_relation<S: Into<String>>(mut self, key: S, relation: serde_json::Value) -> Self {
        self.relations.insert(key.into(), relation);
        self
    }

    pub fn with_constraints(mut self, constraints: serde_json::Value) -> Self {
        self.constraints = constraints;
        self
    }

    /// Normalize every declared relation, in declaration order.
    pub fn relations(&self, service_name: &str) -> Result<Vec<(String, RelationDef)>, RelationError> {
        let mut relations = vec![];
        for (key, raw) in &self.relations {
            let source: RelationSource = serde_json::from_value(raw.clone()).map_err(|_| {
                RelationError::InvalidRelation {
                    service: service_name.to_string(),
                    key: key.clone(),
                }
            })?;
            let def = RelationDef::normalize(service_name, key, source)?;
            relations.push((key.clone(), def));
        }
        Ok(relations)
    }
}

/// The immutable deployment template: services, user-facing options, and
/// static resources.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Blueprint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub services: BTreeMap<String, ServiceDef>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, OptionDef>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub resources: BTreeMap<String, StaticResourceDef>,

    #[serde(
        default,
        rename = "display-outputs",
        skip_serializing_if = "JsonMap::is_empty"
    )]
    pub display_outputs: JsonMap,
}
