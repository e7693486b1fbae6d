use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize};

/// The criteria a blueprint (or an unsatisfied requirement) uses to look a
/// component up in a provider catalog: either an exact id, or any combination
/// of resource type, interface, and role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentSelector {
    ById(String),
    ByTraits {
        resource_type: Option<String>,
        interface: Option<String>,
        role: Option<String>,
    },
}

impl ComponentSelector {
    pub fn by_id<S: Into<String>>(id: S) -> Self {
        ComponentSelector::ById(id.into())
    }

    pub fn by_type<S: Into<String>>(resource_type: S) -> Self {
        ComponentSelector::ByTraits {
            resource_type: Some(resource_type.into()),
            interface: None,
            role: None,
        }
    }

    pub fn by_interface<S: Into<String>>(interface: S) -> Self {
        ComponentSelector::ByTraits {
            resource_type: None,
            interface: Some(interface.into()),
            role: None,
        }
    }

    pub fn interface(&self) -> Option<&str> {
        match self {
            ComponentSelector::ById(_) => None,
            ComponentSelector::ByTraits { interface, .. } => interface.as_deref(),
        }
    }

    pub fn resource_type(&self) -> Option<&str> {
        match self {
            ComponentSelector::ById(_) => None,
            ComponentSelector::ByTraits { resource_type, .. } => resource_type.as_deref(),
        }
    }
}

impl std::fmt::Display for ComponentSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComponentSelector::ById(id) => write!(f, "id={}", id),
            ComponentSelector::ByTraits {
                resource_type,
                interface,
                role,
            } => write!(
                f,
                "type={} interface={} role={}",
                resource_type.as_deref().unwrap_or("*"),
                interface.as_deref().unwrap_or("*"),
                role.as_deref().unwrap_or("*"),
            ),
        }
    }
}

impl Serialize for ComponentSelector {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            ComponentSelector::ById(id) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("id", id)?;
                map.end()
            }
            ComponentSelector::ByTraits {
                resource_type,
                interface,
                role,
            } => {
                let mut map = serializer.serialize_map(None)?;
                if let Some(resource_type) = resource_type {
                    map.serialize_entry("type", resource_type)?;
                }
                if let Some(interface) = interface {
                    map.serialize_entry("interface", interface)?;
                }
                if let Some(role) = role {
                    map.serialize_entry("role", role)?;
                }
                map.end()
            }
        }
    }
}

struct SelectorVisitor;

impl<'de> Visitor<'de> for SelectorVisitor {
    type Value = ComponentSelector;

    fn expecting(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(fmt, "a component selector map ({{id}} or {{type, interface, role}})")
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut id: Option<String> = None;
        let mut resource_type: Option<String> = None;
        let mut interface: Option<String> = None;
        let mut role: Option<String> = None;

        while let Some(key) = access.next_key::<String>()? {
            match key.as_str() {
                "id" => id = Some(access.next_value()?),
                // "type" is the blueprint spelling; "resource_type" the
                // canonical one used in catalog lookups.
                "type" | "resource_type" => resource_type = Some(access.next_value()?),
                "interface" => interface = Some(access.next_value()?),
                "role" => role = Some(access.next_value()?),
                _ => {
                    let _: serde::de::IgnoredAny = access.next_value()?;
                }
            }
        }

        if let Some(id) = id {
            return Ok(ComponentSelector::ById(id));
        }
        Ok(ComponentSelector::ByTraits {
            resource_type,
            interface,
            role,
        })
    }
}

impl<'de> Deserialize<'de> for ComponentSelector {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_map(SelectorVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_selectors_win_over_trait_keys() {
        let selector: ComponentSelector =
            serde_json::from_str(r#"{"id": "wordpress", "type": "application"}"#).unwrap();
        assert_matches!(selector, ComponentSelector::ById(id) if id == "wordpress");
    }

    #[test]
    fn type_is_aliased_to_resource_type() {
        let selector: ComponentSelector = serde_json::from_str(r#"{"type": "compute"}"#).unwrap();
        assert_eq!(selector.resource_type(), Some("compute"));

        let selector: ComponentSelector =
            serde_json::from_str(r#"{"resource_type": "compute"}"#).unwrap();
        assert_eq!(selector.resource_type(), Some("compute"));
    }

    #[test]
    fn trait_selectors_keep_all_criteria() {
        let selector: ComponentSelector = serde_json::from_str(
            r#"{"type": "database", "interface": "mysql", "role": "master"}"#,
        )
        .unwrap();
        assert_matches!(
            selector,
            ComponentSelector::ByTraits { resource_type, interface, role } => {
                assert_eq!(resource_type.as_deref(), Some("database"));
                assert_eq!(interface.as_deref(), Some("mysql"));
                assert_eq!(role.as_deref(), Some("master"));
            }
        );
    }
}
