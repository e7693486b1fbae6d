use super::SettingsError;
use crate::model::{Inputs, OptionDef};
use serde_json::Value;

/// One normalized `constrains`/`constraints` entry. Every field is optional;
/// a missing field is a wildcard when deciding whether the constraint
/// applies.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Constraint {
    pub setting: Option<String>,
    pub value: Option<Value>,
    pub attribute: Option<String>,
    pub service: Option<String>,
    pub resource_type: Option<String>,
    pub message: Option<String>,
}

/// Normalize a raw `constrains` declaration into an ordered constraint list.
///
/// Accepts the long form (a list of constraint objects), the one-key-map
/// list form (`[{count: 3}]`), and the short map form (`{count: 3}`).
/// List order is preserved: the first matching constraint wins.
pub fn parse_constraints(raw: &Value) -> Result<Vec<Constraint>, SettingsError> {
    match raw {
        Value::Null => Ok(vec![]),
        Value::Array(items) => items.iter().map(parse_entry).collect(),
        Value::Object(map) => Ok(map
            .iter()
            .map(|(setting, value)| Constraint {
                setting: Some(setting.clone()),
                value: Some(value.clone()),
                ..Default::default()
            })
            .collect()),
        other => Err(SettingsError::InvalidConstraints {
            reason: format!("expected a list or a map, got {}", other),
        }),
    }
}

fn parse_entry(item: &Value) -> Result<Constraint, SettingsError> {
    let map = item
        .as_object()
        .ok_or_else(|| SettingsError::InvalidConstraints {
            reason: format!("expected a constraint object, got {}", item),
        })?;

    if map.contains_key("setting") {
        let as_str = |key: &str| map.get(key).and_then(|v| v.as_str()).map(String::from);
        return Ok(Constraint {
            setting: as_str("setting"),
            value: map.get("value").cloned(),
            attribute: as_str("attribute"),
            service: as_str("service"),
            resource_type: as_str("resource_type").or_else(|| as_str("resource")),
            message: as_str("message"),
        });
    }

    // One-key shorthand: `{count: 3}`.
    if map.len() == 1 {
        let (setting, value) = map.iter().next().unwrap();
        return Ok(Constraint {
            setting: Some(setting.clone()),
            value: Some(value.clone()),
            ..Default::default()
        });
    }

    Err(SettingsError::InvalidConstraints {
        reason: format!("constraint object names no setting: {}", item),
    })
}

impl Constraint {
    /// Every field present on the constraint must match the lookup; absent
    /// fields match anything.
    pub fn applies_to(
        &self,
        name: &str,
        resource_type: Option<&str>,
        service_name: Option<&str>,
    ) -> bool {
        if let Some(setting) = &self.setting {
            if setting != name {
                return false;
            }
        }
        if let Some(constrained_type) = &self.resource_type {
            if resource_type != Some(constrained_type.as_str()) {
                return false;
            }
        }
        if let Some(constrained_service) = &self.service {
            if service_name != Some(constrained_service.as_str()) {
                return false;
            }
        }
        true
    }

    /// Resolve the value this constraint supplies for `name`.
    ///
    /// Resolution order: an explicit `value` wins outright; otherwise a
    /// supplied resource is the value; otherwise the named blueprint input
    /// (or the option default). Values of typed options are objectified, and
    /// an `attribute` is extracted last.
    pub fn apply(
        &self,
        name: &str,
        option: Option<&OptionDef>,
        resource: Option<&Value>,
        option_key: Option<&str>,
        inputs: &Inputs,
    ) -> Result<Option<Value>, SettingsError> {
        let mut objectify = false;
        let mut value = if let Some(value) = &self.value {
            Some(value.clone())
        } else if let Some(resource) = resource {
            Some(resource.clone())
        } else {
            let from_input = option_key.and_then(|key| {
                inputs
                    .blueprint(key)
                    .or_else(|| inputs.global(key))
                    .cloned()
            });
            objectify = true;
            from_input.or_else(|| option.and_then(|o| o.default.clone()))
        };

        if objectify {
            if let (Some(option), Some(inner)) = (option, &value) {
                value = Some(objectify_value(name, option, inner)?);
            }
        }

        let Some(resolved) = value else {
            return Ok(None);
        };

        if let Some(attribute) = &self.attribute {
            let map = resolved
                .as_object()
                .ok_or_else(|| SettingsError::NotAMapping {
                    name: name.to_string(),
                    attribute: attribute.clone(),
                })?;
            return Ok(map.get(attribute).cloned());
        }

        Ok(Some(resolved))
    }
}

/// Expand a typed option's scalar value into its structured form. Only `url`
/// has a structured form today; other types pass through.
fn objectify_value(name: &str, option: &OptionDef, value: &Value) -> Result<Value, SettingsError> {
    match option.option_type.as_deref() {
        Some("url") => {
            let Some(raw) = value.as_str() else {
                return Ok(value.clone());
            };
            let spec = UrlSpec::parse(raw).ok_or_else(|| SettingsError::Objectification {
                name: name.to_string(),
                option_type: "url".to_string(),
                value: raw.to_string(),
            })?;
            Ok(spec.into_value())
        }
        _ => Ok(value.clone()),
    }
}

/// The structured form of a `url`-typed option value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlSpec {
    pub scheme: String,
    pub hostname: Option<String>,
    pub port: Option<u16>,
    pub path: String,
    pub query: Option<String>,
    pub fragment: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub url: String,
}

impl UrlSpec {
    pub fn parse(raw: &str) -> Option<Self> {
        let parsed = url::Url::parse(raw).ok()?;
        Some(UrlSpec {
            scheme: parsed.scheme().to_string(),
            hostname: parsed.host_str().map(String::from),
            port: parsed.port(),
            path: parsed.path().to_string(),
            query: parsed.query().map(String::from),
            fragment: parsed.fragment().map(String::from),
            username: match parsed.username() {
                "" => None,
                user => Some(user.to_string()),
            },
            password: parsed.password().map(String::from),
            url: raw.to_string(),
        })
    }

    pub fn into_value(self) -> Value {
        let mut map = serde_json::Map::new();
        map.insert("scheme".into(), self.scheme.clone().into());
        // `protocol` is the spelling blueprint attributes historically use.
        map.insert("protocol".into(), self.scheme.into());
        if let Some(hostname) = self.hostname {
            map.insert("hostname".into(), hostname.into());
        }
        if let Some(port) = self.port {
            map.insert("port".into(), port.into());
        }
        map.insert("path".into(), self.path.into());
        if let Some(query) = self.query {
            map.insert("query".into(), query.into());
        }
        if let Some(fragment) = self.fragment {
            map.insert("fragment".into(), fragment.into());
        }
        if let Some(username) = self.username {
            map.insert("username".into(), username.into());
        }
        if let Some(password) = self.password {
            map.insert("password".into(), password.into());
        }
        map.insert("url".into(), self.url.into());
        Value::Object(map)
    }
}
