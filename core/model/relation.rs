use serde::{Deserialize, Serialize};
use thiserror::*;

/// How one component depends on another: a plain reference to a provided
/// interface, or a hosting dependency (the component runs *on* the target).
#[derive(
    Default, Debug, Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    #[default]
    Reference,
    Host,
}

impl RelationKind {
    pub fn is_host(&self) -> bool {
        matches!(self, RelationKind::Host)
    }
}

/// Which side of a connection a component sits on. The requiring side is
/// outbound, the providing side inbound.
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Inbound,
    Outbound,
}

/// A blueprint-declared relation, normalized from its three source syntaxes:
///
/// ```yaml
/// relations:
///   web: mysql                                  # short: key is the service
///   backend: {service: web, interface: http}    # long
///   host: linux.instance                        # hosting shorthand
/// ```
///
/// The hosting shorthand carries no target service; it asserts a host
/// requirement on the owning component and is satisfied by auto-resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationDef {
    pub service: Option<String>,
    pub interface: String,
    #[serde(rename = "relation")]
    pub kind: RelationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

/// The raw, pre-normalization form a relation takes in a blueprint document.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RelationSource {
    Interface(String),
    Full {
        service: Option<String>,
        interface: String,
        #[serde(default, rename = "relation")]
        kind: Option<RelationKind>,
        #[serde(default)]
        attribute: Option<String>,
    },
}

#[derive(Error, Debug)]
pub enum RelationError {
    #[error("Relation {key} on service {service} names no target service")]
    MissingTargetService { service: String, key: String },

    #[error("Relation {key} on service {service} is neither an interface string nor a relation map")]
    InvalidRelation { service: String, key: String },
}

impl RelationDef {
    /// Normalize one `relations` entry. The map key doubles as the target
    /// service name in the short syntax and as the `host` marker in the
    /// hosting shorthand.
    pub fn normalize(
        owning_service: &str,
        key: &str,
        source: RelationSource,
    ) -> Result<RelationDef, RelationError> {
        match source {
            RelationSource::Interface(interface) if key == "host" => Ok(RelationDef {
                service: None,
                interface,
                kind: RelationKind::Host,
                attribute: None,
            }),
            RelationSource::Interface(interface) => Ok(RelationDef {
                service: Some(key.to_string()),
                interface,
                kind: RelationKind::Reference,
                attribute: None,
            }),
            RelationSource::Full {
                service,
                interface,
                kind,
                attribute,
            } => {
                let kind = kind.unwrap_or_default();
                let service = match service {
                    Some(service) => Some(service),
                    None if key == "host" || kind.is_host() => None,
                    // Long form without an explicit service falls back to the
                    // short-syntax rule: the key names the target.
                    None => Some(key.to_string()),
                };
                if service.is_none() && !kind.is_host() {
                    return Err(RelationError::MissingTargetService {
                        service: owning_service.to_string(),
                        key: key.to_string(),
                    });
                }
                Ok(RelationDef {
                    service,
                    interface,
                    kind,
                    attribute,
                })
            }
        }
    }

    /// A hosting assertion with no explicit target; resolved by the
    /// auto-resolution pass rather than by relation matching.
    pub fn is_host_shorthand(&self) -> bool {
        self.service.is_none()
    }
}
