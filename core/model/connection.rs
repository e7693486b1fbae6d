use super::{Direction, JsonMap, RelationKind};
use serde::{Deserialize, Serialize};

/// One endpoint's view of a resolved connection between two components.
///
/// Every connection is written as a symmetric pair: an outbound entry on the
/// requiring component and an inbound entry on the providing one, under the
/// same key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    pub direction: Direction,

    /// The service on the other end of the connection.
    pub service: String,

    pub interface: String,

    /// The requirement this connection satisfies. Outbound entries only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_key: Option<String>,

    pub provides_key: String,

    #[serde(rename = "relation")]
    pub kind: RelationKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation_key: Option<String>,

    /// Set when the peer is an auto-resolved extra component; holds its key
    /// in the owning service's extra-components map.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl ConnectionInfo {
    pub fn is_inbound_host(&self) -> bool {
        self.kind.is_host() && self.direction == Direction::Inbound
    }
}

/// A deployment-level connection record: the interface the connection speaks,
/// plus whatever the provisioning layer posts back onto it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionDef {
    pub interface: String,

    #[serde(flatten)]
    pub extra: JsonMap,
}

impl ConnectionDef {
    pub fn new<S: Into<String>>(interface: S) -> Self {
        ConnectionDef {
            interface: interface.into(),
            extra: JsonMap::new(),
        }
    }
}
