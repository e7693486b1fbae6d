use serde::de::Visitor;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A unique identifier for a resource within one deployment.
///
/// Dynamic ids are handed out monotonically by a `Plan` during
/// materialization and serialize as stringified integers (`"0"`, `"1"`, ...).
/// Static ids name provider-less resources (users, key-pairs) and keep their
/// blueprint key. The two kinds never collide.
///
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub enum ResourceId {
    Dynamic(u64),
    Static(String),
}

impl ResourceId {
    pub fn is_dynamic(&self) -> bool {
        matches!(self, ResourceId::Dynamic(_))
    }

    pub fn is_static(&self) -> bool {
        matches!(self, ResourceId::Static(_))
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceId::Dynamic(idx) => write!(f, "{}", idx),
            ResourceId::Static(key) => write!(f, "{}", key),
        }
    }
}

impl From<&str> for ResourceId {
    fn from(value: &str) -> Self {
        if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(idx) = value.parse::<u64>() {
                return ResourceId::Dynamic(idx);
            }
        }
        ResourceId::Static(value.to_string())
    }
}

impl From<String> for ResourceId {
    fn from(value: String) -> Self {
        value.as_str().into()
    }
}

impl From<u64> for ResourceId {
    fn from(idx: u64) -> Self {
        ResourceId::Dynamic(idx)
    }
}

// Dynamic ids sort numerically and ahead of static ids, so iterating a
// deployment's resource map walks the provisioned instances in creation
// order before the static entries.
impl Ord for ResourceId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (ResourceId::Dynamic(a), ResourceId::Dynamic(b)) => a.cmp(b),
            (ResourceId::Static(a), ResourceId::Static(b)) => a.cmp(b),
            (ResourceId::Dynamic(_), ResourceId::Static(_)) => Ordering::Less,
            (ResourceId::Static(_), ResourceId::Dynamic(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for ResourceId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Serialize for ResourceId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

struct ResourceIdVisitor;

impl Visitor<'_> for ResourceIdVisitor {
    type Value = ResourceId;

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(v.into())
    }

    fn expecting(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(fmt, "a resource id string")
    }
}

impl<'de> Deserialize<'de> for ResourceId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_str(ResourceIdVisitor)
    }
}
