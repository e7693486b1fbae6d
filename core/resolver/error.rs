use crate::catalog::CatalogError;
use crate::model::{ComponentError, ComponentSelector, RelationError};
use thiserror::*;

#[derive(Error, Debug)]
pub enum ResolverError {
    #[error("Deployment has no blueprint to resolve")]
    MissingBlueprint,

    #[error("No component in the environment matches {selector} for service {service}")]
    ComponentNotFound {
        service: String,
        selector: ComponentSelector,
    },

    #[error("{count} components match {selector} for service {service} and strict matching is on")]
    AmbiguousComponent {
        service: String,
        selector: ComponentSelector,
        count: usize,
    },

    #[error("Relation {relation} on service {service} targets unknown service {target}")]
    UnknownServiceTarget {
        service: String,
        relation: String,
        target: String,
    },

    #[error("Service {service} provides {count} entries for interface {interface}; cannot pick one")]
    AmbiguousInterface {
        service: String,
        interface: String,
        count: usize,
    },

    #[error("Component {component} on service {service} has no requirement or provides entry for interface {interface}")]
    UnmetRequirement {
        service: String,
        component: String,
        interface: String,
    },

    #[error("Dependency loop detected while resolving service {service}: component {component} was already resolved")]
    DependencyLoopDetected { service: String, component: String },

    #[error("Gave up auto-resolving requirements after {limit} steps")]
    MaxDepthExceeded { limit: usize },

    #[error(transparent)]
    RelationError(RelationError),

    #[error(transparent)]
    ComponentError(ComponentError),

    #[error(transparent)]
    CatalogError(CatalogError),
}

impl From<RelationError> for ResolverError {
    fn from(value: RelationError) -> Self {
        ResolverError::RelationError(value)
    }
}

impl From<ComponentError> for ResolverError {
    fn from(value: ComponentError) -> Self {
        ResolverError::ComponentError(value)
    }
}

impl From<CatalogError> for ResolverError {
    fn from(value: CatalogError) -> Self {
        ResolverError::CatalogError(value)
    }
}
