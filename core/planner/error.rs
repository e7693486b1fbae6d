use crate::catalog::CatalogError;
use crate::keys::KeysError;
use crate::model::{DeploymentStatus, ResourceError, ResourceId};
use crate::resolver::ResolverError;
use crate::settings::SettingsError;
use thiserror::*;

#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("Deployment is {status}, not NEW; it cannot be planned again")]
    DeploymentNotNew { status: DeploymentStatus },

    #[error("Deployment has no blueprint")]
    MissingBlueprint,

    #[error("Deployment resolves to an environment with no providers")]
    EmptyEnvironment,

    #[error("Service {service} has a count of {value}; counts must be positive integers")]
    InvalidCount {
        service: String,
        value: serde_json::Value,
    },

    #[error("Static resource {key} has type {resource_type}, which no provider or built-in can materialize")]
    UnknownStaticResource { key: String, resource_type: String },

    #[error("Provisioning order for resource {resource} is cyclic")]
    TaskGraphCycle { resource: ResourceId },

    #[error(transparent)]
    ResolverError(ResolverError),

    #[error(transparent)]
    CatalogError(CatalogError),

    #[error(transparent)]
    SettingsError(SettingsError),

    #[error(transparent)]
    ResourceError(ResourceError),

    #[error(transparent)]
    KeysError(KeysError),
}

impl From<ResolverError> for PlannerError {
    fn from(value: ResolverError) -> Self {
        PlannerError::ResolverError(value)
    }
}

impl From<CatalogError> for PlannerError {
    fn from(value: CatalogError) -> Self {
        PlannerError::CatalogError(value)
    }
}

impl From<SettingsError> for PlannerError {
    fn from(value: SettingsError) -> Self {
        PlannerError::SettingsError(value)
    }
}

impl From<ResourceError> for PlannerError {
    fn from(value: ResourceError) -> Self {
        PlannerError::ResourceError(value)
    }
}

impl From<KeysError> for PlannerError {
    fn from(value: KeysError) -> Self {
        PlannerError::KeysError(value)
    }
}
