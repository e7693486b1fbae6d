mod environment;
mod error;
mod static_provider;

pub use environment::*;
pub use error::*;
pub use static_provider::*;

use crate::model::{Component, ComponentSelector, Deployment, JsonMap, ProvidesEntry};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The context object handed in by whichever layer received the request.
/// Opaque to the planner except for the identifiers it threads through to
/// providers.
#[derive(Default, Debug, Clone)]
pub struct RequestContext {
    pub deployment_id: Option<String>,
    pub region: Option<String>,
    pub simulation: bool,
}

impl RequestContext {
    pub fn for_deployment(deployment: &Deployment) -> Self {
        RequestContext {
            deployment_id: Some(deployment.id().to_string()),
            region: None,
            simulation: false,
        }
    }
}

/// A provider's full component listing.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub components: Vec<Component>,
}

impl Catalog {
    pub fn find(&self, selector: &ComponentSelector) -> Vec<&Component> {
        self.components
            .iter()
            .filter(|component| component.matches_selector(selector))
            .collect()
    }
}

/// The shape of a resource a provider would create, before the plan assigns
/// it an index and wires it up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceTemplate {
    #[serde(rename = "type")]
    pub resource_type: String,

    pub provider: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns_name: Option<String>,

    #[serde(default)]
    pub instance: JsonMap,
}

/// One resource provider: a catalog of components it can create, and the
/// templates those components materialize as. Implementations talk to cloud
/// vendors; the planner only ever sees this trait.
#[async_trait]
pub trait Provider: std::fmt::Debug + Send + Sync {
    fn key(&self) -> &str;

    async fn catalog(&self, ctx: &RequestContext) -> Result<Catalog, CatalogError>;

    async fn find_components(
        &self,
        ctx: &RequestContext,
        selector: &ComponentSelector,
    ) -> Result<Vec<Component>, CatalogError>;

    async fn get_component(
        &self,
        ctx: &RequestContext,
        id: &str,
    ) -> Result<Option<Component>, CatalogError>;

    async fn generate_template(
        &self,
        deployment: &Deployment,
        resource_type: &str,
        service_name: &str,
        ctx: &RequestContext,
        name: &str,
    ) -> Result<ResourceTemplate, CatalogError>;

    async fn provides(&self, ctx: &RequestContext) -> Result<Vec<ProvidesEntry>, CatalogError>;
}
