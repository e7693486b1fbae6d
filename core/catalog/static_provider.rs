use super::{Catalog, CatalogError, Provider, RequestContext, ResourceTemplate};
use crate::model::{Component, ComponentSelector, Deployment, JsonMap, ProvidesEntry};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A provider backed by a fixed, in-memory catalog. Used by the CLI for
/// offline planning runs and by tests as the standard provider double.
#[derive(Debug, Clone)]
pub struct StaticProvider {
    key: String,
    catalog: Catalog,
}

/// Document form for building a [`StaticProvider`] from a JSON catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticCatalogDoc {
    #[serde(default)]
    pub components: Vec<Component>,
}

impl StaticProvider {
    pub fn new<S: Into<String>>(key: S, components: Vec<Component>) -> Self {
        StaticProvider {
            key: key.into(),
            catalog: Catalog { components },
        }
    }

    pub fn from_doc<S: Into<String>>(key: S, doc: StaticCatalogDoc) -> Self {
        Self::new(key, doc.components)
    }
}

#[async_trait]
impl Provider for StaticProvider {
    fn key(&self) -> &str {
        self.key.as_ref()
    }

    async fn catalog(&self, _ctx: &RequestContext) -> Result<Catalog, CatalogError> {
        Ok(self.catalog.clone())
    }

    async fn find_components(
        &self,
        _ctx: &RequestContext,
        selector: &ComponentSelector,
    ) -> Result<Vec<Component>, CatalogError> {
        Ok(self
            .catalog
            .find(selector)
            .into_iter()
            .cloned()
            .map(|mut component| {
                component.set_provider_key(self.key.clone());
                component
            })
            .collect())
    }

    async fn get_component(
        &self,
        _ctx: &RequestContext,
        id: &str,
    ) -> Result<Option<Component>, CatalogError> {
        Ok(self
            .catalog
            .components
            .iter()
            .find(|component| component.id() == id)
            .cloned()
            .map(|mut component| {
                component.set_provider_key(self.key.clone());
                component
            }))
    }

    async fn generate_template(
        &self,
        deployment: &Deployment,
        resource_type: &str,
        _service_name: &str,
        _ctx: &RequestContext,
        name: &str,
    ) -> Result<ResourceTemplate, CatalogError> {
        let domain = deployment
            .inputs()
            .global("domain")
            .and_then(|v| v.as_str())
            .unwrap_or("rollout.local")
            .to_string();

        Ok(ResourceTemplate {
            resource_type: resource_type.to_string(),
            provider: self.key.clone(),
            dns_name: Some(format!("{}.{}", name, domain)),
            instance: JsonMap::new(),
        })
    }

    async fn provides(&self, _ctx: &RequestContext) -> Result<Vec<ProvidesEntry>, CatalogError> {
        let mut provides: Vec<ProvidesEntry> = vec![];
        for component in &self.catalog.components {
            for entry in component.provides() {
                if !provides.iter().any(|p| p.key == entry.key) {
                    provides.push(entry.clone());
                }
            }
        }
        Ok(provides)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Blueprint, EnvironmentDef};

    fn provider() -> StaticProvider {
        let doc: StaticCatalogDoc = serde_json::from_value(serde_json::json!({
            "components": [
                {"id": "tiny-vm", "provides": [{"compute": "linux.instance"}]},
                {"id": "mysql-server", "provides": [{"database": "mysql"}]},
            ]
        }))
        .unwrap();
        StaticProvider::from_doc("test-cloud", doc)
    }

    #[tokio::test]
    async fn selectors_filter_the_catalog() {
        let provider = provider();
        let ctx = RequestContext::default();

        let matches = provider
            .find_components(&ctx, &ComponentSelector::by_interface("mysql"))
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id(), "mysql-server");

        let matches = provider
            .find_components(&ctx, &ComponentSelector::by_id("tiny-vm"))
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
    }

    #[tokio::test]
    async fn templates_use_the_deployment_domain() {
        let provider = provider();
        let mut deployment = Deployment::new(Blueprint::default(), EnvironmentDef::default());
        deployment.inputs_mut().set_global("domain", "example.com".into());

        let template = provider
            .generate_template(
                &deployment,
                "compute",
                "web",
                &RequestContext::default(),
                "web1",
            )
            .await
            .unwrap();

        assert_eq!(template.dns_name.as_deref(), Some("web1.example.com"));
        assert_eq!(template.provider, "test-cloud");
    }

    #[tokio::test]
    async fn provides_lists_every_interface_once() {
        let provider = provider();
        let provides = provider.provides(&RequestContext::default()).await.unwrap();
        assert_eq!(provides.len(), 2);
    }
}
