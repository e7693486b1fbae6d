use super::{Catalog, CatalogError, Provider, RequestContext};
use crate::model::{Component, ComponentSelector};
use crate::sync::Arc;
use dashmap::DashMap;
use std::collections::BTreeMap;
use tracing::*;

/// The set of providers a deployment can draw resources from, with a shared
/// catalog cache.
///
/// Lookup order over providers is their key order, so resolution results are
/// deterministic regardless of how the catalog fan-out interleaves.
#[derive(Default, Debug, Clone)]
pub struct Environment {
    providers: BTreeMap<String, Arc<dyn Provider>>,
    catalogs: Arc<DashMap<String, Arc<Catalog>>>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_provider(&mut self, provider: Arc<dyn Provider>) {
        self.providers.insert(provider.key().to_string(), provider);
    }

    pub fn with_provider(mut self, provider: Arc<dyn Provider>) -> Self {
        self.register_provider(provider);
        self
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn get_provider(&self, key: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(key).cloned()
    }

    pub fn providers(&self) -> impl Iterator<Item = (&String, &Arc<dyn Provider>)> {
        self.providers.iter()
    }

    /// Warm the catalog cache by fanning one lookup out per provider and
    /// waiting for all of them. Purely a latency optimization: resolution
    /// reads the same catalogs either way.
    #[instrument(name = "Environment::prefetch_catalogs", skip(self, ctx))]
    pub async fn prefetch_catalogs(&self, ctx: &RequestContext) -> Result<(), CatalogError> {
        let lookups = self.providers.values().map(|provider| {
            let provider = provider.clone();
            async move {
                let catalog = provider.catalog(ctx).await?;
                Ok::<_, CatalogError>((provider.key().to_string(), catalog))
            }
        });

        for result in futures::future::join_all(lookups).await {
            let (key, catalog) = result?;
            self.catalogs.insert(key, Arc::new(catalog));
        }
        Ok(())
    }

    pub fn cached_catalog(&self, provider_key: &str) -> Option<Arc<Catalog>> {
        self.catalogs.get(provider_key).map(|c| c.value().clone())
    }

    /// All components matching the selector, across every provider, paired
    /// with the provider key they came from.
    #[instrument(name = "Environment::find_components", skip(self, ctx))]
    pub async fn find_components(
        &self,
        ctx: &RequestContext,
        selector: &ComponentSelector,
    ) -> Result<Vec<(String, Component)>, CatalogError> {
        let mut matches = vec![];
        for (key, provider) in &self.providers {
            for mut component in provider.find_components(ctx, selector).await? {
                component.set_provider_key(key.clone());
                matches.push((key.clone(), component));
            }
        }
        Ok(matches)
    }

    /// First component matching the selector. Ambiguity is logged and the
    /// first match wins; callers that want to treat it as an error use
    /// [`Environment::find_components`] and decide themselves.
    #[instrument(name = "Environment::find_component", skip(self, ctx))]
    pub async fn find_component(
        &self,
        ctx: &RequestContext,
        selector: &ComponentSelector,
    ) -> Result<Option<(String, Component)>, CatalogError> {
        let mut matches = self.find_components(ctx, selector).await?;
        if matches.len() > 1 {
            warn!(
                "Ambiguous component match for {}: {} candidates, picking {}",
                selector,
                matches.len(),
                matches[0].1.id()
            );
        }
        Ok(if matches.is_empty() {
            None
        } else {
            Some(matches.remove(0))
        })
    }

    /// The provider that can create the given resource type and/or speak the
    /// given interface.
    #[instrument(name = "Environment::select_provider", skip(self, ctx))]
    pub async fn select_provider(
        &self,
        ctx: &RequestContext,
        resource_type: Option<&str>,
        interface: Option<&str>,
    ) -> Result<Option<Arc<dyn Provider>>, CatalogError> {
        for provider in self.providers.values() {
            let provides = provider.provides(ctx).await?;
            let type_ok = resource_type
                .map(|rt| provides.iter().any(|p| p.resource_type == rt))
                .unwrap_or(true);
            let interface_ok = interface
                .map(|iface| provides.iter().any(|p| p.interface == iface))
                .unwrap_or(true);
            if type_ok && interface_ok {
                return Ok(Some(provider.clone()));
            }
        }
        Ok(None)
    }
}
