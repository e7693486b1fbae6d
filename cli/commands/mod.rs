mod plan;
mod postback;
mod status;

pub use plan::*;
pub use postback::*;
pub use status::*;

use rollout_core::catalog::{Environment, StaticCatalogDoc, StaticProvider};
use rollout_core::model::Deployment;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// The on-disk document the CLI works on: a deployment plus the static
/// catalogs standing in for real providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct DeploymentDoc {
    pub deployment: Deployment,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub catalog: BTreeMap<String, StaticCatalogDoc>,
}

impl DeploymentDoc {
    pub fn load(path: &Path) -> Result<Self, anyhow::Error> {
        let raw = std::fs::read_to_string(path)?;
        let doc = serde_json::from_str(&raw)?;
        Ok(doc)
    }

    pub fn save(&self, path: &Path) -> Result<(), anyhow::Error> {
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(path, raw)?;
        Ok(())
    }

    pub fn environment(&self) -> Arc<Environment> {
        let mut environment = Environment::new();
        for (key, doc) in &self.catalog {
            environment
                .register_provider(Arc::new(StaticProvider::from_doc(key.clone(), doc.clone())));
        }
        Arc::new(environment)
    }
}
