use thiserror::*;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("No provider registered under key {key}")]
    ProviderNotFound { key: String },

    #[error("Catalog lookup against provider {provider} failed: {reason}")]
    LookupFailed { provider: String, reason: String },

    #[error(transparent)]
    Unknown(anyhow::Error),
}
