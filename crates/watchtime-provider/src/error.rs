//! Provider system error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("manifest error: {0}")]
    Manifest(String),

    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("sandbox error: {0}")]
    Sandbox(String),

    #[error("provider not found: {0}")]
    NotFound(String),

    #[error("provider disabled: {0}")]
    Disabled(String),

    #[error("import error: {0}")]
    Import(String),

    #[error("WASM validation error: {0}")]
    WasmValidation(String),

    #[error("execution timeout: provider {0} exceeded fuel limit")]
    FuelExhausted(String),

    #[error("memory limit exceeded: provider {0}")]
    MemoryExceeded(String),

    #[error("call timeout: provider {0}")]
    CallTimeout(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("semver error: {0}")]
    Semver(#[from] semver::Error),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Http(err.to_string())
    }
}
