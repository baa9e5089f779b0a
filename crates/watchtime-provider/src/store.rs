//! Provider source blob store.
//!
//! Caches each provider's WASM binary on disk, keyed by provider id. Blobs
//! are fetched from the manifest's source URL on first load and deleted on
//! version change or removal. Every byte handed to the sandbox passes the
//! same checks: size cap, magic bytes, and an import-namespace allowlist.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ProviderError;

// ─── Constants ──────────────────────────────────────────────────────

/// WASM magic bytes: `\0asm`
const WASM_MAGIC: &[u8; 4] = b"\0asm";

/// Default max WASM binary size: 50 MB.
const DEFAULT_MAX_WASM_SIZE_MB: u64 = 50;

/// Default source fetch timeout in seconds.
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Allowed WASM import namespaces. Imports outside these are rejected.
/// The sandbox runs with WASI disabled, so WASI namespaces are not listed.
const ALLOWED_IMPORT_NAMESPACES: &[&str] = &[
    "env",             // Extism host functions
    "extism:host/env", // Extism host functions (component model)
];

// ─── Store ──────────────────────────────────────────────────────────

/// Durable blob store for provider sources, one `<id>.wasm` file per
/// provider. Ids are pre-validated to a filename-safe alphabet by manifest
/// validation.
pub struct SourceStore {
    blob_dir: PathBuf,
    max_wasm_size: u64,
    client: reqwest::Client,
}

impl SourceStore {
    pub fn new(
        blob_dir: impl Into<PathBuf>,
        max_wasm_size_mb: u64,
        http_timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder().timeout(http_timeout).build()?;
        Ok(Self {
            blob_dir: blob_dir.into(),
            max_wasm_size: max_wasm_size_mb * 1024 * 1024,
            client,
        })
    }

    /// Create a store with configuration from environment.
    pub fn from_env() -> Result<Self, ProviderError> {
        let blob_dir =
            std::env::var("PROVIDER_DIR").unwrap_or_else(|_| "/data/providers".to_string());
        let max_wasm_size_mb = std::env::var("PROVIDER_MAX_WASM_MB")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_MAX_WASM_SIZE_MB);
        let http_timeout_secs = std::env::var("PROVIDER_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS);

        Self::new(
            blob_dir,
            max_wasm_size_mb,
            Duration::from_secs(http_timeout_secs),
        )
    }

    /// The store's HTTP client, shared with config fetches so every remote
    /// request carries the same timeout.
    pub(crate) fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn blob_path(&self, id: &str) -> PathBuf {
        self.blob_dir.join(format!("{id}.wasm"))
    }

    /// Return the provider's source bytes, fetching from `source_url` only
    /// when no valid cached blob exists. A cached blob that fails validation
    /// is treated as a miss and refetched.
    pub async fn load(&self, id: &str, source_url: &str) -> Result<Vec<u8>, ProviderError> {
        let path = self.blob_path(id);
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                if self.validate_wasm_bytes(&bytes).is_ok() {
                    return Ok(bytes);
                }
                tracing::warn!(provider = %id, "cached source blob failed validation, refetching");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.fetch_and_store(id, source_url).await
    }

    /// Fetch the source over HTTP, validate it, and persist the blob.
    pub async fn fetch_and_store(
        &self,
        id: &str,
        source_url: &str,
    ) -> Result<Vec<u8>, ProviderError> {
        tracing::info!(provider = %id, url = %source_url, "fetching provider source");

        let response = self
            .client
            .get(source_url)
            .send()
            .await?
            .error_for_status()?;
        let bytes = response.bytes().await?.to_vec();

        self.validate_wasm_bytes(&bytes)?;

        tokio::fs::create_dir_all(&self.blob_dir).await?;
        tokio::fs::write(self.blob_path(id), &bytes).await?;

        tracing::debug!(provider = %id, size = bytes.len(), "provider source cached");
        Ok(bytes)
    }

    /// Delete the cached blob for a provider. Missing blobs are fine.
    pub async fn remove(&self, id: &str) -> Result<(), ProviderError> {
        match tokio::fs::remove_file(self.blob_path(id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Validate WASM source bytes.
    ///
    /// Checks:
    /// 1. Size within limits
    /// 2. Magic bytes (0x00 0x61 0x73 0x6D = "\0asm")
    /// 3. Import analysis: only allowed namespaces
    fn validate_wasm_bytes(&self, wasm_bytes: &[u8]) -> Result<(), ProviderError> {
        let size = wasm_bytes.len() as u64;
        if size > self.max_wasm_size {
            return Err(ProviderError::WasmValidation(format!(
                "WASM binary too large: {} bytes (max: {} bytes)",
                size, self.max_wasm_size
            )));
        }

        if wasm_bytes.len() < 4 || &wasm_bytes[..4] != WASM_MAGIC {
            return Err(ProviderError::WasmValidation(
                "invalid WASM binary: magic bytes mismatch".into(),
            ));
        }

        validate_wasm_imports(wasm_bytes)
    }
}

/// Validate WASM imports against the allowed namespace list.
fn validate_wasm_imports(wasm_bytes: &[u8]) -> Result<(), ProviderError> {
    use wasmparser::{Parser, Payload};

    let parser = Parser::new(0);

    for payload in parser.parse_all(wasm_bytes) {
        let payload = payload
            .map_err(|e| ProviderError::WasmValidation(format!("failed to parse WASM: {e}")))?;

        if let Payload::ImportSection(reader) = payload {
            for import in reader {
                let import = import.map_err(|e| {
                    ProviderError::WasmValidation(format!("failed to read import: {e}"))
                })?;

                let module = import.module;
                if !ALLOWED_IMPORT_NAMESPACES.contains(&module) {
                    return Err(ProviderError::WasmValidation(format!(
                        "unauthorized import namespace: '{}' (function: '{}'); \
                         allowed namespaces: {:?}",
                        module, import.name, ALLOWED_IMPORT_NAMESPACES
                    )));
                }
            }
        }
    }

    Ok(())
}

// ─── Tests ──────────────────────────────────────────────────────────
