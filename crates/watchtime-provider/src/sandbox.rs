//! WASM provider sandbox using Extism (wasmtime).
//!
//! Each provider runs in its own isolated WASM sandbox with a memory limit,
//! a fuel-based execution limit, and a call deadline. WASI is always off:
//! providers cannot see env vars, the filesystem, or stdio, and HTTP is
//! granted only to the hostnames the provider's manifest declares.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use watchtime_search::{RawResult, SearchOptions};

use crate::error::ProviderError;

// ─── Configuration ──────────────────────────────────────────────────

/// Configuration for the WASM sandbox.
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Maximum memory in bytes (default: 32 MB).
    pub memory_limit: usize,
    /// Maximum fuel (instructions) per execution (default: 1_000_000).
    pub fuel_limit: u64,
    /// Hard deadline per call in seconds (default: 30).
    pub call_timeout_secs: u64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            memory_limit: 32 * 1024 * 1024,
            fuel_limit: 1_000_000,
            call_timeout_secs: 30,
        }
    }
}

impl SandboxConfig {
    /// Build config from environment variables.
    pub fn from_env() -> Self {
        Self {
            memory_limit: std::env::var("PROVIDER_MEMORY_LIMIT_MB")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(32)
                * 1024
                * 1024,
            fuel_limit: std::env::var("PROVIDER_FUEL_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1_000_000),
            call_timeout_secs: std::env::var("PROVIDER_CALL_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
        }
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

// ─── Call payloads ──────────────────────────────────────────────────

/// Input for the three search entry points: the query plus the provider's
/// user options map.
#[derive(Serialize)]
struct SearchCallInput<'a> {
    options: &'a SearchOptions,
    config: &'a serde_json::Value,
}

/// Input for the NZB `query` entry point.
#[derive(Serialize)]
struct QueryCallInput<'a> {
    hash: &'a str,
    config: &'a serde_json::Value,
}

/// `query` returns `{nzb}` or JSON null.
#[derive(Deserialize)]
struct QueryCallOutput {
    nzb: String,
}

// ─── Sandbox ────────────────────────────────────────────────────────

/// A loaded WASM provider sandbox.
///
/// Wraps an Extism plugin built from a validated source blob. Calls are
/// synchronous; async access goes through the worker in `host`.
pub struct ProviderSandbox {
    plugin: extism::Plugin,
    provider_id: String,
}

impl std::fmt::Debug for ProviderSandbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSandbox")
            .field("provider_id", &self.provider_id)
            .finish_non_exhaustive()
    }
}

impl ProviderSandbox {
    /// Build a sandbox from validated source bytes.
    ///
    /// Memory is capped in 64 KB pages, fuel limits instruction count per
    /// call, and the manifest timeout backstops the host-side call deadline.
    pub fn from_bytes(
        wasm_bytes: Vec<u8>,
        allowed_hosts: &[String],
        config: &SandboxConfig,
        id: &str,
    ) -> Result<Self, ProviderError> {
        let mut manifest = extism::Manifest::new([extism::Wasm::data(wasm_bytes)])
            .with_memory_max((config.memory_limit / 65536) as u32)
            .with_timeout(config.call_timeout());

        if !allowed_hosts.is_empty() {
            manifest = manifest.with_allowed_hosts(allowed_hosts.iter().cloned());
        }

        let plugin = extism::PluginBuilder::new(manifest)
            .with_wasi(false)
            .with_fuel_limit(config.fuel_limit)
            .build()
            .map_err(|e| ProviderError::Sandbox(e.to_string()))?;

        Ok(Self {
            plugin,
            provider_id: id.to_string(),
        })
    }

    pub fn id(&self) -> &str {
        &self.provider_id
    }

    /// Call a WASM function by name with raw byte input/output.
    ///
    /// Fuel is reset per call via the builder's fuel limit. Errors are
    /// classified into fuel exhaustion, memory exceeded, or general sandbox
    /// errors.
    fn call(&mut self, function_name: &str, input: &[u8]) -> Result<Vec<u8>, ProviderError> {
        self.plugin
            .call::<&[u8], Vec<u8>>(function_name, input)
            .map_err(|e| {
                let msg = e.to_string();
                if msg.contains("fuel") {
                    ProviderError::FuelExhausted(self.provider_id.clone())
                } else if msg.contains("memory") {
                    ProviderError::MemoryExceeded(self.provider_id.clone())
                } else {
                    ProviderError::Sandbox(msg)
                }
            })
    }

    fn search_call(
        &mut self,
        entry_point: &str,
        options: &SearchOptions,
        user_config: &serde_json::Value,
    ) -> Result<Vec<RawResult>, ProviderError> {
        let input = serde_json::to_vec(&SearchCallInput {
            options,
            config: user_config,
        })?;
        let output = self.call(entry_point, &input)?;
        if output.is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_slice(&output)?)
    }

    pub fn single(
        &mut self,
        options: &SearchOptions,
        user_config: &serde_json::Value,
    ) -> Result<Vec<RawResult>, ProviderError> {
        self.search_call("single", options, user_config)
    }

    pub fn movie(
        &mut self,
        options: &SearchOptions,
        user_config: &serde_json::Value,
    ) -> Result<Vec<RawResult>, ProviderError> {
        self.search_call("movie", options, user_config)
    }

    pub fn batch(
        &mut self,
        options: &SearchOptions,
        user_config: &serde_json::Value,
    ) -> Result<Vec<RawResult>, ProviderError> {
        self.search_call("batch", options, user_config)
    }

    /// NZB lookup by infohash. Returns the NZB download URL, or `None` when
    /// the provider answers null or nothing.
    pub fn query(
        &mut self,
        hash: &str,
        user_config: &serde_json::Value,
    ) -> Result<Option<String>, ProviderError> {
        let input = serde_json::to_vec(&QueryCallInput {
            hash,
            config: user_config,
        })?;
        let output = self.call("query", &input)?;
        if output.is_empty() {
            return Ok(None);
        }
        let parsed: Option<QueryCallOutput> = serde_json::from_slice(&output)?;
        Ok(parsed.map(|o| o.nzb))
    }

    /// Load-time health check. Success is the call returning without a trap;
    /// any output is ignored.
    pub fn self_test(&mut self) -> Result<(), ProviderError> {
        self.call("test", b"")?;
        Ok(())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
