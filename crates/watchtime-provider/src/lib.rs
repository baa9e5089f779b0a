//! WatchTime Provider Runtime
//!
//! WASM-based provider runtime using Extism (wasmtime) for sandboxed
//! execution. Providers are imported from published JSON configs, run in
//! isolated sandboxes with memory and fuel limits, and answer search and
//! NZB queries over a capability-limited call boundary.

pub mod error;
pub mod events;
pub mod host;
pub mod import;
pub mod manifest;
pub mod registry;
pub mod sandbox;
pub mod store;
pub mod update;

pub use error::ProviderError;
pub use events::RegistryEvent;
pub use host::SandboxHandle;
pub use manifest::ProviderManifest;
pub use registry::ProviderRegistry;
pub use sandbox::{ProviderSandbox, SandboxConfig};
pub use store::SourceStore;
pub use update::spawn_update_worker;
