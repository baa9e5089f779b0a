//! Async access to sandboxed providers.
//!
//! An extism plugin is single-threaded mutable state, so every loaded
//! provider gets one dedicated worker thread that owns its sandbox for its
//! whole life. The cloneable [`SandboxHandle`] sends commands over a channel
//! and awaits replies under a deadline, which keeps a hung plugin call from
//! ever stalling the async runtime.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;

use watchtime_search::{ProviderCaller, RawResult, SearchError, SearchOptions};

use crate::error::ProviderError;
use crate::sandbox::{ProviderSandbox, SandboxConfig};

// ─── Worker protocol ────────────────────────────────────────────────

enum SandboxCommand {
    Single {
        options: SearchOptions,
        user_config: serde_json::Value,
        respond: oneshot::Sender<Result<Vec<RawResult>, ProviderError>>,
    },
    Movie {
        options: SearchOptions,
        user_config: serde_json::Value,
        respond: oneshot::Sender<Result<Vec<RawResult>, ProviderError>>,
    },
    Batch {
        options: SearchOptions,
        user_config: serde_json::Value,
        respond: oneshot::Sender<Result<Vec<RawResult>, ProviderError>>,
    },
    Query {
        hash: String,
        user_config: serde_json::Value,
        respond: oneshot::Sender<Result<Option<String>, ProviderError>>,
    },
    SelfTest {
        respond: oneshot::Sender<Result<(), ProviderError>>,
    },
    Shutdown,
}

fn worker_loop(
    id: String,
    wasm_bytes: Vec<u8>,
    allowed_hosts: Vec<String>,
    sandbox_config: SandboxConfig,
    commands: mpsc::Receiver<SandboxCommand>,
    ready: oneshot::Sender<Result<(), ProviderError>>,
) {
    let mut sandbox =
        match ProviderSandbox::from_bytes(wasm_bytes, &allowed_hosts, &sandbox_config, &id) {
            Ok(sandbox) => {
                let _ = ready.send(Ok(()));
                sandbox
            }
            Err(e) => {
                let _ = ready.send(Err(e));
                return;
            }
        };

    // Callers that timed out drop their receiver; those sends are ignored.
    while let Ok(command) = commands.recv() {
        match command {
            SandboxCommand::Single {
                options,
                user_config,
                respond,
            } => {
                let _ = respond.send(sandbox.single(&options, &user_config));
            }
            SandboxCommand::Movie {
                options,
                user_config,
                respond,
            } => {
                let _ = respond.send(sandbox.movie(&options, &user_config));
            }
            SandboxCommand::Batch {
                options,
                user_config,
                respond,
            } => {
                let _ = respond.send(sandbox.batch(&options, &user_config));
            }
            SandboxCommand::Query {
                hash,
                user_config,
                respond,
            } => {
                let _ = respond.send(sandbox.query(&hash, &user_config));
            }
            SandboxCommand::SelfTest { respond } => {
                let _ = respond.send(sandbox.self_test());
            }
            SandboxCommand::Shutdown => break,
        }
    }

    tracing::debug!(provider = %id, "sandbox worker stopped");
}

// ─── Handle ─────────────────────────────────────────────────────────

/// Cloneable async handle to one provider's sandbox worker.
///
/// Dropping every handle ends the worker; [`SandboxHandle::shutdown`] ends
/// it eagerly. A call that outlives the deadline returns `CallTimeout`; the
/// sandbox's own manifest deadline then traps the in-flight call so the
/// worker can drain its queue.
#[derive(Clone)]
pub struct SandboxHandle {
    id: String,
    sender: mpsc::Sender<SandboxCommand>,
    call_timeout: Duration,
}

impl std::fmt::Debug for SandboxHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SandboxHandle")
            .field("id", &self.id)
            .field("call_timeout", &self.call_timeout)
            .finish_non_exhaustive()
    }
}

impl SandboxHandle {
    /// Spawn the worker thread and build the plugin on it. Construction
    /// failures surface here, before a handle exists.
    pub async fn spawn(
        id: String,
        wasm_bytes: Vec<u8>,
        allowed_hosts: Vec<String>,
        sandbox_config: SandboxConfig,
    ) -> Result<Self, ProviderError> {
        let (sender, receiver) = mpsc::channel();
        let (ready_tx, ready_rx) = oneshot::channel();
        let call_timeout = sandbox_config.call_timeout();

        let worker_id = id.clone();
        thread::Builder::new()
            .name(format!("provider-{id}"))
            .spawn(move || {
                worker_loop(
                    worker_id,
                    wasm_bytes,
                    allowed_hosts,
                    sandbox_config,
                    receiver,
                    ready_tx,
                )
            })?;

        match ready_rx.await {
            Ok(Ok(())) => Ok(Self {
                id,
                sender,
                call_timeout,
            }),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(ProviderError::Sandbox(
                "sandbox worker exited during startup".into(),
            )),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Tell the worker to drop the plugin and exit. Fire-and-forget.
    pub fn shutdown(&self) {
        let _ = self.sender.send(SandboxCommand::Shutdown);
    }

    /// Load-time health check through the worker.
    pub async fn self_test(&self) -> Result<(), ProviderError> {
        self.request(|respond| SandboxCommand::SelfTest { respond })
            .await
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<Result<T, ProviderError>>) -> SandboxCommand,
    ) -> Result<T, ProviderError> {
        let (respond, reply) = oneshot::channel();
        self.sender.send(command(respond)).map_err(|_| {
            ProviderError::Sandbox(format!("sandbox worker for '{}' is gone", self.id))
        })?;

        match tokio::time::timeout(self.call_timeout, reply).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(ProviderError::Sandbox(format!(
                "sandbox worker for '{}' dropped the call",
                self.id
            ))),
            Err(_) => Err(ProviderError::CallTimeout(self.id.clone())),
        }
    }

    async fn search_request(
        &self,
        options: &SearchOptions,
        user_config: &serde_json::Value,
        make: fn(
            SearchOptions,
            serde_json::Value,
            oneshot::Sender<Result<Vec<RawResult>, ProviderError>>,
        ) -> SandboxCommand,
    ) -> Result<Vec<RawResult>, ProviderError> {
        let options = options.clone();
        let user_config = user_config.clone();
        self.request(move |respond| make(options, user_config, respond))
            .await
    }
}

#[async_trait]
impl ProviderCaller for SandboxHandle {
    async fn single(
        &self,
        query: &SearchOptions,
        config: &serde_json::Value,
    ) -> Result<Vec<RawResult>, SearchError> {
        self.search_request(query, config, |options, user_config, respond| {
            SandboxCommand::Single {
                options,
                user_config,
                respond,
            }
        })
        .await
        .map_err(|e| SearchError::Provider(e.to_string()))
    }

    async fn movie(
        &self,
        query: &SearchOptions,
        config: &serde_json::Value,
    ) -> Result<Vec<RawResult>, SearchError> {
        self.search_request(query, config, |options, user_config, respond| {
            SandboxCommand::Movie {
                options,
                user_config,
                respond,
            }
        })
        .await
        .map_err(|e| SearchError::Provider(e.to_string()))
    }

    async fn batch(
        &self,
        query: &SearchOptions,
        config: &serde_json::Value,
    ) -> Result<Vec<RawResult>, SearchError> {
        self.search_request(query, config, |options, user_config, respond| {
            SandboxCommand::Batch {
                options,
                user_config,
                respond,
            }
        })
        .await
        .map_err(|e| SearchError::Provider(e.to_string()))
    }

    async fn nzb_query(
        &self,
        hash: &str,
        config: &serde_json::Value,
    ) -> Result<Option<String>, SearchError> {
        let hash = hash.to_string();
        let user_config = config.clone();
        self.request(move |respond| SandboxCommand::Query {
            hash,
            user_config,
            respond,
        })
        .await
        .map_err(|e| SearchError::Provider(e.to_string()))
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
