//! Runtime services and shared state for the responder.

use std::sync::Arc;

use tracing::instrument;

use crate::{
    base::{
        config::Config,
        types::{Res, Void},
    },
    responder::{engine::Engine, registry::ResponderRegistry},
    service::{
        host::{ConsoleHost, HostClient},
        modules::ModuleGate,
        storage::ConfigStore,
    },
};

/// Runtime service context that can be shared across the application.
///
/// This struct holds the host client, config store, module gate, and the
/// engine. It is designed to be trivially cloneable, allowing it to be
/// passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct Runtime {
    /// The configuration for the application.
    pub config: Config,
    /// The gateway host client instance.
    pub host: HostClient,
    /// The responder-document store instance.
    pub store: ConfigStore,
    /// The module-enablement gate instance.
    pub modules: ModuleGate,
    /// The auto-responder engine instance.
    pub engine: Arc<Engine>,
}

impl Runtime {
    /// Create a new runtime instance backed by the console host.
    #[instrument(skip_all)]
    pub async fn new(config: Config) -> Res<Self> {
        // Initialize the responder-document store.
        let store = ConfigStore::filesystem(config.guild_config_dir());

        // Initialize the module gate.
        let modules = ModuleGate::allow_all();

        // Initialize the console host and engine, then wire them together.
        let console = Arc::new(ConsoleHost::new());
        let host = HostClient::new(console.clone());

        let engine = Arc::new(Engine::new(config.clone(), host.clone(), store.clone(), modules.clone(), ResponderRegistry::with_builtins()));
        console.attach_engine(engine.clone());

        Ok(Self { config, host, store, modules, engine })
    }

    pub async fn start(&self) -> Void {
        self.host.start().await
    }
}
