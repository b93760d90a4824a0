//! Per-guild module enablement checks.
//!
//! Enablement storage belongs to the embedding bot; the engine only needs a
//! yes/no answer per (guild, module).

use std::sync::Arc;

use async_trait::async_trait;

// Traits.

/// Generic module-enablement gate that hosts must implement.
#[async_trait]
pub trait GenericModuleGate {
    /// Whether the named module is enabled for the guild.
    async fn is_module_enabled(&self, guild_id: u64, module: &str) -> bool;
}

// Structs.

/// Module gate for the application.
///
/// This is trivially cloneable and can be passed around without the need for
/// `Arc` or `Mutex`.
#[derive(Clone)]
pub struct ModuleGate {
    inner: Arc<dyn GenericModuleGate + Send + Sync + 'static>,
}

impl std::ops::Deref for ModuleGate {
    type Target = dyn GenericModuleGate + Send + Sync + 'static;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl ModuleGate {
    pub fn new(inner: Arc<dyn GenericModuleGate + Send + Sync + 'static>) -> Self {
        Self { inner }
    }

    /// Gate that treats every module as enabled.
    pub fn allow_all() -> Self {
        Self { inner: Arc::new(AllowAllGate) }
    }
}

// Specific implementations.

struct AllowAllGate;

#[async_trait]
impl GenericModuleGate for AllowAllGate {
    async fn is_module_enabled(&self, _guild_id: u64, _module: &str) -> bool {
        true
    }
}
