//! Filesystem-backed storage for per-guild responder documents.
//!
//! The wider bot keeps one JSON document per guild; this service exposes the
//! two reads the config loader needs: the document itself and its
//! modification time (the cache key).

use std::{path::PathBuf, sync::Arc, time::SystemTime};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument, warn};

// Traits.

/// Generic responder-document store that hosts must implement.
#[async_trait]
pub trait GenericConfigStore {
    /// Modification time of the guild's document, or `None` when absent.
    async fn modified(&self, guild_id: u64) -> Option<SystemTime>;
    /// Read and parse the guild's document; `None` when absent or unreadable.
    async fn read(&self, guild_id: u64) -> Option<Value>;
}

// Structs.

/// Config store for the application.
///
/// This is trivially cloneable and can be passed around without the need for
/// `Arc` or `Mutex`.
#[derive(Clone)]
pub struct ConfigStore {
    inner: Arc<dyn GenericConfigStore + Send + Sync + 'static>,
}

impl std::ops::Deref for ConfigStore {
    type Target = dyn GenericConfigStore + Send + Sync + 'static;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl ConfigStore {
    pub fn new(inner: Arc<dyn GenericConfigStore + Send + Sync + 'static>) -> Self {
        Self { inner }
    }

    /// Creates a filesystem store rooted at the given directory.
    pub fn filesystem(dir: PathBuf) -> Self {
        Self { inner: Arc::new(FsConfigStore::new(dir)) }
    }
}

// Specific implementations.

/// Per-guild responder documents live at `<dir>/<guild_id>.autoresponder.json`.
const CONFIG_SUFFIX: &str = ".autoresponder.json";

/// Filesystem store implementation.
pub struct FsConfigStore {
    dir: PathBuf,
}

impl FsConfigStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path_for(&self, guild_id: u64) -> PathBuf {
        self.dir.join(format!("{guild_id}{CONFIG_SUFFIX}"))
    }
}

#[async_trait]
impl GenericConfigStore for FsConfigStore {
    async fn modified(&self, guild_id: u64) -> Option<SystemTime> {
        let metadata = tokio::fs::metadata(self.path_for(guild_id)).await.ok()?;
        metadata.modified().ok()
    }

    #[instrument(skip(self))]
    async fn read(&self, guild_id: u64) -> Option<Value> {
        let path = self.path_for(guild_id);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(err) => {
                debug!("No responder document for guild {}: {}", guild_id, err);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!("Malformed responder document {}: {}", path.display(), err);
                None
            }
        }
    }
}
