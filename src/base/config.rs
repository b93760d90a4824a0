//! Load configuration via `config` crate with env-override support.

use std::{
    ops::Deref,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::Deserialize;

use super::types::Res;

/// Default root for managed bot data.
fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

/// Default maximum length for sanitized response text.
fn default_max_response_chars() -> usize {
    1500
}

/// Configuration for the responder application.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub inner: Arc<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ConfigInner {
    /// Root directory for managed bot data, including response attachments
    /// (`GUILD_RESPONDER_DATA_DIR`).
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Directory holding per-guild responder documents
    /// (`GUILD_RESPONDER_GUILD_CONFIG_DIR`). Defaults to `<data_dir>/config.guild`.
    #[serde(default)]
    pub guild_config_dir: Option<PathBuf>,
    /// Maximum length of sanitized response text before truncation
    /// (`GUILD_RESPONDER_MAX_RESPONSE_CHARS`).
    #[serde(default = "default_max_response_chars")]
    pub max_response_chars: usize,
}

impl Config {
    pub fn load(explicit_path: Option<&Path>) -> Res<Self> {
        let mut cfg = config::Config::builder().add_source(config::Environment::default().prefix("GUILD_RESPONDER"));

        if let Some(p) = explicit_path {
            cfg = cfg.add_source(config::File::from(p.to_path_buf()));
        } else if Path::new(".hidden/config.toml").exists() {
            cfg = cfg.add_source(config::File::with_name(".hidden/config.toml"));
        }

        let result = Config {
            inner: Arc::new(cfg.build()?.try_deserialize()?),
        };

        if result.max_response_chars < 8 || result.max_response_chars > 4000 {
            return Err(anyhow::anyhow!("Max response chars must be between 8 and 4000."));
        }

        Ok(result)
    }

    /// Directory containing per-guild responder documents.
    pub fn guild_config_dir(&self) -> PathBuf {
        self.guild_config_dir.clone().unwrap_or_else(|| self.data_dir.join("config.guild"))
    }
}
