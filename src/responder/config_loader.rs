//! Configuration loading for the auto-responder.
//!
//! Raw per-guild documents come from the config store; this module caches
//! them by modification time and normalizes them into ordered
//! [`TriggerSpec`] lists.

use std::{collections::HashMap, sync::Arc, time::SystemTime};

use parking_lot::Mutex;
use serde_json::{Map, Value};
use tracing::debug;

use crate::{
    base::settings::{SettingsMap, TriggerSettings, as_bool, default_settings_map, merge_settings},
    service::storage::ConfigStore,
};

/// One normalized trigger rule.
#[derive(Debug, Clone)]
pub struct TriggerSpec {
    pub trigger: String,
    pub handler: Option<String>,
    pub response: Option<Value>,
    /// Fully merged settings mapping, handed verbatim to handlers.
    pub settings_map: SettingsMap,
    /// Typed snapshot of `settings_map`.
    pub settings: TriggerSettings,
}

/// Extract triggers and global settings from a raw document.
///
/// Supports `{"triggers": {...}, "settings": {...}}` and the legacy shape
/// where the whole document is the trigger mapping.
pub fn extract_config(data: &Value) -> (Map<String, Value>, SettingsMap) {
    let Value::Object(doc) = data else {
        return (Map::new(), Map::new());
    };

    let (triggers, settings) = if doc.contains_key("triggers") || doc.contains_key("settings") {
        (doc.get("triggers"), doc.get("settings"))
    } else {
        return (doc.clone(), Map::new());
    };

    let triggers = match triggers {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    };
    let settings = match settings {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    };

    (triggers, settings)
}

fn handler_path(value: &Map<String, Value>) -> Option<String> {
    for key in ["handler", "class"] {
        if let Some(Value::String(raw)) = value.get(key) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}

/// Build a [`TriggerSpec`] from one trigger entry.
///
/// Returns `None` for disabled triggers and triggers with neither a handler
/// nor a response.
pub fn build_trigger_spec(trigger: &str, value: &Value, global_settings: &SettingsMap) -> Option<TriggerSpec> {
    let mut settings_map = merge_settings(&[&default_settings_map(), global_settings]);
    let mut handler: Option<String> = None;
    let mut response: Option<Value> = None;

    if let Value::Object(obj) = value {
        handler = handler_path(obj);

        if let Some(Value::Object(overlay)) = obj.get("settings") {
            settings_map = merge_settings(&[&settings_map, overlay]);
        }
        if let Some(Value::Object(overlay)) = obj.get("match") {
            settings_map = merge_settings(&[&settings_map, overlay]);
        }

        if let Some(enabled) = obj.get("enabled") {
            settings_map.insert("enabled".to_string(), Value::Bool(as_bool(Some(enabled), false)));
        }

        if let Some(configured) = obj.get("response") {
            if !configured.is_null() {
                response = Some(configured.clone());
            }
        } else if handler.is_none() {
            // Shorthand: the whole mapping is the literal response.
            response = Some(value.clone());
        }
    } else if !value.is_null() {
        response = Some(value.clone());
    }

    if !as_bool(settings_map.get("enabled"), true) {
        return None;
    }
    if handler.is_none() && response.is_none() {
        return None;
    }

    let settings = TriggerSettings::from_map(&settings_map);

    Some(TriggerSpec {
        trigger: trigger.to_string(),
        handler,
        response,
        settings_map,
        settings,
    })
}

/// Convert a raw trigger mapping to a sorted list of [`TriggerSpec`]s.
///
/// Sorted by trigger length, longest first, so the most specific trigger is
/// evaluated before shorter triggers sharing its prefix.
pub fn normalize_trigger_items(data: &Map<String, Value>, global_settings: &SettingsMap) -> Vec<TriggerSpec> {
    let mut items: Vec<TriggerSpec> = data
        .iter()
        .filter_map(|(key, value)| {
            let trigger = key.trim();
            if trigger.is_empty() {
                return None;
            }
            build_trigger_spec(trigger, value, global_settings)
        })
        .collect();

    items.sort_by(|a, b| b.trigger.chars().count().cmp(&a.trigger.chars().count()));
    items
}

#[derive(Clone)]
struct CachedDocument {
    mtime: Option<SystemTime>,
    data: Arc<Value>,
}

/// Mtime-keyed cache of raw guild documents.
///
/// A hit requires the live modification time to equal the cached one exactly,
/// including both being "file absent"; any drift replaces the entry wholesale.
#[derive(Default)]
pub struct ConfigCache {
    entries: Mutex<HashMap<u64, CachedDocument>>,
}

impl ConfigCache {
    /// Load a guild's responder document, via the cache.
    ///
    /// Absent or non-object documents load as an empty mapping.
    pub async fn load(&self, store: &ConfigStore, guild_id: u64) -> Arc<Value> {
        let mtime = store.modified(guild_id).await;

        if let Some(entry) = self.entries.lock().get(&guild_id)
            && entry.mtime == mtime
        {
            return entry.data.clone();
        }

        debug!("Reloading responder document for guild {}", guild_id);

        let data = store.read(guild_id).await.filter(Value::is_object).unwrap_or_else(|| Value::Object(Map::new()));
        let data = Arc::new(data);

        self.entries.lock().insert(guild_id, CachedDocument { mtime, data: data.clone() });

        data
    }

    /// Drop the cached document for a guild.
    pub fn clear_guild(&self, guild_id: u64) {
        self.entries.lock().remove(&guild_id);
    }

    /// Drop every cached document.
    pub fn clear_all(&self) {
        self.entries.lock().clear();
    }
}
