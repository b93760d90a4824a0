//! Auto-responder engine: entry point and orchestration.
//!
//! Ties config loading, matching, responder invocation, and delivery
//! together per incoming message. Nothing in this pipeline propagates an
//! error past [`Engine::handle_incoming_message`]; misconfigured triggers
//! degrade to "message not handled".

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{Instrument, debug, instrument, warn};

use crate::{
    base::{
        config::Config,
        settings::{SettingsMap, TriggerSettings, merge_settings},
        types::{CooldownScope, IncomingMessage},
    },
    service::{host::HostClient, modules::ModuleGate, storage::ConfigStore},
};

use super::{
    config_loader::{ConfigCache, TriggerSpec, extract_config, normalize_trigger_items},
    delivery::{coerce_responses, send_response},
    matching::{check_input_limits, extract_input_text, match_trigger, passes_filters, strip_bot_mention_prefix},
    registry::{ResponderInput, ResponderRegistry},
};

/// Module name checked against the per-guild enablement gate.
pub const MODULE_NAME: &str = "autoresponder";

const COOLDOWN_SWEEP_THRESHOLD: usize = 1000;
const COOLDOWN_MAX_AGE: Duration = Duration::from_secs(3600);

/// (guild id, trigger text, actor id or 0 for guild scope).
type CooldownKey = (u64, String, u64);

/// Mutable engine state shared across concurrently processed messages.
#[derive(Default)]
pub struct EngineState {
    cooldowns: Mutex<HashMap<CooldownKey, Instant>>,
    config_cache: ConfigCache,
}

/// Main engine for processing auto-responses.
pub struct Engine {
    config: Config,
    host: HostClient,
    store: ConfigStore,
    modules: ModuleGate,
    registry: ResponderRegistry,
    state: EngineState,
}

/// Process a message on its own task; outcomes are logged, never returned.
#[instrument(skip_all)]
pub fn handle_message(engine: Arc<Engine>, message: IncomingMessage) {
    tokio::spawn(
        async move {
            let handled = engine.handle_incoming_message(&message).await;
            if !handled {
                debug!("Message {} produced no response.", message.id);
            }
        }
        .in_current_span(),
    );
}

impl Engine {
    pub fn new(config: Config, host: HostClient, store: ConfigStore, modules: ModuleGate, registry: ResponderRegistry) -> Self {
        Self {
            config,
            host,
            store,
            modules,
            registry,
            state: EngineState::default(),
        }
    }

    pub fn registry(&self) -> &ResponderRegistry {
        &self.registry
    }

    /// Main entry point: process one message, returning whether any trigger
    /// produced a delivered response.
    #[instrument(skip_all, fields(message_id = message.id))]
    pub async fn handle_incoming_message(&self, message: &IncomingMessage) -> bool {
        let Some(guild_id) = message.guild_id else {
            return false;
        };
        if message.author_is_bot {
            return false;
        }
        if !self.modules.is_module_enabled(guild_id, MODULE_NAME).await {
            return false;
        }

        let content = message.content.as_str();
        if content.trim().is_empty() {
            return false;
        }

        let data = self.state.config_cache.load(&self.store, guild_id).await;
        let (triggers, global_settings) = extract_config(&data);
        let items = normalize_trigger_items(&triggers, &global_settings);
        if items.is_empty() {
            return false;
        }

        let bot_user_id = self.host.bot_user_id();
        let global_snapshot = TriggerSettings::from_map(&global_settings);
        let (stripped_content, mention_prefixed) = strip_bot_mention_prefix(content, message, bot_user_id, &global_snapshot);

        for spec in &items {
            if !passes_filters(message, bot_user_id, &spec.settings) {
                continue;
            }

            let mut matched_content = content;
            let mut span = match_trigger(content, &spec.trigger, &spec.settings);

            // `@bot trigger text` should behave like `trigger text`.
            if span.is_none() && mention_prefixed {
                span = match_trigger(&stripped_content, &spec.trigger, &spec.settings);
                if span.is_some() {
                    matched_content = stripped_content.as_str();
                }
            }

            let Some(span) = span else {
                continue;
            };

            let input_text = extract_input_text(matched_content, Some(span), &spec.settings);
            if !check_input_limits(&input_text, &spec.settings) {
                continue;
            }

            // Checking is also the act of starting the cooldown window: a
            // trigger that matches but produces no response still consumes it.
            if !self.check_cooldown(message, &spec.trigger, &spec.settings) {
                continue;
            }

            let (response, overrides) = self.resolve_response(spec, message, &input_text, content).await;
            let Some(response) = response else {
                continue;
            };

            let final_map = merge_settings(&[&spec.settings_map, &overrides]);
            let final_settings = TriggerSettings::from_map(&final_map);

            let mut handled = false;
            for item in coerce_responses(&response) {
                let sent = send_response(&self.host, &self.config, message, &item, &final_settings).await;
                handled = handled || sent;
            }

            if handled && final_settings.delete_trigger_message {
                let _ = self.host.delete_message(message.channel_id, message.id).await;
            }

            if handled {
                return true;
            }
        }

        false
    }

    /// Resolve the response for a matched spec: handler output wins, the
    /// static response is the fallback. Handler failures degrade to nothing.
    async fn resolve_response(&self, spec: &TriggerSpec, message: &IncomingMessage, input_text: &str, raw: &str) -> (Option<Value>, SettingsMap) {
        let mut response: Option<Value> = None;
        let mut overrides = SettingsMap::new();

        if let Some(path) = &spec.handler {
            if let Some(responder) = self.registry.resolve(path) {
                let input = ResponderInput {
                    message: message.clone(),
                    command: spec.trigger.clone(),
                    text: input_text.to_string(),
                    args: input_text.split_whitespace().map(str::to_string).collect(),
                    raw: raw.to_string(),
                    settings: spec.settings_map.clone(),
                };

                match responder.run(&input).await {
                    Ok(reply) => {
                        response = reply.response;
                        overrides = reply.settings;
                        if let Some(targets) = reply.targets {
                            overrides.insert("response_targets".to_string(), Value::from(targets));
                        }
                    }
                    Err(err) => {
                        warn!("Handler {} raised: {}", path, err);
                    }
                }
            } else {
                warn!("Handler {} did not resolve.", path);
            }
        }

        if response.is_none() {
            response = spec.response.clone();
        }

        (response, overrides)
    }

    fn check_cooldown(&self, message: &IncomingMessage, trigger: &str, settings: &TriggerSettings) -> bool {
        if settings.cooldown_seconds <= 0.0 {
            return true;
        }

        let guild_id = message.guild_id.unwrap_or(0);
        let actor = match settings.cooldown_scope {
            CooldownScope::Guild => 0,
            CooldownScope::User => message.author_id,
        };
        let key = (guild_id, trigger.to_string(), actor);
        let now = Instant::now();

        let mut cooldowns = self.state.cooldowns.lock();
        if let Some(last) = cooldowns.get(&key)
            && now.duration_since(*last).as_secs_f64() < settings.cooldown_seconds
        {
            return false;
        }
        cooldowns.insert(key, now);

        // Lazy sweep, not a hard TTL index.
        if cooldowns.len() > COOLDOWN_SWEEP_THRESHOLD {
            cooldowns.retain(|_, stamp| now.duration_since(*stamp) <= COOLDOWN_MAX_AGE);
        }

        true
    }

    /// Clear all cooldowns for a guild.
    pub fn clear_guild_cooldowns(&self, guild_id: u64) {
        self.state.cooldowns.lock().retain(|key, _| key.0 != guild_id);
    }

    /// Clear all cooldowns.
    pub fn clear_all_cooldowns(&self) {
        self.state.cooldowns.lock().clear();
    }

    /// Drop resolved responder instances so factories run again.
    pub fn clear_handler_cache(&self) {
        self.registry.clear_resolved();
    }

    /// Drop the cached responder document for a guild.
    pub fn clear_guild_config_cache(&self, guild_id: u64) {
        self.state.config_cache.clear_guild(guild_id);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::base::config::ConfigInner;

    use super::*;

    fn test_engine() -> Engine {
        let config = Config { inner: Arc::new(ConfigInner::default()) };
        Engine::new(
            config,
            HostClient::console(),
            ConfigStore::filesystem("nonexistent".into()),
            ModuleGate::allow_all(),
            ResponderRegistry::with_builtins(),
        )
    }

    fn message(guild_id: u64, author_id: u64) -> IncomingMessage {
        IncomingMessage {
            guild_id: Some(guild_id),
            author_id,
            ..IncomingMessage::default()
        }
    }

    fn cooldown_settings(scope: CooldownScope) -> TriggerSettings {
        TriggerSettings {
            cooldown_seconds: 60.0,
            cooldown_scope: scope,
            ..TriggerSettings::default()
        }
    }

    #[test]
    fn user_scope_cooldowns_are_per_author() {
        let engine = test_engine();
        let settings = cooldown_settings(CooldownScope::User);

        assert!(engine.check_cooldown(&message(1, 10), "!hi", &settings));
        assert!(!engine.check_cooldown(&message(1, 10), "!hi", &settings));
        assert!(engine.check_cooldown(&message(1, 11), "!hi", &settings));
    }

    #[test]
    fn guild_scope_cooldowns_are_shared() {
        let engine = test_engine();
        let settings = cooldown_settings(CooldownScope::Guild);

        assert!(engine.check_cooldown(&message(1, 10), "!hi", &settings));
        assert!(!engine.check_cooldown(&message(1, 11), "!hi", &settings));
        assert!(engine.check_cooldown(&message(2, 10), "!hi", &settings));
    }

    #[test]
    fn zero_cooldown_never_blocks() {
        let engine = test_engine();
        let settings = TriggerSettings::default();

        assert!(engine.check_cooldown(&message(1, 10), "!hi", &settings));
        assert!(engine.check_cooldown(&message(1, 10), "!hi", &settings));
    }

    #[test]
    fn clears_scope_to_the_requested_guild() {
        let engine = test_engine();
        let settings = cooldown_settings(CooldownScope::User);

        engine.check_cooldown(&message(1, 10), "!hi", &settings);
        engine.check_cooldown(&message(2, 10), "!hi", &settings);

        engine.clear_guild_cooldowns(1);
        assert!(engine.check_cooldown(&message(1, 10), "!hi", &settings));
        assert!(!engine.check_cooldown(&message(2, 10), "!hi", &settings));

        engine.clear_all_cooldowns();
        assert!(engine.check_cooldown(&message(2, 10), "!hi", &settings));
    }
}
