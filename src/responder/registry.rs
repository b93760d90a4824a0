//! Pluggable responders.
//!
//! A responder is a small capability: given the matched input, produce a
//! reply. Responders are registered at startup under dotted paths inside
//! the trusted `responders` namespace; config documents reference them by
//! `module.attr` or `module:attr` path. Resolution is a registry lookup,
//! with resolved instances cached lazily and rebuilt from their factories
//! after an explicit cache clear.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use crate::base::{
    settings::SettingsMap,
    types::{IncomingMessage, Res},
};

/// Trusted namespace all handler paths resolve under.
pub const HANDLER_NAMESPACE: &str = "responders";

/// Per-invocation payload handed to a responder.
#[derive(Debug, Clone)]
pub struct ResponderInput {
    pub message: IncomingMessage,
    /// The matched trigger text.
    pub command: String,
    /// Input text extracted after the trigger, trimmed.
    pub text: String,
    /// Whitespace-tokenized view of `text`.
    pub args: Vec<String>,
    /// The original message content.
    pub raw: String,
    /// Fully merged settings mapping for the matched trigger.
    pub settings: SettingsMap,
}

/// What a responder hands back: an optional response value plus optional
/// per-invocation delivery overrides.
#[derive(Debug, Clone, Default)]
pub struct HandlerReply {
    pub response: Option<Value>,
    /// Settings overlay merged on top of the trigger's settings.
    pub settings: SettingsMap,
    /// Overrides `response_targets` when set.
    pub targets: Option<Vec<String>>,
}

impl HandlerReply {
    /// A reply carrying nothing; the engine falls back to the static response.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            response: Some(Value::String(text.into())),
            ..Self::default()
        }
    }

    pub fn value(value: Value) -> Self {
        Self { response: Some(value), ..Self::default() }
    }
}

// Traits.

/// Generic responder capability.
#[async_trait]
pub trait Responder: Send + Sync {
    /// Produce a reply for the matched input.
    async fn run(&self, input: &ResponderInput) -> Res<HandlerReply>;
}

/// Builds a fresh responder instance; invoked on first resolution and again
/// after the resolved cache is cleared.
pub type ResponderFactory = Arc<dyn Fn() -> Arc<dyn Responder> + Send + Sync>;

/// Normalize a handler path to its canonical dot form inside the trusted
/// namespace. Returns `None` for paths that cannot name a responder.
pub fn normalize_handler_path(path: &str) -> Option<String> {
    let raw = path.trim();
    if raw.is_empty() {
        return None;
    }

    let (module, attr) = if let Some((module, attr)) = raw.split_once(':') {
        (module.trim(), attr.trim())
    } else if let Some((module, attr)) = raw.rsplit_once('.') {
        (module.trim(), attr.trim())
    } else {
        return None;
    };

    if module.is_empty() || attr.is_empty() {
        return None;
    }

    let prefix = format!("{HANDLER_NAMESPACE}.");
    if module == HANDLER_NAMESPACE || module.starts_with(&prefix) {
        Some(format!("{module}.{attr}"))
    } else {
        Some(format!("{prefix}{module}.{attr}"))
    }
}

// Structs.

/// Registry of responder factories, keyed by canonical path.
pub struct ResponderRegistry {
    factories: RwLock<HashMap<String, ResponderFactory>>,
    resolved: Mutex<HashMap<String, Arc<dyn Responder>>>,
}

impl ResponderRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            factories: RwLock::new(HashMap::new()),
            resolved: Mutex::new(HashMap::new()),
        }
    }

    /// A registry pre-populated with the built-in responders.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        let builtins: [(&str, fn() -> Arc<dyn Responder>); 3] = [
            ("builtin.echo", || Arc::new(EchoResponder)),
            ("builtin.upper", || Arc::new(UpperResponder)),
            ("builtin.static", || Arc::new(StaticResponder)),
        ];
        for (path, factory) in builtins {
            let _ = registry.register(path, factory);
        }
        registry
    }

    /// Register a factory under a handler path.
    ///
    /// Returns the canonical path, or `None` when the path cannot name a
    /// responder.
    pub fn register<F>(&self, path: &str, factory: F) -> Option<String>
    where
        F: Fn() -> Arc<dyn Responder> + Send + Sync + 'static,
    {
        let canonical = normalize_handler_path(path)?;
        self.factories.write().insert(canonical.clone(), Arc::new(factory));
        Some(canonical)
    }

    /// Resolve a handler path to a responder instance.
    ///
    /// Instances are cached by canonical path; failures are never cached, so
    /// a path registered later resolves on the next message.
    pub fn resolve(&self, path: &str) -> Option<Arc<dyn Responder>> {
        let canonical = normalize_handler_path(path)?;

        if let Some(hit) = self.resolved.lock().get(&canonical) {
            return Some(hit.clone());
        }

        let factory = self.factories.read().get(&canonical)?.clone();
        let instance = factory();
        self.resolved.lock().insert(canonical, instance.clone());
        Some(instance)
    }

    /// Drop all resolved instances; factories re-run on next resolution.
    pub fn clear_resolved(&self) {
        self.resolved.lock().clear();
    }
}

impl Default for ResponderRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

// Built-in responders.

/// Replies with the extracted input text, or the raw content when empty.
pub struct EchoResponder;

#[async_trait]
impl Responder for EchoResponder {
    async fn run(&self, input: &ResponderInput) -> Res<HandlerReply> {
        let text = if input.text.is_empty() { input.raw.clone() } else { input.text.clone() };
        Ok(HandlerReply::text(text))
    }
}

/// Replies with the input text uppercased.
pub struct UpperResponder;

#[async_trait]
impl Responder for UpperResponder {
    async fn run(&self, input: &ResponderInput) -> Res<HandlerReply> {
        let text = if input.text.is_empty() { input.raw.as_str() } else { input.text.as_str() };
        Ok(HandlerReply::text(text.to_uppercase()))
    }
}

/// Replies with the trigger's configured `text` setting.
pub struct StaticResponder;

#[async_trait]
impl Responder for StaticResponder {
    async fn run(&self, input: &ResponderInput) -> Res<HandlerReply> {
        let text = input.settings.get("text").and_then(Value::as_str).unwrap_or("");
        Ok(HandlerReply::text(text))
    }
}
