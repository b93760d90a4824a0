//! Response delivery for the auto-responder.
//!
//! Turns a raw response value into an [`OutboundMessage`] and sends it to
//! the configured targets (channel, reply, DM). Each target is attempted
//! independently; the overall result is true when any target succeeded.

use std::{
    path::{Component, Path},
    time::Duration,
};

use serde_json::Value;
use tracing::debug;

use crate::{
    base::{
        config::Config,
        settings::TriggerSettings,
        types::{AllowedMentions, Embed, FileSpec, IncomingMessage, OutboundMessage, ResponseTarget},
    },
    service::host::HostClient,
};

/// A response payload parsed from config or handler output.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseValue {
    Text(String),
    Rich {
        content: Option<String>,
        embeds: Vec<Embed>,
        files: Vec<FileSpec>,
    },
}

impl ResponseValue {
    /// Parse a raw value. Anything other than a string or mapping is
    /// undeliverable.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(text) => Some(Self::Text(text.clone())),
            Value::Object(map) => {
                let content = map.get("content").and_then(Value::as_str).map(str::to_string);
                let embeds = map.get("embed").or_else(|| map.get("embeds")).map(build_embeds).unwrap_or_default();
                let files = parse_file_specs(map.get("files"));
                Some(Self::Rich { content, embeds, files })
            }
            _ => None,
        }
    }
}

/// Build embeds from a mapping or list of mappings.
pub fn build_embeds(value: &Value) -> Vec<Embed> {
    match value {
        Value::Object(_) => serde_json::from_value(value.clone()).ok().into_iter().collect(),
        Value::Array(items) => items.iter().filter(|item| item.is_object()).filter_map(|item| serde_json::from_value(item.clone()).ok()).collect(),
        _ => Vec::new(),
    }
}

fn parse_file_specs(value: Option<&Value>) -> Vec<FileSpec> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match item {
            Value::String(path) => Some(FileSpec { path: path.into(), filename: None, spoiler: false }),
            Value::Object(map) => {
                let path = map.get("path").and_then(Value::as_str)?;
                let filename = map.get("filename").and_then(Value::as_str).map(str::trim).filter(|name| !name.is_empty()).map(str::to_string);
                let spoiler = map.get("spoiler").and_then(Value::as_bool).unwrap_or(false);
                Some(FileSpec { path: path.into(), filename, spoiler })
            }
            _ => None,
        })
        .collect()
}

/// Whether a configured attachment path may be served from the data root.
pub fn is_safe_relative_path(path: &Path) -> bool {
    if path.as_os_str().is_empty() || path.is_absolute() {
        return false;
    }
    !path.components().any(|component| matches!(component, Component::ParentDir | Component::Prefix(_)))
}

/// Resolve file specs against the data root, dropping unsafe or missing paths.
pub async fn build_files(specs: &[FileSpec], data_root: &Path) -> Vec<FileSpec> {
    let mut files = Vec::new();

    for spec in specs {
        if !is_safe_relative_path(&spec.path) {
            continue;
        }
        let resolved = data_root.join(&spec.path);
        if !tokio::fs::try_exists(&resolved).await.unwrap_or(false) {
            continue;
        }
        files.push(FileSpec {
            path: resolved,
            filename: spec.filename.clone(),
            spoiler: spec.spoiler,
        });
    }

    files
}

/// Strip control characters, neuter `@` so response text cannot mass-mention,
/// and cap the length.
pub fn sanitize_text(text: &str, max_chars: usize) -> String {
    let mut cleaned = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii_control() {
            continue;
        }
        cleaned.push(c);
        if c == '@' {
            cleaned.push('\u{200b}');
        }
    }

    if cleaned.chars().count() > max_chars {
        let mut truncated: String = cleaned.chars().take(max_chars.saturating_sub(3)).collect();
        truncated.push_str("...");
        return truncated;
    }
    cleaned
}

/// Resolve delivery targets. `response_targets` overrides `response_mode`;
/// unrecognized configuration falls back to the origin channel.
pub fn resolve_targets(settings: &TriggerSettings) -> Vec<ResponseTarget> {
    let candidates: Vec<&str> = if settings.response_targets.is_empty() {
        vec![settings.response_mode.as_str()]
    } else {
        settings.response_targets.iter().map(String::as_str).collect()
    };

    let resolved: Vec<ResponseTarget> = candidates.into_iter().filter_map(ResponseTarget::parse).collect();
    if resolved.is_empty() { vec![ResponseTarget::Channel] } else { resolved }
}

/// Assemble mention text and allowances from settings.
pub async fn build_mentions(host: &HostClient, message: &IncomingMessage, settings: &TriggerSettings) -> (String, AllowedMentions) {
    let mut parts: Vec<String> = Vec::new();
    let mut allowed = AllowedMentions {
        replied_user: settings.reply_ping_author,
        ..AllowedMentions::default()
    };

    if settings.mention_user {
        parts.push(format!("<@{}>", message.author_id));
        allowed.users.push(message.author_id);
    }

    if let Some(guild_id) = message.guild_id {
        for role_id in &settings.mention_roles {
            if host.guild_has_role(guild_id, *role_id).await {
                parts.push(format!("<@&{role_id}>"));
                allowed.roles.push(*role_id);
            }
        }
    }

    (parts.join(" "), allowed)
}

/// Apply prefix and suffix wrappers to text.
pub fn apply_text_wrappers(text: Option<String>, settings: &TriggerSettings) -> Option<String> {
    text.map(|text| format!("{}{}{}", settings.response_prefix, text, settings.response_suffix))
}

/// Ensure a response value is a list of responses.
pub fn coerce_responses(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        _ => vec![value.clone()],
    }
}

/// Send a response to a message.
///
/// Returns true if any target received the message.
pub async fn send_response(host: &HostClient, config: &Config, message: &IncomingMessage, response: &Value, settings: &TriggerSettings) -> bool {
    let Some(parsed) = ResponseValue::from_value(response) else {
        return false;
    };

    let (content, embeds, file_specs) = match parsed {
        ResponseValue::Text(text) => (Some(sanitize_text(&text, config.max_response_chars)), Vec::new(), Vec::new()),
        ResponseValue::Rich { content, embeds, files } => (content.map(|text| sanitize_text(&text, config.max_response_chars)), embeds, files),
    };

    let files = build_files(&file_specs, &config.data_dir).await;
    let (mention_text, allowed_mentions) = build_mentions(host, message, settings).await;

    let mut content = apply_text_wrappers(content, settings);
    if !mention_text.is_empty() {
        content = Some(format!("{mention_text} {}", content.unwrap_or_default()).trim().to_string());
    }

    let outbound = OutboundMessage { content, embeds, files, allowed_mentions };
    if outbound.is_empty() {
        return false;
    }

    if settings.delay_seconds > 0.0 {
        tokio::time::sleep(Duration::from_secs_f64(settings.delay_seconds)).await;
    }

    let mut handled = false;
    for target in resolve_targets(settings) {
        let sent = match target {
            ResponseTarget::Dm => send_dm_target(host, message, &outbound, settings).await,
            ResponseTarget::Reply => send_reply_target(host, message, &outbound, settings).await,
            ResponseTarget::Channel => send_channel_target(host, message, &outbound, settings).await,
        };
        handled = handled || sent;
    }

    handled
}

async fn send_dm_target(host: &HostClient, message: &IncomingMessage, outbound: &OutboundMessage, settings: &TriggerSettings) -> bool {
    match host.send_dm(message.author_id, outbound).await {
        Ok(()) => true,
        Err(err) => {
            debug!("DM to {} failed: {}", message.author_id, err);
            if settings.dm_fallback_to_channel {
                host.send_channel(message.channel_id, outbound).await.is_ok()
            } else {
                false
            }
        }
    }
}

async fn send_reply_target(host: &HostClient, message: &IncomingMessage, outbound: &OutboundMessage, settings: &TriggerSettings) -> bool {
    if settings.typing {
        let _ = host.trigger_typing(message.channel_id).await;
    }
    match host.send_reply(message, outbound).await {
        Ok(()) => true,
        Err(err) => {
            debug!("Reply in {} failed: {}", message.channel_id, err);
            false
        }
    }
}

async fn send_channel_target(host: &HostClient, message: &IncomingMessage, outbound: &OutboundMessage, settings: &TriggerSettings) -> bool {
    if settings.typing {
        let _ = host.trigger_typing(message.channel_id).await;
    }
    match host.send_channel(message.channel_id, outbound).await {
        Ok(()) => true,
        Err(err) => {
            debug!("Channel send to {} failed: {}", message.channel_id, err);
            false
        }
    }
}
