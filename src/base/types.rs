use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub type Err = anyhow::Error;
pub type Res<T> = Result<T, Err>;
pub type Void = Res<()>;

/// How a trigger is compared against message content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    #[default]
    Startswith,
    Equals,
    Contains,
    Regex,
}

impl MatchMode {
    /// Lenient parse used for settings values; unknown strings fall back to the default.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "equals" => Self::Equals,
            "contains" => Self::Contains,
            "regex" => Self::Regex,
            _ => Self::Startswith,
        }
    }
}

/// Whether a trigger cooldown applies per author or guild-wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CooldownScope {
    #[default]
    User,
    Guild,
}

impl CooldownScope {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "guild" => Self::Guild,
            _ => Self::User,
        }
    }
}

/// Delivery destination for an outgoing response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseTarget {
    Channel,
    Reply,
    Dm,
}

impl ResponseTarget {
    /// Parse a configured target name. `ephemeral` is an accepted alias for `dm`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "channel" => Some(Self::Channel),
            "reply" => Some(Self::Reply),
            "dm" | "ephemeral" => Some(Self::Dm),
            _ => None,
        }
    }
}

/// A gateway message as delivered by the host.
///
/// This is the narrow view of a chat event the responder core needs; the
/// host (gateway integration) owns the full event type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub id: u64,
    pub guild_id: Option<u64>,
    pub channel_id: u64,
    /// Category (channel group) the origin channel belongs to, if any.
    pub category_id: Option<u64>,
    pub author_id: u64,
    pub author_is_bot: bool,
    pub author_role_ids: Vec<u64>,
    pub mentioned_user_ids: Vec<u64>,
    pub content: String,
}

impl IncomingMessage {
    /// Whether the message mentions the given user.
    pub fn mentions(&self, user_id: u64) -> bool {
        self.mentioned_user_ids.contains(&user_id)
    }
}

/// A rich embed, deserialized from operator-supplied config documents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Embed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<EmbedMedia>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<EmbedMedia>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbedFooter {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbedMedia {
    pub url: String,
}

/// A file attachment resolved from config, relative to the managed data root.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileSpec {
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default)]
    pub spoiler: bool,
}

/// Mention allowances attached to an outgoing message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllowedMentions {
    pub users: Vec<u64>,
    pub roles: Vec<u64>,
    pub replied_user: bool,
}

/// A fully assembled outgoing message, ready for the host to send.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub content: Option<String>,
    pub embeds: Vec<Embed>,
    pub files: Vec<FileSpec>,
    pub allowed_mentions: AllowedMentions,
}

impl OutboundMessage {
    /// True when there is nothing to deliver.
    pub fn is_empty(&self) -> bool {
        self.content.as_deref().unwrap_or("").is_empty() && self.embeds.is_empty() && self.files.is_empty()
    }
}
