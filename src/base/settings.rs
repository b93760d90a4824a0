//! Trigger settings schema: defaults, layered merge, and the typed snapshot
//! used by the matcher, delivery, and engine.
//!
//! Guild operators author settings as open JSON mappings, so the raw form
//! stays a [`SettingsMap`]; every consumer works from a [`TriggerSettings`]
//! snapshot built by lenient coercion over the merged layers
//! (defaults <- guild-global <- trigger settings <- trigger match <- handler
//! overrides).

use serde_json::{Map, Value, json};

use super::types::{CooldownScope, MatchMode};

/// Open settings mapping as authored in guild config documents.
pub type SettingsMap = Map<String, Value>;

/// The full default settings layer, as documented for guild operators.
pub fn default_settings_map() -> SettingsMap {
    let Value::Object(map) = json!({
        "enabled": true,
        "match_mode": "startswith",
        "case_sensitive": false,
        "strip_trigger": true,
        "allow_mention_prefix": true,
        "require_mention": false,
        "allowed_user_ids": [],
        "blocked_user_ids": [],
        "allowed_role_ids": [],
        "blocked_role_ids": [],
        "allowed_channel_ids": [],
        "blocked_channel_ids": [],
        "allowed_category_ids": [],
        "blocked_category_ids": [],
        "cooldown_seconds": 0.0,
        "cooldown_scope": "user",
        "delete_trigger_message": false,
        "delay_seconds": 0.0,
        "typing": false,
        "response_mode": "channel",
        "response_targets": [],
        "response_prefix": "",
        "response_suffix": "",
        "mention_user": false,
        "mention_roles": [],
        "reply_ping_author": false,
        "dm_fallback_to_channel": true,
        "input_min_words": 0,
        "input_max_words": 0,
        "input_min_chars": 0,
        "input_max_chars": 0,
    }) else {
        unreachable!()
    };
    map
}

/// Merge settings mappings; later sources override earlier ones key-by-key.
pub fn merge_settings(sources: &[&SettingsMap]) -> SettingsMap {
    let mut merged = SettingsMap::new();
    for source in sources {
        for (key, value) in source.iter() {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

/// Lenient truthiness for operator-authored values.
pub fn as_bool(value: Option<&Value>, default: bool) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(default),
        Some(Value::String(s)) => !matches!(s.trim().to_ascii_lowercase().as_str(), "" | "false" | "0" | "no" | "off"),
        Some(Value::Null) => false,
        _ => default,
    }
}

/// Numeric coercion accepting numbers and numeric strings.
pub fn as_f64(value: Option<&Value>, default: f64) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(default),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(default),
        Some(Value::Bool(b)) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        _ => default,
    }
}

/// Non-negative integer coercion; negatives and garbage clamp to the default.
pub fn as_usize(value: Option<&Value>, default: usize) -> usize {
    match value {
        Some(Value::Number(n)) => n.as_u64().map(|v| v as usize).unwrap_or(default),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(default),
        _ => default,
    }
}

fn as_str<'v>(value: Option<&'v Value>) -> Option<&'v str> {
    match value {
        Some(Value::String(s)) => Some(s.as_str()),
        _ => None,
    }
}

/// Convert an operator-authored list into integer IDs.
///
/// Accepts integers and digit-only strings; everything else is skipped.
pub fn normalize_id_list(value: Option<&Value>) -> Vec<u64> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => {
                let trimmed = s.trim();
                if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) { trimmed.parse().ok() } else { None }
            }
            _ => None,
        })
        .collect()
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items.iter().filter_map(|item| as_str(Some(item)).map(str::to_string)).collect(),
        _ => Vec::new(),
    }
}

/// Typed snapshot of a fully merged settings mapping.
///
/// Field defaults match [`default_settings_map`]; the raw mapping remains the
/// source of truth for handlers, which receive it verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerSettings {
    pub enabled: bool,
    pub match_mode: MatchMode,
    pub case_sensitive: bool,
    pub strip_trigger: bool,
    pub allow_mention_prefix: bool,
    pub require_mention: bool,
    pub allowed_user_ids: Vec<u64>,
    pub blocked_user_ids: Vec<u64>,
    pub allowed_role_ids: Vec<u64>,
    pub blocked_role_ids: Vec<u64>,
    pub allowed_channel_ids: Vec<u64>,
    pub blocked_channel_ids: Vec<u64>,
    pub allowed_category_ids: Vec<u64>,
    pub blocked_category_ids: Vec<u64>,
    pub cooldown_seconds: f64,
    pub cooldown_scope: CooldownScope,
    pub delete_trigger_message: bool,
    pub delay_seconds: f64,
    pub typing: bool,
    pub response_mode: String,
    pub response_targets: Vec<String>,
    pub response_prefix: String,
    pub response_suffix: String,
    pub mention_user: bool,
    pub mention_roles: Vec<u64>,
    pub reply_ping_author: bool,
    pub dm_fallback_to_channel: bool,
    pub input_min_words: usize,
    pub input_max_words: usize,
    pub input_min_chars: usize,
    pub input_max_chars: usize,
}

impl Default for TriggerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            match_mode: MatchMode::Startswith,
            case_sensitive: false,
            strip_trigger: true,
            allow_mention_prefix: true,
            require_mention: false,
            allowed_user_ids: Vec::new(),
            blocked_user_ids: Vec::new(),
            allowed_role_ids: Vec::new(),
            blocked_role_ids: Vec::new(),
            allowed_channel_ids: Vec::new(),
            blocked_channel_ids: Vec::new(),
            allowed_category_ids: Vec::new(),
            blocked_category_ids: Vec::new(),
            cooldown_seconds: 0.0,
            cooldown_scope: CooldownScope::User,
            delete_trigger_message: false,
            delay_seconds: 0.0,
            typing: false,
            response_mode: "channel".to_string(),
            response_targets: Vec::new(),
            response_prefix: String::new(),
            response_suffix: String::new(),
            mention_user: false,
            mention_roles: Vec::new(),
            reply_ping_author: false,
            dm_fallback_to_channel: true,
            input_min_words: 0,
            input_max_words: 0,
            input_min_chars: 0,
            input_max_chars: 0,
        }
    }
}

impl TriggerSettings {
    /// Build a typed snapshot from a merged settings mapping.
    pub fn from_map(map: &SettingsMap) -> Self {
        let defaults = Self::default();

        // `match` doubles as a match-mode alias when authored as a string.
        let match_mode = as_str(map.get("match_mode"))
            .or_else(|| as_str(map.get("match")))
            .map(MatchMode::parse)
            .unwrap_or(defaults.match_mode);

        let cooldown_scope = as_str(map.get("cooldown_scope")).map(CooldownScope::parse).unwrap_or(defaults.cooldown_scope);

        Self {
            enabled: as_bool(map.get("enabled"), defaults.enabled),
            match_mode,
            case_sensitive: as_bool(map.get("case_sensitive"), defaults.case_sensitive),
            strip_trigger: as_bool(map.get("strip_trigger"), defaults.strip_trigger),
            allow_mention_prefix: as_bool(map.get("allow_mention_prefix"), defaults.allow_mention_prefix),
            require_mention: as_bool(map.get("require_mention"), defaults.require_mention),
            allowed_user_ids: normalize_id_list(map.get("allowed_user_ids")),
            blocked_user_ids: normalize_id_list(map.get("blocked_user_ids")),
            allowed_role_ids: normalize_id_list(map.get("allowed_role_ids")),
            blocked_role_ids: normalize_id_list(map.get("blocked_role_ids")),
            allowed_channel_ids: normalize_id_list(map.get("allowed_channel_ids")),
            blocked_channel_ids: normalize_id_list(map.get("blocked_channel_ids")),
            allowed_category_ids: normalize_id_list(map.get("allowed_category_ids")),
            blocked_category_ids: normalize_id_list(map.get("blocked_category_ids")),
            cooldown_seconds: as_f64(map.get("cooldown_seconds"), defaults.cooldown_seconds),
            cooldown_scope,
            delete_trigger_message: as_bool(map.get("delete_trigger_message"), defaults.delete_trigger_message),
            delay_seconds: as_f64(map.get("delay_seconds"), defaults.delay_seconds),
            typing: as_bool(map.get("typing"), defaults.typing),
            response_mode: as_str(map.get("response_mode")).map(str::to_string).unwrap_or(defaults.response_mode),
            response_targets: string_list(map.get("response_targets")),
            response_prefix: as_str(map.get("response_prefix")).map(str::to_string).unwrap_or(defaults.response_prefix),
            response_suffix: as_str(map.get("response_suffix")).map(str::to_string).unwrap_or(defaults.response_suffix),
            mention_user: as_bool(map.get("mention_user"), defaults.mention_user),
            mention_roles: normalize_id_list(map.get("mention_roles")),
            reply_ping_author: as_bool(map.get("reply_ping_author"), defaults.reply_ping_author),
            dm_fallback_to_channel: as_bool(map.get("dm_fallback_to_channel"), defaults.dm_fallback_to_channel),
            input_min_words: as_usize(map.get("input_min_words"), defaults.input_min_words),
            input_max_words: as_usize(map.get("input_max_words"), defaults.input_max_words),
            input_min_chars: as_usize(map.get("input_min_chars"), defaults.input_min_chars),
            input_max_chars: as_usize(map.get("input_max_chars"), defaults.input_max_chars),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_default_map() {
        let snapshot = TriggerSettings::from_map(&default_settings_map());
        assert_eq!(snapshot, TriggerSettings::default());
    }

    #[test]
    fn merge_later_sources_override() {
        let base = default_settings_map();
        let Value::Object(overlay) = json!({"cooldown_seconds": 5, "match_mode": "equals"}) else {
            unreachable!()
        };
        let merged = merge_settings(&[&base, &overlay]);
        let snapshot = TriggerSettings::from_map(&merged);
        assert_eq!(snapshot.cooldown_seconds, 5.0);
        assert_eq!(snapshot.match_mode, MatchMode::Equals);
        assert!(snapshot.strip_trigger);
    }

    #[test]
    fn id_lists_accept_digit_strings() {
        let value = json!([1, "2", " 3 ", "nope", true, -4]);
        assert_eq!(normalize_id_list(Some(&value)), vec![1, 2, 3]);
    }

    #[test]
    fn match_key_string_is_a_mode_alias() {
        let Value::Object(map) = json!({"match": "contains"}) else {
            unreachable!()
        };
        assert_eq!(TriggerSettings::from_map(&map).match_mode, MatchMode::Contains);
    }

    #[test]
    fn response_targets_accept_single_string() {
        let Value::Object(map) = json!({"response_targets": "dm"}) else {
            unreachable!()
        };
        assert_eq!(TriggerSettings::from_map(&map).response_targets, vec!["dm".to_string()]);
    }
}
