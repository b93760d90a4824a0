//! Trigger matching logic for the auto-responder.
//!
//! Pure functions: mode-based trigger matching, filter evaluation, input
//! extraction, and limit checks. Spans are byte offsets into the content
//! that was matched; slicing is boundary-checked so case folding that
//! shifts byte lengths degrades to empty text instead of panicking.

use regex::RegexBuilder;

use crate::base::{settings::TriggerSettings, types::{IncomingMessage, MatchMode}};

/// Match a trigger against content.
///
/// Returns the `(start, end)` byte span if matched.
pub fn match_trigger(content: &str, trigger: &str, settings: &TriggerSettings) -> Option<(usize, usize)> {
    if settings.match_mode == MatchMode::Regex {
        // Regex patterns run against the original content; case folding is
        // the regex engine's job. Invalid patterns never match.
        let pattern = RegexBuilder::new(trigger).case_insensitive(!settings.case_sensitive).build().ok()?;
        let m = pattern.find(content)?;
        return Some((m.start(), m.end()));
    }

    let (haystack, needle) = if settings.case_sensitive {
        (content.to_string(), trigger.to_string())
    } else {
        (content.to_lowercase(), trigger.to_lowercase())
    };

    match settings.match_mode {
        MatchMode::Equals => {
            if haystack == needle {
                Some((0, content.len()))
            } else {
                None
            }
        }
        MatchMode::Contains => haystack.find(&needle).map(|idx| (idx, idx + needle.len())),
        _ => {
            if haystack.starts_with(&needle) {
                Some((0, needle.len()))
            } else {
                None
            }
        }
    }
}

/// Check if a message passes all configured filters.
///
/// Allow-lists require membership when non-empty; block-lists reject on
/// membership. An empty list imposes no constraint.
pub fn passes_filters(message: &IncomingMessage, bot_user_id: u64, settings: &TriggerSettings) -> bool {
    if settings.require_mention && !message.mentions(bot_user_id) {
        return false;
    }

    // User filters.
    if !settings.allowed_user_ids.is_empty() && !settings.allowed_user_ids.contains(&message.author_id) {
        return false;
    }
    if settings.blocked_user_ids.contains(&message.author_id) {
        return false;
    }

    // Role filters.
    if !settings.allowed_role_ids.is_empty() && !message.author_role_ids.iter().any(|role| settings.allowed_role_ids.contains(role)) {
        return false;
    }
    if message.author_role_ids.iter().any(|role| settings.blocked_role_ids.contains(role)) {
        return false;
    }

    // Channel filters.
    if !settings.allowed_channel_ids.is_empty() && !settings.allowed_channel_ids.contains(&message.channel_id) {
        return false;
    }
    if settings.blocked_channel_ids.contains(&message.channel_id) {
        return false;
    }

    // Category filters.
    if !settings.allowed_category_ids.is_empty() && !message.category_id.is_some_and(|id| settings.allowed_category_ids.contains(&id)) {
        return false;
    }
    if message.category_id.is_some_and(|id| settings.blocked_category_ids.contains(&id)) {
        return false;
    }

    true
}

/// Extract the input text for a matched trigger.
///
/// An anchored match yields the remainder after the span; a floating match
/// (contains/regex away from position 0) yields the matched text itself.
pub fn extract_input_text(content: &str, span: Option<(usize, usize)>, settings: &TriggerSettings) -> String {
    let Some((start, end)) = span else {
        return content.trim().to_string();
    };
    if !settings.strip_trigger {
        return content.trim().to_string();
    }
    if start == 0 {
        return content.get(end..).unwrap_or("").trim().to_string();
    }
    content.get(start..end).unwrap_or("").trim().to_string()
}

/// Strip a leading bot mention from content if allowed.
///
/// Returns `(stripped_content, was_stripped)`.
pub fn strip_bot_mention_prefix(content: &str, message: &IncomingMessage, bot_user_id: u64, settings: &TriggerSettings) -> (String, bool) {
    if !settings.allow_mention_prefix || !message.mentions(bot_user_id) {
        return (content.to_string(), false);
    }

    let stripped = content.trim_start();
    for token in [format!("<@{bot_user_id}>"), format!("<@!{bot_user_id}>")] {
        if let Some(rest) = stripped.strip_prefix(&token) {
            return (rest.trim_start().to_string(), true);
        }
    }

    (content.to_string(), false)
}

/// Check if input text meets word/character limits. Zero means unbounded.
pub fn check_input_limits(text: &str, settings: &TriggerSettings) -> bool {
    let words = text.split_whitespace().count();
    let chars = text.chars().count();

    if settings.input_min_words > 0 && words < settings.input_min_words {
        return false;
    }
    if settings.input_max_words > 0 && words > settings.input_max_words {
        return false;
    }
    if settings.input_min_chars > 0 && chars < settings.input_min_chars {
        return false;
    }
    if settings.input_max_chars > 0 && chars > settings.input_max_chars {
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> TriggerSettings {
        TriggerSettings::default()
    }

    fn message() -> IncomingMessage {
        IncomingMessage {
            id: 1,
            guild_id: Some(10),
            channel_id: 20,
            category_id: Some(30),
            author_id: 40,
            author_is_bot: false,
            author_role_ids: vec![50, 51],
            mentioned_user_ids: vec![],
            content: String::new(),
        }
    }

    #[test]
    fn startswith_is_case_insensitive_by_default() {
        assert_eq!(match_trigger("HELLO world", "hello", &settings()), Some((0, 5)));
    }

    #[test]
    fn startswith_respects_case_sensitivity() {
        let s = TriggerSettings { case_sensitive: true, ..settings() };
        assert_eq!(match_trigger("HELLO world", "hello", &s), None);
        assert_eq!(match_trigger("hello world", "hello", &s), Some((0, 5)));
    }

    #[test]
    fn equals_requires_exact_content() {
        let s = TriggerSettings { match_mode: MatchMode::Equals, ..settings() };
        assert_eq!(match_trigger("ping", "ping", &s), Some((0, 4)));
        assert_eq!(match_trigger("ping!", "ping", &s), None);
        assert_eq!(match_trigger("PING", "ping", &s), Some((0, 4)));
    }

    #[test]
    fn contains_returns_first_occurrence() {
        let s = TriggerSettings { match_mode: MatchMode::Contains, ..settings() };
        assert_eq!(match_trigger("say hello twice hello", "hello", &s), Some((4, 9)));
        assert_eq!(match_trigger("nothing here", "hello", &s), None);
    }

    #[test]
    fn regex_matches_and_fails_closed() {
        let s = TriggerSettings { match_mode: MatchMode::Regex, ..settings() };
        assert_eq!(match_trigger("ban 42", r"^ban (\d+)$", &s), Some((0, 6)));
        assert_eq!(match_trigger("ban 42", r"ban (((", &s), None);
    }

    #[test]
    fn regex_case_flag_follows_settings() {
        let insensitive = TriggerSettings { match_mode: MatchMode::Regex, ..settings() };
        assert!(match_trigger("BAN 42", r"^ban \d+$", &insensitive).is_some());

        let sensitive = TriggerSettings { match_mode: MatchMode::Regex, case_sensitive: true, ..settings() };
        assert!(match_trigger("BAN 42", r"^ban \d+$", &sensitive).is_none());
    }

    #[test]
    fn filters_default_to_allow_all() {
        assert!(passes_filters(&message(), 1, &settings()));
    }

    #[test]
    fn block_list_wins_over_allow_list() {
        let s = TriggerSettings {
            allowed_user_ids: vec![40],
            blocked_user_ids: vec![40],
            ..settings()
        };
        assert!(!passes_filters(&message(), 1, &s));
    }

    #[test]
    fn allow_list_requires_membership() {
        let s = TriggerSettings { allowed_user_ids: vec![99], ..settings() };
        assert!(!passes_filters(&message(), 1, &s));

        let s = TriggerSettings { allowed_role_ids: vec![51], ..settings() };
        assert!(passes_filters(&message(), 1, &s));

        let s = TriggerSettings { allowed_category_ids: vec![31], ..settings() };
        assert!(!passes_filters(&message(), 1, &s));
    }

    #[test]
    fn require_mention_checks_bot_id() {
        let s = TriggerSettings { require_mention: true, ..settings() };
        assert!(!passes_filters(&message(), 1, &s));

        let mut msg = message();
        msg.mentioned_user_ids.push(1);
        assert!(passes_filters(&msg, 1, &s));
    }

    #[test]
    fn extract_input_after_anchored_span() {
        assert_eq!(extract_input_text("!hi there", Some((0, 3)), &settings()), "there");
    }

    #[test]
    fn extract_input_uses_span_text_for_floating_match() {
        // A contains match away from position 0 extracts the match itself.
        assert_eq!(extract_input_text("say hello twice", Some((4, 9)), &settings()), "hello");
    }

    #[test]
    fn extract_input_keeps_full_content_without_strip() {
        let s = TriggerSettings { strip_trigger: false, ..settings() };
        assert_eq!(extract_input_text("  !hi there ", Some((0, 3)), &s), "!hi there");
    }

    #[test]
    fn mention_prefix_is_stripped_in_both_forms() {
        let mut msg = message();
        msg.mentioned_user_ids.push(1);

        let (stripped, was) = strip_bot_mention_prefix("<@1> !hi there", &msg, 1, &settings());
        assert_eq!(stripped, "!hi there");
        assert!(was);

        let (stripped, was) = strip_bot_mention_prefix("<@!1> !hi", &msg, 1, &settings());
        assert_eq!(stripped, "!hi");
        assert!(was);
    }

    #[test]
    fn mention_prefix_requires_actual_mention() {
        let (stripped, was) = strip_bot_mention_prefix("<@1> !hi", &message(), 1, &settings());
        assert_eq!(stripped, "<@1> !hi");
        assert!(!was);
    }

    #[test]
    fn input_limits_gate_words_and_chars() {
        let s = TriggerSettings { input_min_words: 2, ..settings() };
        assert!(!check_input_limits("one", &s));
        assert!(check_input_limits("one two", &s));

        let s = TriggerSettings { input_max_chars: 3, ..settings() };
        assert!(!check_input_limits("long text", &s));
        assert!(check_input_limits("ok", &s));

        // Zero stays unbounded.
        assert!(check_input_limits("", &settings()));
    }
}
