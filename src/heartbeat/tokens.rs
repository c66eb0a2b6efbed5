//! Heartbeat prompt and acknowledgement token.

/// Token the agent replies with when nothing needs attention.
pub const HEARTBEAT_TOKEN: &str = "HEARTBEAT_OK";

/// Prompt sent to the agent when no prompt is configured.
pub const HEARTBEAT_PROMPT: &str = r#"Read HEARTBEAT.md in your workspace (if it exists).
Follow any actionable items listed there.
If nothing needs attention, reply with: HEARTBEAT_OK"#;

/// Configured prompt, trimmed, or the default prompt when blank.
pub fn resolve_heartbeat_prompt(raw: Option<&str>) -> String {
    raw.map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(HEARTBEAT_PROMPT)
        .to_string()
}

/// Reply text with the heartbeat token removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrippedReply {
    /// The reply is a deliberate "say nothing".
    pub should_skip: bool,
    pub text: String,
}

/// Remove every occurrence of [`HEARTBEAT_TOKEN`] from `raw`.
///
/// Blank input and input that is only the token (plus whitespace) are
/// skip signals. Otherwise the trimmed remainder is returned.
pub fn strip_heartbeat_token(raw: Option<&str>) -> StrippedReply {
    let skip = StrippedReply {
        should_skip: true,
        text: String::new(),
    };

    let trimmed = match raw.map(str::trim) {
        Some(t) if !t.is_empty() => t,
        _ => return skip,
    };

    if !trimmed.contains(HEARTBEAT_TOKEN) {
        return StrippedReply {
            should_skip: false,
            text: trimmed.to_string(),
        };
    }

    let without_token = trimmed.replace(HEARTBEAT_TOKEN, "");
    let without_token = without_token.trim();
    if without_token.is_empty() {
        return skip;
    }

    StrippedReply {
        should_skip: false,
        text: without_token.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_default_and_override() {
        assert_eq!(resolve_heartbeat_prompt(None), HEARTBEAT_PROMPT);
        assert_eq!(resolve_heartbeat_prompt(Some("   ")), HEARTBEAT_PROMPT);
        assert_eq!(resolve_heartbeat_prompt(Some(" ping ")), "ping");
    }

    #[test]
    fn test_strip_blank_is_skip() {
        assert!(strip_heartbeat_token(None).should_skip);
        assert!(strip_heartbeat_token(Some("")).should_skip);
        assert!(strip_heartbeat_token(Some(" \n ")).should_skip);
    }

    #[test]
    fn test_strip_token_only_is_skip() {
        let stripped = strip_heartbeat_token(Some("  HEARTBEAT_OK \n"));
        assert!(stripped.should_skip);
        assert_eq!(stripped.text, "");
    }

    #[test]
    fn test_strip_keeps_surrounding_text() {
        let stripped = strip_heartbeat_token(Some("HEARTBEAT_OK Inbox has 3 urgent mails"));
        assert!(!stripped.should_skip);
        assert_eq!(stripped.text, "Inbox has 3 urgent mails");
    }

    #[test]
    fn test_strip_without_token_trims() {
        let stripped = strip_heartbeat_token(Some("  Reminder: standup at 10  "));
        assert!(!stripped.should_skip);
        assert_eq!(stripped.text, "Reminder: standup at 10");
    }
}
