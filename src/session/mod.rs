//! Session entries shared with the live gateway.
//!
//! The gateway records the last channel, recipient and activity time of each
//! conversation scope in a session store file. The heartbeat engine reads
//! that state to pick a delivery target and writes `updatedAt` back only to
//! undo its own side effects (see [`crate::heartbeat::freshness`]).
//!
//! The store is shared file state with last-writer-wins semantics. Nothing
//! here locks it; callers re-read before every read-modify-write.

mod store;

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::channels::ChannelKind;
use crate::error::Result;

pub use store::JsonSessionStore;

/// Session entries keyed by session key.
pub type SessionMap = BTreeMap<String, SessionEntry>;

/// Most recent real interaction for one conversation scope.
///
/// Field names follow the shared store format (`updatedAt`, `lastChannel`,
/// `lastTo`). Fields this crate does not know about are carried in `extra`
/// so rewriting an entry never drops them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Freshness timestamp in epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_to: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SessionEntry {
    /// Last channel as a deliverable kind; `None` for web chat or unknown names.
    pub fn last_channel_kind(&self) -> Option<ChannelKind> {
        self.last_channel.as_deref().and_then(ChannelKind::from_name)
    }

    /// Trimmed last recipient, `None` when blank.
    pub fn last_recipient(&self) -> Option<&str> {
        self.last_to
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Persistence backend for the session store.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load every entry at `path`. A store that does not exist yet is empty.
    async fn load(&self, path: &Path) -> Result<SessionMap>;

    /// Replace the store at `path` with `sessions`.
    async fn save(&self, path: &Path, sessions: &SessionMap) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_deserializes_store_format() {
        let json = r#"{
            "sessionId": "abc",
            "updatedAt": 1700000000123,
            "lastChannel": "telegram",
            "lastTo": " 42 ",
            "thinkingLevel": "high"
        }"#;
        let entry: SessionEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.session_id.as_deref(), Some("abc"));
        assert_eq!(entry.updated_at, Some(1_700_000_000_123));
        assert_eq!(entry.last_channel_kind(), Some(ChannelKind::Telegram));
        assert_eq!(entry.last_recipient(), Some("42"));
        assert_eq!(entry.extra["thinkingLevel"], "high");
    }

    #[test]
    fn test_entry_roundtrip_keeps_unknown_fields() {
        let json = r#"{"updatedAt":5,"lastChannel":"webchat","custom":{"a":1}}"#;
        let entry: SessionEntry = serde_json::from_str(json).unwrap();
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["custom"]["a"], 1);
        assert_eq!(value["updatedAt"], 5);
        assert!(value.get("lastTo").is_none());
    }

    #[test]
    fn test_webchat_is_not_a_channel_kind() {
        let entry = SessionEntry {
            last_channel: Some("webchat".to_string()),
            last_to: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(entry.last_channel_kind(), None);
        assert_eq!(entry.last_recipient(), None);
    }
}
