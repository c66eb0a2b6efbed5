//! Reply generation contract.
//!
//! The heartbeat runner does not know how replies are produced. It builds a
//! synthetic [`ReplyContext`] and asks a [`ReplyEngine`] for a payload.

mod command;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::Result;

pub use command::CommandReplyEngine;

/// Surface name attached to heartbeat requests.
pub const HEARTBEAT_SURFACE: &str = "heartbeat";

/// Synthetic inbound request handed to the reply engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyContext {
    pub body: String,
    pub from: String,
    pub to: String,
    pub surface: String,
}

/// Flags for a reply request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplyOptions {
    pub is_heartbeat: bool,
}

/// Generated reply: text plus optional attachments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub media_urls: Vec<String>,
}

impl ReplyPayload {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// Ordered attachments: `media_urls` when present, else the single `media_url`.
    pub fn attachments(&self) -> Vec<String> {
        if !self.media_urls.is_empty() {
            return self.media_urls.clone();
        }
        self.media_url.iter().cloned().collect()
    }

    pub fn has_media(&self) -> bool {
        self.media_url.is_some() || !self.media_urls.is_empty()
    }

    /// True when there is neither text nor an attachment.
    pub fn is_empty(&self) -> bool {
        self.text.as_deref().map_or(true, str::is_empty) && !self.has_media()
    }
}

/// What a reply engine may return: one payload or an ordered list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOutput {
    Single(ReplyPayload),
    Many(Vec<ReplyPayload>),
}

impl ReplyOutput {
    /// The payload a heartbeat delivers; the first one of a list.
    pub fn into_payload(self) -> Option<ReplyPayload> {
        match self {
            Self::Single(payload) => Some(payload),
            Self::Many(payloads) => payloads.into_iter().next(),
        }
    }
}

/// Turns a request into a reply. May fail; failures fail the heartbeat run.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReplyEngine: Send + Sync {
    async fn generate(
        &self,
        ctx: ReplyContext,
        options: ReplyOptions,
        config: &Config,
    ) -> Result<Option<ReplyOutput>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachments_prefer_list() {
        let payload = ReplyPayload {
            text: None,
            media_url: Some("single".to_string()),
            media_urls: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(payload.attachments(), vec!["a", "b"]);

        let payload = ReplyPayload {
            media_url: Some("single".to_string()),
            ..Default::default()
        };
        assert_eq!(payload.attachments(), vec!["single"]);
        assert!(ReplyPayload::text("hi").attachments().is_empty());
    }

    #[test]
    fn test_payload_emptiness() {
        assert!(ReplyPayload::default().is_empty());
        assert!(ReplyPayload::text("").is_empty());
        assert!(!ReplyPayload::text(" ").is_empty());
        let media_only = ReplyPayload {
            media_url: Some("u".to_string()),
            ..Default::default()
        };
        assert!(!media_only.is_empty());
    }

    #[test]
    fn test_output_uses_first_payload() {
        let output = ReplyOutput::Many(vec![
            ReplyPayload::text("first"),
            ReplyPayload::text("second"),
        ]);
        assert_eq!(output.into_payload(), Some(ReplyPayload::text("first")));
        assert_eq!(ReplyOutput::Many(vec![]).into_payload(), None);
    }

    #[test]
    fn test_payload_json_shape() {
        let payload: ReplyPayload =
            serde_json::from_str(r#"{"text":"hi","mediaUrls":["a","b"]}"#).unwrap();
        assert_eq!(payload.text.as_deref(), Some("hi"));
        assert_eq!(payload.media_urls, vec!["a", "b"]);
    }
}
