//! Webhook sender.
//!
//! Posts each heartbeat message as JSON to a configured URL and leaves the
//! actual transport to whatever service listens there. The receiver must
//! answer with a 2xx status; anything else fails the send.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{HeartwireError, Result};

use super::{ChannelKind, MessageSender, SendOptions};

/// Sender that forwards messages to an HTTP webhook.
pub struct WebhookSender {
    channel: ChannelKind,
    url: String,
    client: reqwest::Client,
}

impl WebhookSender {
    /// Creates a webhook sender for `channel`.
    pub fn new(channel: ChannelKind, url: impl Into<String>) -> Self {
        Self {
            channel,
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }

    fn build_payload(&self, to: &str, text: &str, options: &SendOptions) -> Result<Value> {
        let to = to.trim();
        if to.is_empty() {
            return Err(HeartwireError::Channel(format!(
                "{} recipient cannot be empty",
                self.channel
            )));
        }

        let mut payload = json!({
            "channel": self.channel.as_str(),
            "to": to,
            "text": text,
        });

        if let Some(ref media_url) = options.media_url {
            if let Some(map) = payload.as_object_mut() {
                map.insert("mediaUrl".to_string(), Value::String(media_url.clone()));
            }
        }

        Ok(payload)
    }
}

#[async_trait]
impl MessageSender for WebhookSender {
    async fn send(&self, to: &str, text: &str, options: SendOptions) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(HeartwireError::Config("Webhook URL is empty".to_string()));
        }

        let payload = self.build_payload(to, text, &options)?;

        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HeartwireError::Channel(format!(
                "Webhook returned HTTP {}: {}",
                status, body
            )));
        }

        debug!(channel = %self.channel, to = to, "Webhook delivery accepted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_text_only() {
        let sender = WebhookSender::new(ChannelKind::Telegram, "http://localhost:9/hook");
        let payload = sender
            .build_payload("42", "hello", &SendOptions::default())
            .expect("payload should build");

        assert_eq!(payload["channel"], "telegram");
        assert_eq!(payload["to"], "42");
        assert_eq!(payload["text"], "hello");
        assert!(payload.get("mediaUrl").is_none());
    }

    #[test]
    fn test_payload_with_media() {
        let sender = WebhookSender::new(ChannelKind::WhatsApp, "http://localhost:9/hook");
        let payload = sender
            .build_payload("+1555", "", &SendOptions::with_media("https://x/a.png"))
            .expect("payload should build");

        assert_eq!(payload["channel"], "whatsapp");
        assert_eq!(payload["text"], "");
        assert_eq!(payload["mediaUrl"], "https://x/a.png");
    }

    #[test]
    fn test_payload_rejects_empty_recipient() {
        let sender = WebhookSender::new(ChannelKind::Telegram, "http://localhost:9/hook");
        assert!(sender
            .build_payload("  ", "hello", &SendOptions::default())
            .is_err());
    }

    #[tokio::test]
    async fn test_send_with_empty_url_fails() {
        let sender = WebhookSender::new(ChannelKind::Telegram, "");
        let result = sender.send("42", "hello", SendOptions::default()).await;
        assert!(matches!(result, Err(HeartwireError::Config(_))));
    }

    #[tokio::test]
    async fn test_unreachable_webhook_is_http_error() {
        // Port 9 (discard) on loopback is closed on test hosts.
        let sender = WebhookSender::new(ChannelKind::Telegram, "http://127.0.0.1:9/hook");
        let result = sender.send("42", "hello", SendOptions::default()).await;
        assert!(matches!(result, Err(HeartwireError::Http(_))));
    }
}
