//! Outbound channels for heartbeat delivery.
//!
//! The heartbeat engine never talks to a transport directly. It resolves a
//! [`ChannelKind`] and hands each message to the [`MessageSender`] registered
//! for that kind in [`ChannelSenders`].

pub mod address;
pub mod chunk;
mod manager;
mod webhook;

use std::fmt;

use async_trait::async_trait;
use tracing::info;

use crate::error::Result;

pub use address::normalize_e164;
pub use chunk::{chunk_text, TEXT_CHUNK_LIMIT};
pub use manager::ChannelSenders;
pub use webhook::WebhookSender;

/// Pseudo-channel name of the built-in web chat. Never a heartbeat destination.
pub const WEBCHAT_CHANNEL: &str = "webchat";

/// Channels a heartbeat can be delivered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    /// Allow-list restricted; recipients are E.164 phone numbers.
    WhatsApp,
    Telegram,
}

impl ChannelKind {
    /// Parse a channel name as recorded in the session store.
    ///
    /// Returns `None` for unknown names and for the web chat pseudo-channel.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "whatsapp" => Some(Self::WhatsApp),
            "telegram" => Some(Self::Telegram),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WhatsApp => "whatsapp",
            Self::Telegram => "telegram",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-message send options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendOptions {
    /// Attachment URL; the text becomes its caption.
    pub media_url: Option<String>,
}

impl SendOptions {
    pub fn with_media(url: impl Into<String>) -> Self {
        Self {
            media_url: Some(url.into()),
        }
    }
}

/// Transmission primitive for one channel.
///
/// Implementations must complete (or fail) a send before returning so the
/// dispatcher can guarantee ordering by awaiting each call in turn.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, to: &str, text: &str, options: SendOptions) -> Result<()>;
}

/// Sender that only records deliveries in the log.
#[derive(Debug, Clone)]
pub struct LogSender {
    channel: ChannelKind,
}

impl LogSender {
    pub fn new(channel: ChannelKind) -> Self {
        Self { channel }
    }
}

#[async_trait]
impl MessageSender for LogSender {
    async fn send(&self, to: &str, text: &str, options: SendOptions) -> Result<()> {
        info!(
            channel = %self.channel,
            to = to,
            chars = text.chars().count(),
            media = options.media_url.as_deref().unwrap_or(""),
            "Heartbeat message: {}",
            text
        );
        Ok(())
    }
}
