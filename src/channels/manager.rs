//! Sender registry for heartbeat delivery.
//!
//! `ChannelSenders` maps each [`ChannelKind`] to the transport that puts
//! messages on the wire for it. The heartbeat runner looks up the sender for
//! the resolved target channel and hands it the delivery plan.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use crate::error::{HeartwireError, Result};

use super::{ChannelKind, LogSender, MessageSender};

/// Registry of per-channel senders.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use heartwire::channels::{ChannelKind, ChannelSenders, LogSender};
///
/// let mut senders = ChannelSenders::new();
/// senders.register(ChannelKind::Telegram, Arc::new(LogSender::new(ChannelKind::Telegram)));
///
/// assert!(senders.has_channel(ChannelKind::Telegram));
/// assert!(!senders.has_channel(ChannelKind::WhatsApp));
/// ```
#[derive(Clone, Default)]
pub struct ChannelSenders {
    senders: HashMap<ChannelKind, Arc<dyn MessageSender>>,
}

impl ChannelSenders {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry where every channel only logs its deliveries.
    pub fn logging() -> Self {
        let mut senders = Self::new();
        for kind in [ChannelKind::WhatsApp, ChannelKind::Telegram] {
            senders.register(kind, Arc::new(LogSender::new(kind)));
        }
        senders
    }

    /// Registers `sender` for `kind`, replacing any previous sender.
    pub fn register(&mut self, kind: ChannelKind, sender: Arc<dyn MessageSender>) {
        info!("Registering sender for channel: {}", kind);
        self.senders.insert(kind, sender);
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, kind: ChannelKind, sender: Arc<dyn MessageSender>) -> Self {
        self.register(kind, sender);
        self
    }

    /// Checks if a sender is registered for `kind`.
    pub fn has_channel(&self, kind: ChannelKind) -> bool {
        self.senders.contains_key(&kind)
    }

    /// Returns the registered channel kinds.
    pub fn channels(&self) -> Vec<ChannelKind> {
        self.senders.keys().copied().collect()
    }

    /// Returns the sender for `kind`.
    ///
    /// # Errors
    ///
    /// Returns a channel error when nothing is registered for `kind`; a
    /// heartbeat resolved to an unwired channel is a delivery failure.
    pub fn sender(&self, kind: ChannelKind) -> Result<Arc<dyn MessageSender>> {
        self.senders
            .get(&kind)
            .cloned()
            .ok_or_else(|| HeartwireError::Channel(format!("No sender registered for {}", kind)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::SendOptions;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSender {
        sent: AtomicUsize,
    }

    #[async_trait]
    impl MessageSender for CountingSender {
        async fn send(&self, _to: &str, _text: &str, _options: SendOptions) -> Result<()> {
            self.sent.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_empty_registry() {
        let senders = ChannelSenders::new();
        assert!(senders.channels().is_empty());
        assert!(senders.sender(ChannelKind::Telegram).is_err());
    }

    #[test]
    fn test_logging_registry_covers_all_channels() {
        let senders = ChannelSenders::logging();
        assert!(senders.has_channel(ChannelKind::WhatsApp));
        assert!(senders.has_channel(ChannelKind::Telegram));
        assert_eq!(senders.channels().len(), 2);
    }

    #[tokio::test]
    async fn test_register_replaces_sender() {
        let first = Arc::new(CountingSender {
            sent: AtomicUsize::new(0),
        });
        let second = Arc::new(CountingSender {
            sent: AtomicUsize::new(0),
        });
        let senders = ChannelSenders::new()
            .with(ChannelKind::Telegram, first.clone())
            .with(ChannelKind::Telegram, second.clone());

        senders
            .sender(ChannelKind::Telegram)
            .unwrap()
            .send("42", "hi", SendOptions::default())
            .await
            .unwrap();

        assert_eq!(first.sent.load(Ordering::SeqCst), 0);
        assert_eq!(second.sent.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_missing_sender_error_names_channel() {
        let senders = ChannelSenders::new();
        let err = senders.sender(ChannelKind::WhatsApp).err().unwrap();
        assert!(err.to_string().contains("whatsapp"));
    }
}
