//! Heartbeat outcome events.
//!
//! Every run that gets past its preconditions reports exactly one
//! [`HeartbeatEvent`]. Subscribers receive events over a broadcast channel;
//! the most recent event is also cached for status queries.

use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

/// Longest preview carried by a `sent` event, in characters.
pub const PREVIEW_CHARS: usize = 200;

const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HeartbeatStatus {
    Sent,
    OkEmpty,
    OkToken,
    Skipped,
    Failed,
}

impl HeartbeatStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::OkEmpty => "ok-empty",
            Self::OkToken => "ok-token",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }
}

/// Outcome of one heartbeat run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatEvent {
    /// Wall-clock time in epoch milliseconds.
    pub ts: i64,
    pub status: HeartbeatStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_media: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl HeartbeatEvent {
    /// Event stamped with the current time and no optional fields.
    pub fn new(status: HeartbeatStatus) -> Self {
        Self {
            ts: chrono::Utc::now().timestamp_millis(),
            status,
            to: None,
            preview: None,
            duration_ms: None,
            has_media: None,
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }
}

/// First [`PREVIEW_CHARS`] characters of `text`.
pub fn truncate_preview(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}

/// Event sink shared by the runner and its observers.
///
/// # Example
///
/// ```
/// use heartwire::heartbeat::{HeartbeatEvent, HeartbeatEvents, HeartbeatStatus};
///
/// # tokio_test::block_on(async {
/// let events = HeartbeatEvents::new();
/// let mut rx = events.subscribe();
///
/// events.emit(HeartbeatEvent::new(HeartbeatStatus::OkToken));
///
/// assert_eq!(rx.recv().await.unwrap().status, HeartbeatStatus::OkToken);
/// assert_eq!(events.last().unwrap().status, HeartbeatStatus::OkToken);
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct HeartbeatEvents {
    tx: broadcast::Sender<HeartbeatEvent>,
    last: Arc<RwLock<Option<HeartbeatEvent>>>,
}

impl Default for HeartbeatEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl HeartbeatEvents {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            last: Arc::new(RwLock::new(None)),
        }
    }

    /// Publish `event`. Never blocks and never fails; having no subscribers
    /// is fine and slow subscribers lose the oldest events.
    pub fn emit(&self, event: HeartbeatEvent) {
        debug!(status = event.status.as_str(), "Heartbeat event");
        if let Ok(mut last) = self.last.write() {
            *last = Some(event.clone());
        }
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HeartbeatEvent> {
        self.tx.subscribe()
    }

    /// Most recently emitted event.
    pub fn last(&self) -> Option<HeartbeatEvent> {
        self.last.read().ok().and_then(|last| last.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_subscribers() {
        let events = HeartbeatEvents::new();
        assert!(events.last().is_none());
        events.emit(HeartbeatEvent::new(HeartbeatStatus::OkEmpty));
        assert_eq!(events.last().unwrap().status, HeartbeatStatus::OkEmpty);
    }

    #[tokio::test]
    async fn test_subscribers_receive_events_in_order() {
        let events = HeartbeatEvents::new();
        let mut rx = events.subscribe();
        events.emit(HeartbeatEvent::new(HeartbeatStatus::OkToken));
        events.emit(HeartbeatEvent::new(HeartbeatStatus::Failed).with_reason("boom"));

        assert_eq!(rx.recv().await.unwrap().status, HeartbeatStatus::OkToken);
        let failed = rx.recv().await.unwrap();
        assert_eq!(failed.status, HeartbeatStatus::Failed);
        assert_eq!(failed.reason.as_deref(), Some("boom"));
    }

    #[test]
    fn test_event_serializes_kebab_status() {
        let event = HeartbeatEvent {
            ts: 1,
            status: HeartbeatStatus::OkEmpty,
            to: None,
            preview: None,
            duration_ms: Some(12),
            has_media: None,
            reason: None,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["status"], "ok-empty");
        assert_eq!(json["durationMs"], 12);
        assert!(json.get("to").is_none());
    }

    #[test]
    fn test_truncate_preview_counts_chars() {
        let text = "é".repeat(300);
        assert_eq!(truncate_preview(&text).chars().count(), PREVIEW_CHARS);
        assert_eq!(truncate_preview("short"), "short");
    }
}
