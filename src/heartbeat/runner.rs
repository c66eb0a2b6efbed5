//! Heartbeat runner.
//!
//! One run walks a fixed sequence: check preconditions, generate a reply
//! through the reply engine, normalize it, resolve where it goes and
//! deliver it. Runs without visible output undo the session freshness bump
//! caused by reply generation. Every run that passes its preconditions
//! emits exactly one [`HeartbeatEvent`].

use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::channels::ChannelSenders;
use crate::config::Config;
use crate::error::Result;
use crate::queue::{QueueProbe, MAIN_LANE};
use crate::reply::{ReplyContext, ReplyEngine, ReplyOptions, ReplyOutput, HEARTBEAT_SURFACE};
use crate::session::SessionStore;

use super::delivery::{dispatch, plan_delivery};
use super::events::{truncate_preview, HeartbeatEvent, HeartbeatEvents, HeartbeatStatus};
use super::freshness::{restore_updated_at, FreshnessSnapshot};
use super::normalize::normalize_reply;
use super::target::{resolve_delivery_target, resolve_heartbeat_sender, TargetReason};
use super::tokens::resolve_heartbeat_prompt;
use super::wake::{WakeHandler, WakeScheduler};

/// Why a run did nothing at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Heartbeats are switched off.
    Disabled,
    /// No usable interval is configured.
    NoInterval,
    /// The main lane has queued or active work.
    RequestsInFlight,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::NoInterval => "no-interval",
            Self::RequestsInFlight => "requests-in-flight",
        }
    }
}

/// Result of [`HeartbeatRunner::run_once`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeartbeatRunResult {
    /// The run completed, whether or not anything was delivered.
    Ran { duration_ms: u64 },
    Skipped { reason: SkipReason },
    Failed { reason: String },
}

impl fmt::Display for HeartbeatRunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ran { duration_ms } => write!(f, "ran ({}ms)", duration_ms),
            Self::Skipped { reason } => write!(f, "skipped ({})", reason.as_str()),
            Self::Failed { reason } => write!(f, "failed ({})", reason),
        }
    }
}

/// Executes heartbeat runs against the configured collaborators.
pub struct HeartbeatRunner {
    config: Arc<Config>,
    enabled: AtomicBool,
    reply: Arc<dyn ReplyEngine>,
    senders: ChannelSenders,
    sessions: Arc<dyn SessionStore>,
    queue: Arc<dyn QueueProbe>,
    events: HeartbeatEvents,
    run_lock: Mutex<()>,
}

impl HeartbeatRunner {
    pub fn new(
        config: Arc<Config>,
        reply: Arc<dyn ReplyEngine>,
        senders: ChannelSenders,
        sessions: Arc<dyn SessionStore>,
        queue: Arc<dyn QueueProbe>,
    ) -> Self {
        Self {
            config,
            enabled: AtomicBool::new(true),
            reply,
            senders,
            sessions,
            queue,
            events: HeartbeatEvents::new(),
            run_lock: Mutex::new(()),
        }
    }

    /// Publish events into an existing sink instead of a private one.
    pub fn with_events(mut self, events: HeartbeatEvents) -> Self {
        self.events = events;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn events(&self) -> &HeartbeatEvents {
        &self.events
    }

    /// Global on/off switch. Disabled runs skip with `disabled`.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
        info!(enabled = enabled, "Heartbeats {}", if enabled { "enabled" } else { "disabled" });
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Perform one heartbeat. Never returns an error; failures are reported
    /// as [`HeartbeatRunResult::Failed`] and a `failed` event.
    pub async fn run_once(&self, reason: Option<&str>) -> HeartbeatRunResult {
        let _running = self.run_lock.lock().await;

        if !self.is_enabled() {
            return HeartbeatRunResult::Skipped {
                reason: SkipReason::Disabled,
            };
        }
        if self.config.heartbeat.interval().is_none() {
            return HeartbeatRunResult::Skipped {
                reason: SkipReason::NoInterval,
            };
        }
        let queued = self.queue.queue_size(MAIN_LANE);
        if queued > 0 {
            debug!(queued = queued, "Heartbeat skipped, main lane busy");
            return HeartbeatRunResult::Skipped {
                reason: SkipReason::RequestsInFlight,
            };
        }

        let run_id = Uuid::new_v4().to_string();
        let started = Instant::now();
        debug!(run_id = %run_id, reason = reason.unwrap_or(""), "Heartbeat run started");

        match self.execute(&run_id, reason, started).await {
            Ok(()) => HeartbeatRunResult::Ran {
                duration_ms: elapsed_ms(started),
            },
            Err(e) => {
                let duration_ms = elapsed_ms(started);
                error!(run_id = %run_id, duration_ms = duration_ms, "Heartbeat failed: {}", e);
                self.events.emit(
                    HeartbeatEvent::new(HeartbeatStatus::Failed)
                        .with_reason(e.to_string())
                        .with_duration(duration_ms),
                );
                HeartbeatRunResult::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn execute(&self, run_id: &str, reason: Option<&str>, started: Instant) -> Result<()> {
        let config = self.config.as_ref();
        let store_path = config.session.store_path();
        let session_key = config.session.heartbeat_session_key();
        let allow_from = &config.whatsapp.allow_from;

        let sessions = self.sessions.load(&store_path).await?;
        let entry = sessions.get(&session_key);
        let snapshot = FreshnessSnapshot::capture(entry);
        let origin = resolve_heartbeat_sender(allow_from, entry);

        let ctx = ReplyContext {
            body: resolve_heartbeat_prompt(config.heartbeat.prompt.as_deref()),
            from: origin.clone(),
            to: origin,
            surface: HEARTBEAT_SURFACE.to_string(),
        };
        let reply = self
            .reply
            .generate(ctx, ReplyOptions { is_heartbeat: true }, config)
            .await?;

        let payload = reply
            .and_then(ReplyOutput::into_payload)
            .filter(|p| !p.is_empty());
        let Some(payload) = payload else {
            self.restore(&store_path, &session_key, snapshot).await?;
            debug!(run_id = run_id, "Heartbeat reply empty");
            self.emit_ok(HeartbeatStatus::OkEmpty, reason, started);
            return Ok(());
        };

        let normalized = normalize_reply(&payload, config.messages.response_prefix.as_deref());
        if normalized.should_skip && !normalized.has_media {
            self.restore(&store_path, &session_key, snapshot).await?;
            debug!(run_id = run_id, "Heartbeat acknowledged, nothing to deliver");
            self.emit_ok(HeartbeatStatus::OkToken, reason, started);
            return Ok(());
        }

        let target = resolve_delivery_target(&config.heartbeat, entry, allow_from);
        let Some((channel, to)) = target.deliverable() else {
            let why = target.reason.unwrap_or(TargetReason::NoTarget);
            info!(run_id = run_id, reason = why.as_str(), "Heartbeat reply has no delivery target");
            let mut event = HeartbeatEvent::new(HeartbeatStatus::Skipped)
                .with_reason(why.as_str())
                .with_duration(elapsed_ms(started));
            event.preview = Some(truncate_preview(&normalized.text));
            self.events.emit(event);
            return Ok(());
        };

        let sender = self.senders.sender(channel)?;
        let plan = plan_delivery(&normalized.text, &payload.attachments());
        let parts = dispatch(sender.as_ref(), to, plan).await?;

        info!(
            run_id = run_id,
            channel = %channel,
            to = to,
            parts = parts,
            "Heartbeat delivered"
        );
        let mut event =
            HeartbeatEvent::new(HeartbeatStatus::Sent).with_duration(elapsed_ms(started));
        event.to = Some(to.to_string());
        event.preview = Some(truncate_preview(&normalized.text));
        event.has_media = Some(normalized.has_media);
        self.events.emit(event);
        Ok(())
    }

    async fn restore(
        &self,
        store_path: &Path,
        session_key: &str,
        snapshot: FreshnessSnapshot,
    ) -> Result<()> {
        restore_updated_at(self.sessions.as_ref(), store_path, session_key, snapshot).await?;
        Ok(())
    }

    fn emit_ok(&self, status: HeartbeatStatus, reason: Option<&str>, started: Instant) {
        let mut event = HeartbeatEvent::new(status).with_duration(elapsed_ms(started));
        event.reason = reason.map(str::to_string);
        self.events.emit(event);
    }
}

#[async_trait]
impl WakeHandler for HeartbeatRunner {
    async fn on_wake(&self, reason: Option<String>) -> HeartbeatRunResult {
        self.run_once(reason.as_deref()).await
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Handle returned by [`start_heartbeat_runner`].
#[derive(Clone)]
pub struct HeartbeatHandle {
    scheduler: WakeScheduler,
    handler: Arc<dyn WakeHandler>,
}

impl HeartbeatHandle {
    /// Stop scheduling heartbeats. Does nothing if another runner has
    /// since taken over the scheduler, or if already stopped.
    pub fn stop(&self) {
        if self.scheduler.stop_if_current(&self.handler) {
            info!("Heartbeat runner stopped");
        }
    }
}

/// Register `runner` as the scheduler's wake handler and arm the interval
/// from its config. A `true` on `shutdown` stops it like
/// [`HeartbeatHandle::stop`].
pub fn start_heartbeat_runner(
    runner: Arc<HeartbeatRunner>,
    scheduler: &WakeScheduler,
    shutdown: Option<watch::Receiver<bool>>,
) -> HeartbeatHandle {
    let interval = runner.config().heartbeat.interval();
    let handler: Arc<dyn WakeHandler> = runner;
    scheduler.set_handler(Some(Arc::clone(&handler)));
    scheduler.start(interval);
    if let Some(shutdown_rx) = &shutdown {
        scheduler.bind_shutdown(shutdown_rx.clone());
    }

    match interval {
        Some(every) => info!(every_secs = every.as_secs(), "Heartbeat runner started"),
        None => info!("Heartbeat runner started without interval"),
    }

    let handle = HeartbeatHandle {
        scheduler: scheduler.clone(),
        handler,
    };

    if let Some(mut shutdown_rx) = shutdown {
        let on_shutdown = handle.clone();
        tokio::spawn(async move {
            loop {
                if *shutdown_rx.borrow() {
                    break;
                }
                if shutdown_rx.changed().await.is_err() {
                    return;
                }
            }
            info!("Heartbeat runner shutting down");
            on_shutdown.stop();
        });
    }

    handle
}
