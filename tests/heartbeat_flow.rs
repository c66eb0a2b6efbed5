//! End-to-end heartbeat flows through the public API.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use heartwire::channels::{ChannelKind, ChannelSenders, MessageSender, SendOptions};
use heartwire::heartbeat::{
    start_heartbeat_runner, HeartbeatEvents, HeartbeatRunResult, HeartbeatRunner, HeartbeatStatus,
    SkipReason, WakeScheduler, DEFAULT_COALESCE,
};
use heartwire::queue::{LaneTracker, MAIN_LANE};
use heartwire::reply::{ReplyContext, ReplyEngine, ReplyOptions, ReplyOutput, ReplyPayload};
use heartwire::session::{JsonSessionStore, SessionEntry, SessionMap, SessionStore};
use heartwire::{Config, Result};

const UPDATED_AT: i64 = 1_700_000_000_000;

/// Reply engine that touches the session like a real conversation turn.
struct ScriptedEngine {
    store: Arc<dyn SessionStore>,
    replies: Mutex<VecDeque<Option<ReplyOutput>>>,
    calls: AtomicUsize,
}

impl ScriptedEngine {
    fn new(store: Arc<dyn SessionStore>, replies: Vec<Option<ReplyOutput>>) -> Self {
        Self {
            store,
            replies: Mutex::new(replies.into()),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ReplyEngine for ScriptedEngine {
    async fn generate(
        &self,
        ctx: ReplyContext,
        options: ReplyOptions,
        config: &Config,
    ) -> Result<Option<ReplyOutput>> {
        assert!(options.is_heartbeat);
        assert_eq!(ctx.surface, "heartbeat");
        self.calls.fetch_add(1, Ordering::SeqCst);

        let path = config.session.store_path();
        let mut sessions = self.store.load(&path).await?;
        if let Some(entry) = sessions.get_mut("main") {
            entry.updated_at = Some(entry.updated_at.unwrap_or(0) + 60_000);
        }
        self.store.save(&path, &sessions).await?;

        Ok(self.replies.lock().unwrap().pop_front().flatten())
    }
}

#[derive(Default)]
struct Outbox {
    sent: Mutex<Vec<(String, String, Option<String>)>>,
}

#[async_trait]
impl MessageSender for Outbox {
    async fn send(&self, to: &str, text: &str, options: SendOptions) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), text.to_string(), options.media_url));
        Ok(())
    }
}

#[derive(Default)]
struct MemoryStore {
    sessions: Mutex<SessionMap>,
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn load(&self, _path: &Path) -> Result<SessionMap> {
        Ok(self.sessions.lock().unwrap().clone())
    }

    async fn save(&self, _path: &Path, sessions: &SessionMap) -> Result<()> {
        *self.sessions.lock().unwrap() = sessions.clone();
        Ok(())
    }
}

fn telegram_session() -> SessionMap {
    let mut sessions = SessionMap::new();
    sessions.insert(
        "main".to_string(),
        SessionEntry {
            session_id: Some("abc".to_string()),
            updated_at: Some(UPDATED_AT),
            last_channel: Some("telegram".to_string()),
            last_to: Some("u1".to_string()),
            ..Default::default()
        },
    );
    sessions
}

fn text(reply: &str) -> Option<ReplyOutput> {
    Some(ReplyOutput::Single(ReplyPayload::text(reply)))
}

#[tokio::test]
async fn test_silent_then_long_reply_with_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let store_path = dir.path().join("state").join("sessions.json");
    let store: Arc<dyn SessionStore> = Arc::new(JsonSessionStore::new());
    store.save(&store_path, &telegram_session()).await.unwrap();

    let mut config = Config::default();
    config.session.store = Some(store_path.display().to_string());

    let long_reply = "Overnight job report line.\n".repeat(400);
    let engine = Arc::new(ScriptedEngine::new(
        Arc::clone(&store),
        vec![text("HEARTBEAT_OK"), text(&long_reply)],
    ));
    let outbox = Arc::new(Outbox::default());
    let runner = HeartbeatRunner::new(
        Arc::new(config),
        engine.clone(),
        ChannelSenders::new().with(ChannelKind::Telegram, outbox.clone()),
        Arc::clone(&store),
        Arc::new(LaneTracker::new()),
    );

    // Silent run: nothing sent, freshness untouched.
    let first = runner.run_once(Some("interval")).await;
    assert!(matches!(first, HeartbeatRunResult::Ran { .. }));
    assert!(outbox.sent.lock().unwrap().is_empty());
    let sessions = store.load(&store_path).await.unwrap();
    assert_eq!(sessions["main"].updated_at, Some(UPDATED_AT));
    assert_eq!(runner.events().last().unwrap().status, HeartbeatStatus::OkToken);

    // Long reply: chunked, in order, losslessly.
    let second = runner.run_once(Some("interval")).await;
    assert!(matches!(second, HeartbeatRunResult::Ran { .. }));
    let sent = outbox.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 3);
    assert!(sent.iter().all(|(to, _, _)| to == "u1"));
    let rejoined: String = sent.iter().map(|(_, text, _)| text.as_str()).collect();
    assert_eq!(rejoined, long_reply.trim());

    let event = runner.events().last().unwrap();
    assert_eq!(event.status, HeartbeatStatus::Sent);
    assert_eq!(event.preview.unwrap().chars().count(), 200);
    assert_eq!(engine.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_scheduled_wake_backs_off_while_main_lane_is_busy() {
    let store = Arc::new(MemoryStore {
        sessions: Mutex::new(telegram_session()),
    });
    let engine = Arc::new(ScriptedEngine::new(
        store.clone(),
        vec![text("Standup moved to 10:30")],
    ));
    let outbox = Arc::new(Outbox::default());
    let lanes = LaneTracker::new();

    let mut config = Config::default();
    config.heartbeat.every = Some("1h".to_string());
    let runner = Arc::new(HeartbeatRunner::new(
        Arc::new(config),
        engine.clone(),
        ChannelSenders::new().with(ChannelKind::Telegram, outbox.clone()),
        store.clone(),
        Arc::new(lanes.clone()),
    ));
    let mut events = runner.events().subscribe();

    let busy = lanes.enter(MAIN_LANE);
    let scheduler = WakeScheduler::new();
    let handle = start_heartbeat_runner(Arc::clone(&runner), &scheduler, None);
    scheduler.request_now(Some("hook"), DEFAULT_COALESCE);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
    assert!(scheduler.has_pending());

    drop(busy);
    tokio::time::sleep(Duration::from_millis(1_000)).await;
    assert_eq!(engine.calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        outbox.sent.lock().unwrap().clone(),
        vec![("u1".to_string(), "Standup moved to 10:30".to_string(), None)]
    );

    let event = events.recv().await.unwrap();
    assert_eq!(event.status, HeartbeatStatus::Sent);
    assert_eq!(event.to.as_deref(), Some("u1"));

    // Delivered replies count as activity; freshness is not restored.
    let updated = store.sessions.lock().unwrap()["main"].updated_at;
    assert_eq!(updated, Some(UPDATED_AT + 60_000));

    handle.stop();
    assert!(!scheduler.has_handler());
}

#[tokio::test]
async fn test_disabled_runner_never_generates() {
    let store: Arc<dyn SessionStore> = Arc::new(MemoryStore::default());
    let engine = Arc::new(ScriptedEngine::new(Arc::clone(&store), vec![]));
    let events = HeartbeatEvents::new();
    let runner = HeartbeatRunner::new(
        Arc::new(Config::default()),
        engine.clone(),
        ChannelSenders::logging(),
        store,
        Arc::new(LaneTracker::new()),
    )
    .with_events(events.clone());

    runner.set_enabled(false);
    assert_eq!(
        runner.run_once(None).await,
        HeartbeatRunResult::Skipped {
            reason: SkipReason::Disabled
        }
    );
    runner.set_enabled(true);
    assert!(matches!(
        runner.run_once(None).await,
        HeartbeatRunResult::Ran { .. }
    ));
    assert_eq!(engine.calls.load(Ordering::SeqCst), 1);
    assert_eq!(events.last().unwrap().status, HeartbeatStatus::OkEmpty);
}
