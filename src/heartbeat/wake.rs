//! Coalescing wake scheduler.
//!
//! Wake requests from the interval timer and from external triggers are
//! collapsed into single handler invocations. A burst of requests inside
//! the coalesce window produces one run carrying the latest reason. Runs
//! that are turned away because live traffic is in flight are retried
//! after [`RETRY_DELAY`].
//!
//! Timers are plain Tokio tasks tagged with a generation number. Arming a
//! new wake or stopping the scheduler bumps the generation, which turns any
//! older timer into a no-op when it eventually fires.
//!
//! A bound shutdown signal is checked under the same lock that hands out
//! the handler, so once it reads `true` no new run can start.

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

use super::runner::{HeartbeatRunResult, SkipReason};

/// Window used when a request does not name one.
pub const DEFAULT_COALESCE: Duration = Duration::from_millis(250);

/// Delay before retrying a run skipped for `requests-in-flight`.
pub const RETRY_DELAY: Duration = Duration::from_millis(1000);

const DEFAULT_REASON: &str = "requested";
const INTERVAL_REASON: &str = "interval";

/// Receives coalesced wakes.
#[async_trait]
pub trait WakeHandler: Send + Sync {
    async fn on_wake(&self, reason: Option<String>) -> HeartbeatRunResult;
}

#[derive(Default)]
struct WakeState {
    handler: Option<Arc<dyn WakeHandler>>,
    pending_reason: Option<String>,
    /// Deadline of the armed wake, if any.
    deadline: Option<Instant>,
    generation: u64,
    running: bool,
    interval_task: Option<JoinHandle<()>>,
    shutdown: Option<watch::Receiver<bool>>,
}

impl WakeState {
    fn shutdown_requested(&self) -> bool {
        self.shutdown.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Cancel the interval, disarm the pending wake and clear the handler.
    fn halt(&mut self) {
        if let Some(task) = self.interval_task.take() {
            task.abort();
        }
        self.generation = self.generation.wrapping_add(1);
        self.deadline = None;
        self.handler = None;
        self.shutdown = None;
    }

    /// Halt if the bound shutdown signal has fired. Returns whether it had.
    fn halt_on_shutdown(&mut self) -> bool {
        if !self.shutdown_requested() {
            return false;
        }
        debug!("Wake scheduler halted by shutdown signal");
        self.halt();
        true
    }
}

#[derive(Default)]
struct Inner {
    state: Mutex<WakeState>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, WakeState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Single-slot, coalescing wake dispatcher.
///
/// Cheap to clone; clones share the same state. All methods that arm
/// timers must be called from within a Tokio runtime.
#[derive(Clone, Default)]
pub struct WakeScheduler {
    inner: Arc<Inner>,
}

impl WakeScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask for a run within `coalesce`.
    ///
    /// The reason replaces any pending one. When a wake is already armed
    /// the earlier of the two deadlines is kept.
    pub fn request_now(&self, reason: Option<&str>, coalesce: Duration) {
        let reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_REASON);
        let mut state = self.inner.lock();
        state.pending_reason = Some(reason.to_string());
        if state.halt_on_shutdown() {
            return;
        }
        arm(&self.inner, &mut state, coalesce);
    }

    /// Swap the handler slot. A pending reason is delivered to the new
    /// handler after the default window. Any bound shutdown signal belonged
    /// to the previous handler and is dropped.
    pub fn set_handler(&self, handler: Option<Arc<dyn WakeHandler>>) {
        let mut state = self.inner.lock();
        state.handler = handler;
        state.shutdown = None;
        if state.handler.is_some() && state.pending_reason.is_some() {
            arm(&self.inner, &mut state, DEFAULT_COALESCE);
        }
    }

    /// Arm the periodic timer, replacing any previous one. `None` or a
    /// zero interval leaves no timer running.
    pub fn start(&self, interval: Option<Duration>) {
        let mut state = self.inner.lock();
        if let Some(task) = state.interval_task.take() {
            task.abort();
        }
        let Some(every) = interval.filter(|d| !d.is_zero()) else {
            debug!("Heartbeat interval disabled");
            return;
        };

        debug!(every_ms = every.as_millis() as u64, "Heartbeat interval armed");
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        state.interval_task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                WakeScheduler { inner }.request_now(Some(INTERVAL_REASON), Duration::ZERO);
            }
        }));
    }

    /// Cancel the interval, disarm any pending wake and clear the handler.
    /// Calling it again does nothing.
    pub fn stop(&self) {
        self.inner.lock().halt();
    }

    /// Tie the current handler to `shutdown`. From the moment it reads
    /// `true` the scheduler behaves as stopped: no run starts and
    /// [`has_handler`](Self::has_handler) is false.
    pub fn bind_shutdown(&self, shutdown: watch::Receiver<bool>) {
        let mut state = self.inner.lock();
        state.shutdown = Some(shutdown);
        state.halt_on_shutdown();
    }

    /// [`stop`](Self::stop), but only while `handler` still owns the slot.
    /// Returns whether the scheduler was stopped.
    pub fn stop_if_current(&self, handler: &Arc<dyn WakeHandler>) -> bool {
        let owns_slot = {
            let state = self.inner.lock();
            state
                .handler
                .as_ref()
                .is_some_and(|current| same_handler(current, handler))
        };
        if owns_slot {
            self.stop();
        }
        owns_slot
    }

    pub fn has_handler(&self) -> bool {
        let state = self.inner.lock();
        state.handler.is_some() && !state.shutdown_requested()
    }

    pub fn has_pending(&self) -> bool {
        self.inner.lock().pending_reason.is_some()
    }
}

fn same_handler(a: &Arc<dyn WakeHandler>, b: &Arc<dyn WakeHandler>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

/// Arm a wake `delay` from now unless an earlier one is already armed.
fn arm(inner: &Arc<Inner>, state: &mut WakeState, delay: Duration) {
    let due = Instant::now() + delay;
    if state.deadline.is_some_and(|armed| armed <= due) {
        return;
    }
    state.generation = state.generation.wrapping_add(1);
    state.deadline = Some(due);

    let generation = state.generation;
    let inner = Arc::clone(inner);
    tokio::spawn(async move {
        tokio::time::sleep_until(due).await;
        fire(inner, generation).await;
    });
}

async fn fire(inner: Arc<Inner>, generation: u64) {
    let (handler, reason) = {
        let mut state = inner.lock();
        if state.generation != generation {
            return;
        }
        state.deadline = None;
        if state.halt_on_shutdown() {
            return;
        }
        // A busy or missing handler leaves the reason pending.
        if state.running {
            return;
        }
        let Some(handler) = state.handler.clone() else {
            return;
        };
        let Some(reason) = state.pending_reason.take() else {
            return;
        };
        state.running = true;
        (handler, reason)
    };

    debug!(reason = %reason, "Heartbeat wake");
    let wake_reason = reason.clone();
    let outcome = tokio::spawn(async move { handler.on_wake(Some(wake_reason)).await }).await;

    let retry = match outcome {
        Ok(HeartbeatRunResult::Skipped {
            reason: SkipReason::RequestsInFlight,
        }) => true,
        Ok(_) => false,
        Err(e) => {
            warn!(error = %e, "Heartbeat wake handler aborted");
            true
        }
    };

    let mut state = inner.lock();
    state.running = false;
    if state.halt_on_shutdown() {
        return;
    }
    if retry {
        if state.pending_reason.is_none() {
            state.pending_reason = Some(reason);
        }
        arm(&inner, &mut state, RETRY_DELAY);
    } else if state.pending_reason.is_some() && state.deadline.is_none() {
        arm(&inner, &mut state, DEFAULT_COALESCE);
    }
}
