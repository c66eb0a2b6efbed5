//! Work lanes and the backpressure probe.
//!
//! Live conversation traffic runs in named lanes. A heartbeat checks the
//! primary lane before doing anything and backs off while it is busy, so
//! proactive output never interleaves with an in-flight conversation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Name of the primary conversation lane.
pub const MAIN_LANE: &str = "main";

type LaneCounts = HashMap<String, usize>;

/// Counts stay usable after a panic elsewhere; each update is a single
/// increment or decrement, so a poisoned map is still consistent.
fn lock_counts(counts: &Mutex<LaneCounts>) -> MutexGuard<'_, LaneCounts> {
    counts.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Reports how much work is queued or running in a lane.
#[cfg_attr(test, mockall::automock)]
pub trait QueueProbe: Send + Sync {
    /// Queued plus active items in `lane`. Read fresh on every call.
    fn queue_size(&self, lane: &str) -> usize;
}

/// In-process lane counter.
///
/// Each unit of work holds a [`LaneGuard`] for as long as it is queued or
/// running; dropping the guard releases the slot.
///
/// ```
/// use heartwire::queue::{LaneTracker, QueueProbe, MAIN_LANE};
///
/// let lanes = LaneTracker::new();
/// let guard = lanes.enter(MAIN_LANE);
/// assert_eq!(lanes.queue_size(MAIN_LANE), 1);
/// drop(guard);
/// assert_eq!(lanes.queue_size(MAIN_LANE), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct LaneTracker {
    counts: Arc<Mutex<LaneCounts>>,
}

impl LaneTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark one unit of work as present in `lane` until the guard drops.
    pub fn enter(&self, lane: &str) -> LaneGuard {
        *lock_counts(&self.counts)
            .entry(lane.to_string())
            .or_insert(0) += 1;
        LaneGuard {
            counts: Arc::clone(&self.counts),
            lane: lane.to_string(),
        }
    }
}

impl QueueProbe for LaneTracker {
    fn queue_size(&self, lane: &str) -> usize {
        lock_counts(&self.counts).get(lane).copied().unwrap_or(0)
    }
}

/// Holds a slot in a lane. See [`LaneTracker::enter`].
#[derive(Debug)]
pub struct LaneGuard {
    counts: Arc<Mutex<LaneCounts>>,
    lane: String,
}

impl Drop for LaneGuard {
    fn drop(&mut self) {
        let mut counts = lock_counts(&self.counts);
        if let Some(count) = counts.get_mut(&self.lane) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                counts.remove(&self.lane);
            }
        }
    }
}
