//! Session freshness protection.
//!
//! Generating a heartbeat reply goes through the same machinery as a real
//! conversation, which bumps the session's `updatedAt`. When the run turns
//! out to have no visible effect, that bump must be undone so heartbeat
//! probing never looks like user activity.

use std::path::Path;

use tracing::debug;

use crate::error::Result;
use crate::session::{SessionEntry, SessionStore};

/// `updatedAt` of the heartbeat session captured before a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessSnapshot {
    pub updated_at: Option<i64>,
}

impl FreshnessSnapshot {
    pub fn capture(entry: Option<&SessionEntry>) -> Self {
        Self {
            updated_at: entry.and_then(|e| e.updated_at),
        }
    }
}

/// Put `updatedAt` of `session_key` back to the snapshot value.
///
/// Reloads the store rather than trusting any earlier copy, since live
/// traffic may have rewritten it in the meantime. Only `updatedAt` is
/// replaced. Does nothing when there was no timestamp to begin with, when
/// the entry is gone, or when the timestamp already matches.
///
/// Returns whether the store was rewritten.
pub async fn restore_updated_at(
    store: &dyn SessionStore,
    store_path: &Path,
    session_key: &str,
    snapshot: FreshnessSnapshot,
) -> Result<bool> {
    let Some(previous) = snapshot.updated_at else {
        return Ok(false);
    };

    let mut sessions = store.load(store_path).await?;
    let Some(entry) = sessions.get_mut(session_key) else {
        return Ok(false);
    };
    if entry.updated_at == Some(previous) {
        return Ok(false);
    }

    debug!(
        session = session_key,
        from = ?entry.updated_at,
        to = previous,
        "Restoring session freshness after heartbeat"
    );
    entry.updated_at = Some(previous);
    store.save(store_path, &sessions).await?;
    Ok(true)
}
