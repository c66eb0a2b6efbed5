//! File-backed session store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{HeartwireError, Result};

use super::{SessionMap, SessionStore};

/// Session store persisted as a single JSON object.
///
/// Saves go through a temporary file and a rename so readers never observe
/// a half-written store. Concurrent writers are not coordinated: the last
/// rename wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSessionStore;

impl JsonSessionStore {
    pub fn new() -> Self {
        Self
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "sessions.json".to_string());
    path.with_file_name(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()))
}

#[async_trait]
impl SessionStore for JsonSessionStore {
    async fn load(&self, path: &Path) -> Result<SessionMap> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Session store missing at {:?}, treating as empty", path);
                return Ok(SessionMap::new());
            }
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(SessionMap::new());
        }

        match serde_json::from_str::<SessionMap>(&content) {
            Ok(sessions) => Ok(sessions),
            Err(e) => {
                warn!("Session store {:?} is not valid JSON ({}), treating as empty", path, e);
                Ok(SessionMap::new())
            }
        }
    }

    async fn save(&self, path: &Path, sessions: &SessionMap) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(sessions)?;
        let tmp = temp_path(path);
        tokio::fs::write(&tmp, json).await?;
        if let Err(e) = tokio::fs::rename(&tmp, path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(HeartwireError::Session(format!(
                "Failed to replace session store {:?}: {}",
                path, e
            )));
        }
        Ok(())
    }
}
