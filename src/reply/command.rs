//! Reply engine backed by an external shell command.
//!
//! The command receives the prompt on stdin and the synthetic sender,
//! recipient and surface in `HEARTWIRE_*` environment variables. Its stdout
//! is the reply: a JSON payload (`{"text": ..., "mediaUrls": [...]}`), a
//! JSON list of payloads, or plain text. Empty output means "no reply".

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::config::Config;
use crate::error::{HeartwireError, Result};

use super::{ReplyContext, ReplyEngine, ReplyOptions, ReplyOutput, ReplyPayload};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Runs a shell command per reply request.
#[derive(Debug, Clone)]
pub struct CommandReplyEngine {
    command: String,
    timeout: Duration,
}

impl CommandReplyEngine {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Interpret command output as a reply.
fn parse_reply_output(stdout: &str) -> Option<ReplyOutput> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return None;
    }

    if trimmed.starts_with('{') {
        if let Ok(payload) = serde_json::from_str::<ReplyPayload>(trimmed) {
            return Some(ReplyOutput::Single(payload));
        }
    } else if trimmed.starts_with('[') {
        if let Ok(payloads) = serde_json::from_str::<Vec<ReplyPayload>>(trimmed) {
            return Some(ReplyOutput::Many(payloads));
        }
    }

    Some(ReplyOutput::Single(ReplyPayload::text(trimmed)))
}

#[async_trait]
impl ReplyEngine for CommandReplyEngine {
    async fn generate(
        &self,
        ctx: ReplyContext,
        options: ReplyOptions,
        _config: &Config,
    ) -> Result<Option<ReplyOutput>> {
        if self.command.trim().is_empty() {
            return Err(HeartwireError::Config("Reply command is empty".to_string()));
        }

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .env("HEARTWIRE_FROM", &ctx.from)
            .env("HEARTWIRE_TO", &ctx.to)
            .env("HEARTWIRE_SURFACE", &ctx.surface)
            .env(
                "HEARTWIRE_HEARTBEAT",
                if options.is_heartbeat { "1" } else { "0" },
            )
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                HeartwireError::Provider(format!("Failed to spawn reply command: {}", e))
            })?;

        let stdin = child.stdin.take();
        let prompt = ctx.body.as_bytes();
        let run = async move {
            if let Some(mut stdin) = stdin {
                if let Err(e) = stdin.write_all(prompt).await {
                    // Commands are free to ignore the prompt.
                    if e.kind() != std::io::ErrorKind::BrokenPipe {
                        return Err(e);
                    }
                }
            }
            child.wait_with_output().await
        };

        let output = tokio::time::timeout(self.timeout, run)
            .await
            .map_err(|_| {
                HeartwireError::Provider(format!(
                    "Reply command timed out after {}s",
                    self.timeout.as_secs()
                ))
            })??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(HeartwireError::Provider(format!(
                "Reply command exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        debug!(bytes = output.stdout.len(), "Reply command finished");
        Ok(parse_reply_output(&stdout))
    }
}
