//! Shared CLI helpers: config loading and runner assembly.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use heartwire::channels::{ChannelKind, ChannelSenders, LogSender, MessageSender, WebhookSender};
use heartwire::config::Config;
use heartwire::heartbeat::HeartbeatRunner;
use heartwire::queue::LaneTracker;
use heartwire::reply::CommandReplyEngine;
use heartwire::session::JsonSessionStore;

pub(crate) fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load configuration from {:?}", path)),
        None => Config::load().with_context(|| "Failed to load configuration"),
    }
}

/// Webhook senders when an outbound URL is configured, log-only otherwise.
pub(crate) fn build_senders(config: &Config) -> ChannelSenders {
    let webhook = config
        .outbound
        .webhook_url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty());

    let mut senders = ChannelSenders::new();
    for kind in [ChannelKind::WhatsApp, ChannelKind::Telegram] {
        let sender: Arc<dyn MessageSender> = match webhook {
            Some(url) => Arc::new(WebhookSender::new(kind, url)),
            None => Arc::new(LogSender::new(kind)),
        };
        senders.register(kind, sender);
    }
    senders
}

pub(crate) fn build_runner(config: Config) -> Result<(Arc<HeartbeatRunner>, LaneTracker)> {
    let command = config
        .reply
        .command
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .with_context(|| {
            "No reply command configured. Set reply.command or HEARTWIRE_REPLY_COMMAND"
        })?;

    let mut engine = CommandReplyEngine::new(command);
    if let Some(timeout) = config.reply.timeout() {
        engine = engine.with_timeout(timeout);
    }

    let senders = build_senders(&config);
    let lanes = LaneTracker::new();
    info!(
        store = ?config.session.store_path(),
        channels = senders.channels().len(),
        "Assembling heartbeat runner"
    );

    let runner = HeartbeatRunner::new(
        Arc::new(config),
        Arc::new(engine),
        senders,
        Arc::new(JsonSessionStore::new()),
        Arc::new(lanes.clone()),
    );
    Ok((Arc::new(runner), lanes))
}
