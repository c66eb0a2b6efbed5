//! Heartbeat command handlers.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tracing::info;

use heartwire::heartbeat::{
    resolve_delivery_target, resolve_heartbeat_sender, start_heartbeat_runner,
    HeartbeatRunResult, WakeScheduler, DEFAULT_COALESCE,
};
use heartwire::session::{JsonSessionStore, SessionStore};

use super::common::{build_runner, load_config};

/// Run one heartbeat and print its result and event.
pub(crate) async fn cmd_once(config: Option<PathBuf>, reason: String) -> Result<()> {
    let config = load_config(config.as_deref())?;
    let (runner, _lanes) = build_runner(config)?;

    let result = runner.run_once(Some(&reason)).await;
    println!("Heartbeat {}", result);
    if let Some(event) = runner.events().last() {
        println!("{}", serde_json::to_string_pretty(&event)?);
    }

    if let HeartbeatRunResult::Failed { reason } = result {
        anyhow::bail!("Heartbeat failed: {}", reason);
    }
    Ok(())
}

/// Run the scheduler until Ctrl+C.
pub(crate) async fn cmd_start(config: Option<PathBuf>, wake_now: bool) -> Result<()> {
    let config = load_config(config.as_deref())?;
    let interval = config.heartbeat.interval();
    let (runner, _lanes) = build_runner(config)?;

    let mut events = runner.events().subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            info!(
                status = event.status.as_str(),
                to = event.to.as_deref().unwrap_or(""),
                reason = event.reason.as_deref().unwrap_or(""),
                "Heartbeat event"
            );
        }
    });

    let scheduler = WakeScheduler::new();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = start_heartbeat_runner(runner, &scheduler, Some(shutdown_rx));
    if wake_now {
        scheduler.request_now(Some("startup"), DEFAULT_COALESCE);
    }

    match interval {
        Some(every) => println!("Heartbeat every {}s. Press Ctrl+C to stop.", every.as_secs()),
        None => println!("No heartbeat interval configured. Press Ctrl+C to stop."),
    }

    tokio::signal::ctrl_c()
        .await
        .with_context(|| "Failed to listen for Ctrl+C")?;
    let _ = shutdown_tx.send(true);
    handle.stop();
    println!("Stopped.");
    Ok(())
}

/// Print the resolved delivery target and origin identity.
pub(crate) async fn cmd_target(config: Option<PathBuf>) -> Result<()> {
    let config = load_config(config.as_deref())?;
    let store_path = config.session.store_path();
    let session_key = config.session.heartbeat_session_key();

    let sessions = JsonSessionStore::new()
        .load(&store_path)
        .await
        .with_context(|| format!("Failed to read session store {:?}", store_path))?;
    let entry = sessions.get(&session_key);

    let allow_from = &config.whatsapp.allow_from;
    let target = resolve_delivery_target(&config.heartbeat, entry, allow_from);
    let origin = resolve_heartbeat_sender(allow_from, entry);

    println!("Session:  {} ({:?})", session_key, store_path);
    println!("Mode:     {}", config.heartbeat.target().as_str());
    match target.deliverable() {
        Some((channel, to)) => println!("Target:   {} -> {}", channel, to),
        None => println!("Target:   none"),
    }
    if let Some(reason) = target.reason {
        println!("Reason:   {}", reason);
    }
    println!("Origin:   {}", origin);
    Ok(())
}
