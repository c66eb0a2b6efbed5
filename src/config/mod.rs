//! Configuration for Heartwire
//!
//! Configuration is read from `~/.heartwire/config.json` (or an explicit
//! path) and then patched with `HEARTWIRE_*` environment overrides. Every
//! section uses `#[serde(default)]`, so a partial or empty file is valid.
//!
//! ```json
//! {
//!     "heartbeat": { "every": "30m", "target": "last" },
//!     "session": { "scope": "per-sender", "main_key": "main" },
//!     "whatsapp": { "allow_from": ["+15550001111"] },
//!     "messages": { "response_prefix": "[bot]" },
//!     "reply": { "command": "my-agent --once", "timeout_secs": 60 }
//! }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::utils::duration::parse_interval;

/// Interval used when `heartbeat.every` is not set.
pub const DEFAULT_HEARTBEAT_EVERY: &str = "30m";

/// Session key used when `session.main_key` is blank.
pub const DEFAULT_MAIN_KEY: &str = "main";

// ---------------------------------------------------------------------------
// Heartbeat
// ---------------------------------------------------------------------------

/// Where heartbeat replies are delivered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HeartbeatTarget {
    /// Whichever channel the user most recently used.
    #[default]
    Last,
    WhatsApp,
    Telegram,
    /// Never deliver.
    None,
}

impl HeartbeatTarget {
    /// Parse a configured target leniently; unknown values mean `Last`.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_lowercase()).as_deref() {
            Some("whatsapp") => Self::WhatsApp,
            Some("telegram") => Self::Telegram,
            Some("none") => Self::None,
            _ => Self::Last,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Last => "last",
            Self::WhatsApp => "whatsapp",
            Self::Telegram => "telegram",
            Self::None => "none",
        }
    }
}

/// Heartbeat section of the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    /// Interval between heartbeats (`30m`, `1h`, ...). Blank disables.
    pub every: Option<String>,
    /// Prompt override; the built-in heartbeat prompt is used when unset.
    pub prompt: Option<String>,
    /// Delivery target: `last`, `whatsapp`, `telegram` or `none`.
    pub target: Option<String>,
    /// Explicit recipient overriding the last-known one.
    pub to: Option<String>,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            every: Some(DEFAULT_HEARTBEAT_EVERY.to_string()),
            prompt: None,
            target: None,
            to: None,
        }
    }
}

impl HeartbeatConfig {
    /// Resolved heartbeat interval, or `None` if heartbeats are not scheduled.
    ///
    /// Missing, blank, unparsable and zero intervals all mean "no interval".
    pub fn interval(&self) -> Option<Duration> {
        let raw = self.every.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }
        match parse_interval(raw) {
            Ok(interval) if !interval.is_zero() => Some(interval),
            Ok(_) => None,
            Err(e) => {
                debug!("Ignoring heartbeat interval {:?}: {}", raw, e);
                None
            }
        }
    }

    pub fn target(&self) -> HeartbeatTarget {
        HeartbeatTarget::parse(self.target.as_deref())
    }

    /// Explicit recipient, trimmed; blank counts as unset.
    pub fn explicit_to(&self) -> Option<&str> {
        self.to.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// How conversations map to session entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionScope {
    /// One session per sender; heartbeats use the main key.
    #[default]
    PerSender,
    /// A single shared session.
    Global,
}

/// Session section of the config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub scope: SessionScope,
    /// Key of the primary session in per-sender scope.
    pub main_key: Option<String>,
    /// Path of the session store file. `~` is expanded.
    pub store: Option<String>,
}

impl SessionConfig {
    /// Session key the heartbeat reads and protects.
    pub fn heartbeat_session_key(&self) -> String {
        match self.scope {
            SessionScope::Global => "global".to_string(),
            SessionScope::PerSender => self
                .main_key
                .as_deref()
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .unwrap_or(DEFAULT_MAIN_KEY)
                .to_string(),
        }
    }

    /// Resolved session store path.
    pub fn store_path(&self) -> PathBuf {
        match self.store.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => expand_home(raw),
            None => Config::dir().join("sessions.json"),
        }
    }
}

// ---------------------------------------------------------------------------
// Channels, messages, collaborators
// ---------------------------------------------------------------------------

/// WhatsApp routing configuration. WhatsApp is the allow-list restricted channel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WhatsAppConfig {
    /// Recipients allowed on WhatsApp. `"*"` lifts the restriction.
    pub allow_from: Vec<String>,
}

/// Outgoing message formatting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagesConfig {
    /// Prefix prepended to every heartbeat reply, e.g. `[bot]`.
    pub response_prefix: Option<String>,
}

/// Reply engine used by the CLI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplyConfig {
    /// Shell command that receives the prompt on stdin and prints the reply.
    pub command: Option<String>,
    /// Upper bound on one command run, prompt write included.
    pub timeout_secs: Option<u64>,
}

impl ReplyConfig {
    /// Configured command timeout. Zero or unset keeps the engine default.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

/// Outbound transport used by the CLI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutboundConfig {
    /// Webhook receiving deliveries as JSON. Deliveries are only logged when unset.
    pub webhook_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Root config
// ---------------------------------------------------------------------------

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub heartbeat: HeartbeatConfig,
    pub session: SessionConfig,
    pub whatsapp: WhatsAppConfig,
    pub messages: MessagesConfig,
    pub reply: ReplyConfig,
    pub outbound: OutboundConfig,
}

impl Config {
    /// Heartwire home directory (`~/.heartwire`).
    pub fn dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".heartwire")
    }

    /// Default config file path.
    pub fn path() -> PathBuf {
        Self::dir().join("config.json")
    }

    /// Load from the default path, falling back to defaults if it is missing.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path())
    }

    /// Load from `path` and apply environment overrides.
    ///
    /// A missing file yields the default config; an unreadable or malformed
    /// one is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str::<Config>(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No config at {:?}, using defaults", path);
                Config::default()
            }
            Err(e) => return Err(e.into()),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply `HEARTWIRE_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("HEARTWIRE_HEARTBEAT_EVERY") {
            self.heartbeat.every = Some(val);
        }
        if let Ok(val) = std::env::var("HEARTWIRE_HEARTBEAT_TARGET") {
            if !matches!(
                val.trim().to_lowercase().as_str(),
                "last" | "whatsapp" | "telegram" | "none"
            ) {
                warn!("Unknown HEARTWIRE_HEARTBEAT_TARGET {:?}, using 'last'", val);
            }
            self.heartbeat.target = Some(val);
        }
        if let Ok(val) = std::env::var("HEARTWIRE_HEARTBEAT_TO") {
            self.heartbeat.to = Some(val);
        }
        if let Ok(val) = std::env::var("HEARTWIRE_SESSION_STORE") {
            self.session.store = Some(val);
        }
        if let Ok(val) = std::env::var("HEARTWIRE_REPLY_COMMAND") {
            self.reply.command = Some(val);
        }
        if let Ok(val) = std::env::var("HEARTWIRE_WEBHOOK_URL") {
            self.outbound.webhook_url = Some(val);
        }
    }
}

fn expand_home(raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    } else if raw == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(raw)
}
