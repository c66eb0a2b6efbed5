//! Delivery target resolution.
//!
//! Decides which channel and recipient receive a heartbeat reply from the
//! configured target mode, the last-known session state and the WhatsApp
//! allow-list. Resolution is pure: the same inputs always give the same
//! target.
//!
//! WhatsApp is the allow-list restricted channel. When its allow-list is
//! non-empty and has no wildcard, a resolved WhatsApp recipient is always a
//! member of it: an unknown candidate is replaced by the first entry rather
//! than matched loosely.

use std::fmt;

use crate::channels::{normalize_e164, ChannelKind};
use crate::config::{HeartbeatConfig, HeartbeatTarget};
use crate::session::SessionEntry;

/// Allow-list entry that lifts the restriction.
pub const ALLOW_ALL: &str = "*";

/// Sender identity used when nothing better is known.
pub const FALLBACK_SENDER: &str = "heartbeat";

/// Why a target resolved the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetReason {
    /// Target mode is `none`.
    TargetNone,
    /// No channel or no recipient could be determined.
    NoTarget,
    /// Candidate was outside the allow-list; the first entry was used instead.
    AllowFromFallback,
}

impl TargetReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TargetNone => "target-none",
            Self::NoTarget => "no-target",
            Self::AllowFromFallback => "allowFrom-fallback",
        }
    }
}

impl fmt::Display for TargetReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved destination. `channel == None` or `to == None` means "do not deliver".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryTarget {
    pub channel: Option<ChannelKind>,
    pub to: Option<String>,
    pub reason: Option<TargetReason>,
}

impl DeliveryTarget {
    fn nowhere(reason: TargetReason) -> Self {
        Self {
            channel: None,
            to: None,
            reason: Some(reason),
        }
    }

    fn reach(channel: ChannelKind, to: impl Into<String>) -> Self {
        Self {
            channel: Some(channel),
            to: Some(to.into()),
            reason: None,
        }
    }

    /// Channel and recipient, if this target can be delivered to.
    pub fn deliverable(&self) -> Option<(ChannelKind, &str)> {
        match (self.channel, self.to.as_deref()) {
            (Some(channel), Some(to)) if !to.is_empty() => Some((channel, to)),
            _ => None,
        }
    }
}

/// Allow-list entries in E.164 form, without blanks and wildcards.
fn normalized_allow_list(allow_from: &[String]) -> Vec<String> {
    allow_from
        .iter()
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty() && *entry != ALLOW_ALL)
        .map(normalize_e164)
        .filter(|entry| entry.len() > 1)
        .collect()
}

fn has_wildcard(allow_from: &[String]) -> bool {
    allow_from.iter().any(|entry| entry.trim() == ALLOW_ALL)
}

/// Resolve where a heartbeat reply goes.
pub fn resolve_delivery_target(
    heartbeat: &HeartbeatConfig,
    entry: Option<&SessionEntry>,
    allow_from: &[String],
) -> DeliveryTarget {
    let mode = heartbeat.target();
    if mode == HeartbeatTarget::None {
        return DeliveryTarget::nowhere(TargetReason::TargetNone);
    }

    let last_channel = entry.and_then(SessionEntry::last_channel_kind);
    let last_to = entry.and_then(SessionEntry::last_recipient);

    let channel = match mode {
        HeartbeatTarget::Last => last_channel,
        HeartbeatTarget::WhatsApp => Some(ChannelKind::WhatsApp),
        HeartbeatTarget::Telegram => Some(ChannelKind::Telegram),
        HeartbeatTarget::None => None,
    };

    let to = heartbeat
        .explicit_to()
        .or_else(|| last_to.filter(|_| channel.is_some() && last_channel == channel))
        .or_else(|| last_to.filter(|_| mode == HeartbeatTarget::Last));

    let (channel, to) = match (channel, to) {
        (Some(channel), Some(to)) => (channel, to),
        _ => return DeliveryTarget::nowhere(TargetReason::NoTarget),
    };

    if channel != ChannelKind::WhatsApp || has_wildcard(allow_from) {
        return DeliveryTarget::reach(channel, to);
    }

    let allowed = normalized_allow_list(allow_from);
    let Some(first_allowed) = allowed.first() else {
        return DeliveryTarget::reach(channel, to);
    };

    let candidate = normalize_e164(to);
    if allowed.contains(&candidate) {
        return DeliveryTarget::reach(channel, candidate);
    }

    DeliveryTarget {
        channel: Some(channel),
        to: Some(first_allowed.clone()),
        reason: Some(TargetReason::AllowFromFallback),
    }
}

/// Synthetic sender identity for the heartbeat request.
///
/// This is only the origin of the request handed to the reply engine; it
/// never decides where the reply is delivered.
pub fn resolve_heartbeat_sender(allow_from: &[String], entry: Option<&SessionEntry>) -> String {
    let last_to = entry.and_then(SessionEntry::last_recipient);
    let last_channel = entry.and_then(SessionEntry::last_channel_kind);

    let mut candidates: Vec<String> = Vec::new();
    if let Some(to) = last_to {
        candidates.push(to.to_string());
        match last_channel {
            Some(ChannelKind::Telegram) => candidates.push(format!("telegram:{}", to)),
            Some(ChannelKind::WhatsApp) => candidates.push(normalize_e164(to)),
            None => {}
        }
    }

    if has_wildcard(allow_from) {
        return candidates
            .into_iter()
            .next()
            .unwrap_or_else(|| FALLBACK_SENDER.to_string());
    }

    let allowed = normalized_allow_list(allow_from);
    if let Some(matched) = candidates.iter().find(|c| allowed.contains(*c)) {
        return matched.clone();
    }
    if allowed.is_empty() {
        if let Some(first) = candidates.into_iter().next() {
            return first;
        }
    }

    allowed
        .into_iter()
        .next()
        .unwrap_or_else(|| FALLBACK_SENDER.to_string())
}
