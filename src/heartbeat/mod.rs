//! Heartbeat engine.
//!
//! Periodically asks the reply engine whether anything needs the user's
//! attention and, if so, delivers the answer to the most relevant contact.
//!
//! - [`wake`]: coalescing wake scheduler (interval and on-demand triggers)
//! - [`runner`]: the run state machine and its lifecycle
//! - [`target`]: delivery target and origin identity resolution
//! - [`freshness`]: undoing `updatedAt` bumps of silent runs
//! - [`normalize`], [`tokens`]: reply cleanup
//! - [`delivery`]: ordered chunked/attachment sends
//! - [`events`]: outcome events

pub mod delivery;
pub mod events;
pub mod freshness;
pub mod normalize;
pub mod runner;
pub mod target;
pub mod tokens;
pub mod wake;

pub use delivery::{dispatch, plan_delivery, OutboundSend};
pub use events::{HeartbeatEvent, HeartbeatEvents, HeartbeatStatus};
pub use freshness::{restore_updated_at, FreshnessSnapshot};
pub use normalize::{normalize_reply, NormalizedReply};
pub use runner::{
    start_heartbeat_runner, HeartbeatHandle, HeartbeatRunResult, HeartbeatRunner, SkipReason,
};
pub use target::{resolve_delivery_target, resolve_heartbeat_sender, DeliveryTarget, TargetReason};
pub use tokens::{
    resolve_heartbeat_prompt, strip_heartbeat_token, HEARTBEAT_PROMPT, HEARTBEAT_TOKEN,
};
pub use wake::{WakeHandler, WakeScheduler, DEFAULT_COALESCE, RETRY_DELAY};
