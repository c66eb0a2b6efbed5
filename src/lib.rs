//! Heartwire - proactive heartbeat scheduling and delivery for chat assistants

pub mod channels;
pub mod config;
pub mod error;
pub mod heartbeat;
pub mod queue;
pub mod reply;
pub mod session;
pub mod utils;

pub use config::Config;
pub use error::{HeartwireError, Result};
