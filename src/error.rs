//! Error types for Heartwire
//!
//! This module defines all error types used throughout the heartbeat engine.
//! Uses `thiserror` for ergonomic error handling with automatic `Display` and
//! `Error` trait implementations.

use thiserror::Error;

/// The primary error type for Heartwire operations.
#[derive(Error, Debug)]
pub enum HeartwireError {
    /// Configuration-related errors (invalid config, unparsable interval, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Reply engine errors (command failures, malformed replies, etc.)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Channel errors (send failures, missing recipients, etc.)
    #[error("Channel error: {0}")]
    Channel(String),

    /// Session store errors (unreadable store, persistence failures, etc.)
    #[error("Session error: {0}")]
    Session(String),

    /// Standard I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// A specialized `Result` type for Heartwire operations.
pub type Result<T> = std::result::Result<T, HeartwireError>;
