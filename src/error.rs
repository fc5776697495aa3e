//! Error types for Chatsync
//!
//! This module defines the error types used throughout the crate,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Chatsync operations
///
/// Covers configuration loading, remote gateway calls, local storage
/// and the sync engine's own bounded waits.
#[derive(Error, Debug)]
pub enum ChatsyncError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Remote gateway errors that carry no HTTP status (transport, decoding)
    #[error("Gateway error: {0}")]
    Gateway(String),

    /// Remote gateway rejected the request with a non-success status
    #[error("Gateway returned HTTP {status}: {body}")]
    GatewayStatus {
        /// HTTP status code returned by the remote store
        status: u16,
        /// Response body text, possibly empty
        body: String,
    },

    /// A remote call did not complete within the configured bound
    #[error("Remote {operation} timed out after {seconds}s")]
    Timeout {
        /// Name of the gateway operation that timed out
        operation: String,
        /// Configured timeout in seconds
        seconds: f64,
    },

    /// Session lookup failed in the local cache
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Local session storage errors (database operations)
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing errors
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Result type alias for Chatsync operations
///
/// Uses `anyhow::Error` so callers can attach context while the typed
/// [`ChatsyncError`] stays recoverable through `downcast_ref`.
pub type Result<T> = anyhow::Result<T>;
