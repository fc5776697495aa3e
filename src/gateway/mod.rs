//! Remote session gateway
//!
//! This module defines the [`SessionGateway`] trait, the contract the sync
//! engine uses to reach the durable remote store, together with the JSON
//! record shapes exchanged with it. The HTTP implementation lives in
//! [`http::HttpSessionGateway`].
//!
//! Every call completes once. There is no retry or backoff here; callers
//! decide what a rejection means.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::storage::Session;

pub mod http;

pub use http::HttpSessionGateway;

/// A session record as returned by the remote list endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSession {
    /// Remote-assigned identifier
    pub id: String,
    /// Display title
    pub title: String,
    /// Creation time in epoch milliseconds
    pub created_at: i64,
    /// Last update time in epoch milliseconds, if the remote tracks it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
    /// Number of stored messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_count: Option<u64>,
    /// Working directory bound to the session
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<String>,
}

impl RemoteSession {
    /// Map into the local shape; `updated_at` falls back to `created_at`
    ///
    /// # Examples
    ///
    /// ```
    /// use chatsync::gateway::RemoteSession;
    ///
    /// let remote = RemoteSession {
    ///     id: "r1".to_string(),
    ///     title: "Hello".to_string(),
    ///     created_at: 100,
    ///     updated_at: None,
    ///     message_count: None,
    ///     working_directory: None,
    /// };
    /// let local = remote.to_local();
    /// assert_eq!(local.updated_at, 100);
    /// assert!(!local.pending);
    /// ```
    pub fn to_local(&self) -> Session {
        Session {
            id: self.id.clone(),
            title: self.title.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at.unwrap_or(self.created_at),
            message_count: self.message_count.unwrap_or(0),
            working_directory: self.working_directory.clone().unwrap_or_default(),
            pending: false,
        }
    }
}

/// Body of a create request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    /// Title for the new session
    pub title: String,
}

/// Response of a successful create
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedSession {
    /// Remote-assigned identifier
    pub id: String,
    /// Title as stored remotely
    pub title: String,
}

/// Body of an update request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSessionRequest {
    /// New title
    pub title: String,
}

/// Body of an add-message request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMessageRequest {
    /// Target session
    pub session_id: String,
    /// Message author role (`user`, `assistant`, ...)
    pub role: String,
    /// Message text
    pub content: String,
    /// Model that produced the message, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Response of a title generation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedTitle {
    /// AI-assigned title
    pub title: String,
}

/// Asynchronous CRUD surface of the remote session store
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionGateway: Send + Sync {
    /// Fetch every session the remote store knows about
    async fn list(&self) -> Result<Vec<RemoteSession>>;

    /// Create a session and return its remote identity
    async fn create(&self, request: CreateSessionRequest) -> Result<CreatedSession>;

    /// Update a session's title
    async fn update(&self, id: &str, request: UpdateSessionRequest) -> Result<()>;

    /// Delete a session
    async fn delete(&self, id: &str) -> Result<()>;

    /// Append a message to a session
    async fn add_message(&self, request: AddMessageRequest) -> Result<()>;

    /// Ask the remote store to generate a title from the session's messages
    async fn generate_title(&self, id: &str) -> Result<GeneratedTitle>;
}
