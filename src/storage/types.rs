use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Reserved prefix that marks a locally generated session identifier
pub const TEMPORARY_ID_PREFIX: &str = "temp-";

/// A chat session as held by the local cache
///
/// `pending` is true exactly when `id` is a temporary identifier whose
/// remote counterpart has not been confirmed yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Remote or temporary identifier
    pub id: String,
    /// Display title, user- or AI-assigned
    pub title: String,
    /// Creation time in epoch milliseconds
    pub created_at: i64,
    /// Last update time in epoch milliseconds
    pub updated_at: i64,
    /// Remote-derived message count, advisory only
    #[serde(default)]
    pub message_count: u64,
    /// Remote-authoritative working directory
    #[serde(default)]
    pub working_directory: String,
    /// Whether the remote counterpart is still unconfirmed
    #[serde(default)]
    pub pending: bool,
}

impl Session {
    /// Build a fresh local session stamped with the current time
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            id: id.into(),
            title: title.into(),
            created_at: now,
            updated_at: now,
            message_count: 0,
            working_directory: String::new(),
            pending: false,
        }
    }

    /// Returns `true` when this session still carries a temporary identifier
    pub fn is_temporary(&self) -> bool {
        is_temporary_id(&self.id)
    }
}

/// One entry of a bulk working-directory sync
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingDirectoryUpdate {
    /// Session identifier to update
    pub id: String,
    /// Remote working directory value
    pub working_directory: String,
}

/// Generate a new temporary session identifier
///
/// # Examples
///
/// ```
/// use chatsync::storage::{is_temporary_id, new_temporary_id};
///
/// let id = new_temporary_id();
/// assert!(is_temporary_id(&id));
/// ```
pub fn new_temporary_id() -> String {
    format!("{}{}", TEMPORARY_ID_PREFIX, uuid::Uuid::new_v4())
}

/// Returns `true` if `id` belongs to the temporary namespace
pub fn is_temporary_id(id: &str) -> bool {
    id.starts_with(TEMPORARY_ID_PREFIX)
}

/// Current time in epoch milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
