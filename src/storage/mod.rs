use crate::error::{ChatsyncError, Result};
use anyhow::Context;
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};

pub mod cache;
pub mod marker;
pub mod types;

pub use cache::{LocalSessionCache, SessionCache, SharedCache};
pub use marker::{InMemoryMarker, MigrationMarker, MIGRATION_MARKER_KEY};
pub use types::{
    is_temporary_id, new_temporary_id, now_millis, Session, WorkingDirectoryUpdate,
    TEMPORARY_ID_PREFIX,
};

/// Meta key holding the identifier of the active session
const ACTIVE_SESSION_KEY: &str = "active_session_id";

/// Durable backing store for the local session cache
///
/// Holds the cached session rows, the active-session pointer and a small
/// key/value `meta` table used for the migration marker.
#[derive(Debug, Clone)]
pub struct SqliteStorage {
    db_path: PathBuf,
}

impl SqliteStorage {
    /// Create a new storage instance
    ///
    /// Initializes the database file in the user's data directory unless
    /// `CHATSYNC_DB` points somewhere else.
    pub fn new() -> Result<Self> {
        if let Ok(override_path) = std::env::var("CHATSYNC_DB") {
            return Self::new_with_path(override_path);
        }

        let proj_dirs = ProjectDirs::from("com", "chatsync", "chatsync")
            .ok_or_else(|| ChatsyncError::Storage("Could not determine data directory".into()))?;

        Self::new_with_path(proj_dirs.data_dir().join("sessions.db"))
    }

    /// Create a new storage instance that uses the specified database path.
    ///
    /// # Examples
    ///
    /// ```
    /// use chatsync::storage::SqliteStorage;
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let storage = SqliteStorage::new_with_path(dir.path().join("sessions.db")).unwrap();
    /// assert!(storage.load_sessions().unwrap().is_empty());
    /// ```
    pub fn new_with_path<P: Into<PathBuf>>(db_path: P) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create parent directory for database")
                .map_err(|e| ChatsyncError::Storage(e.to_string()))?;
        }

        let storage = Self { db_path };
        storage.init()?;
        Ok(storage)
    }

    /// Path of the underlying database file
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn open(&self) -> Result<Connection> {
        let conn = Connection::open(&self.db_path)
            .context("Failed to open database")
            .map_err(|e| ChatsyncError::Storage(e.to_string()))?;
        Ok(conn)
    }

    /// Initialize the database schema
    fn init(&self) -> Result<()> {
        let conn = self.open()?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                message_count INTEGER NOT NULL DEFAULT 0,
                working_directory TEXT NOT NULL DEFAULT '',
                pending INTEGER NOT NULL DEFAULT 0,
                position INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )
        .context("Failed to create tables")
        .map_err(|e| ChatsyncError::Storage(e.to_string()))?;

        Ok(())
    }

    /// Replace the stored session list with `sessions`, keeping their order
    pub fn save_sessions(&self, sessions: &[Session]) -> Result<()> {
        let mut conn = self.open()?;

        let tx = conn
            .transaction()
            .context("Failed to start transaction")
            .map_err(|e| ChatsyncError::Storage(e.to_string()))?;

        tx.execute("DELETE FROM sessions", [])
            .context("Failed to clear sessions")
            .map_err(|e| ChatsyncError::Storage(e.to_string()))?;

        for (position, session) in sessions.iter().enumerate() {
            tx.execute(
                "INSERT INTO sessions
                    (id, title, created_at, updated_at, message_count, working_directory, pending, position)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    session.id,
                    session.title,
                    session.created_at,
                    session.updated_at,
                    session.message_count as i64,
                    session.working_directory,
                    session.pending,
                    position as i64
                ],
            )
            .context("Failed to insert session")
            .map_err(|e| ChatsyncError::Storage(e.to_string()))?;
        }

        tx.commit()
            .context("Failed to commit transaction")
            .map_err(|e| ChatsyncError::Storage(e.to_string()))?;

        Ok(())
    }

    /// Load all stored sessions in their saved order
    pub fn load_sessions(&self) -> Result<Vec<Session>> {
        let conn = self.open()?;

        let mut stmt = conn
            .prepare(
                "SELECT id, title, created_at, updated_at, message_count, working_directory, pending
                FROM sessions
                ORDER BY position ASC",
            )
            .context("Failed to prepare statement")
            .map_err(|e| ChatsyncError::Storage(e.to_string()))?;

        let rows = stmt
            .query_map([], |row| {
                let message_count: i64 = row.get(4)?;
                Ok(Session {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    created_at: row.get(2)?,
                    updated_at: row.get(3)?,
                    message_count: message_count.max(0) as u64,
                    working_directory: row.get(5)?,
                    pending: row.get(6)?,
                })
            })
            .context("Failed to query sessions")
            .map_err(|e| ChatsyncError::Storage(e.to_string()))?;

        let mut sessions = Vec::new();
        for row in rows {
            let session = row
                .context("Failed to read session row")
                .map_err(|e| ChatsyncError::Storage(e.to_string()))?;
            sessions.push(session);
        }

        Ok(sessions)
    }

    /// Read a value from the `meta` table
    pub fn get_meta(&self, key: &str) -> Result<Option<String>> {
        let conn = self.open()?;

        let value = conn
            .query_row("SELECT value FROM meta WHERE key = ?", params![key], |row| {
                row.get(0)
            })
            .optional()
            .context("Failed to query meta")
            .map_err(|e| ChatsyncError::Storage(e.to_string()))?;

        Ok(value)
    }

    /// Insert or overwrite a value in the `meta` table
    pub fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.open()?;

        conn.execute(
            "INSERT INTO meta (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )
        .context("Failed to write meta")
        .map_err(|e| ChatsyncError::Storage(e.to_string()))?;

        Ok(())
    }

    /// Remove a key from the `meta` table (no-op when absent)
    pub fn delete_meta(&self, key: &str) -> Result<()> {
        let conn = self.open()?;

        conn.execute("DELETE FROM meta WHERE key = ?", params![key])
            .context("Failed to delete meta")
            .map_err(|e| ChatsyncError::Storage(e.to_string()))?;

        Ok(())
    }

    /// Load the persisted active-session identifier
    pub fn load_active_session(&self) -> Result<Option<String>> {
        self.get_meta(ACTIVE_SESSION_KEY)
    }

    /// Persist the active-session identifier (`None` clears it)
    pub fn save_active_session(&self, id: Option<&str>) -> Result<()> {
        match id {
            Some(id) => self.set_meta(ACTIVE_SESSION_KEY, id),
            None => self.delete_meta(ACTIVE_SESSION_KEY),
        }
    }
}
