//! Local session cache
//!
//! The cache is the only thing the UI reads from. Every primitive is
//! synchronous and total: persistence problems are logged and never reach
//! the caller.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::types::{is_temporary_id, now_millis, Session, WorkingDirectoryUpdate};
use super::SqliteStorage;
use crate::error::Result;

/// Cache handle shared between the sync engine and its readers
pub type SharedCache = Arc<Mutex<dyn SessionCache>>;

/// Mutation and read primitives the sync engine relies on
pub trait SessionCache: Send {
    /// Install a remote-derived session set as the new baseline
    fn hydrate(&mut self, sessions: Vec<Session>);

    /// Insert a new session under `id` and make it active
    fn create_with_id(&mut self, id: &str, title: &str);

    /// Remove a session; clears or moves the active pointer if needed
    fn delete(&mut self, id: &str);

    /// Overwrite a session's title
    fn rename_title(&mut self, id: &str, title: &str);

    /// Set or clear the pending flag
    fn mark_pending(&mut self, id: &str, pending: bool);

    /// Swap `old_id` for `new_id` in place, re-pointing the active session
    fn replace_identifier(&mut self, old_id: &str, new_id: &str, new_title: &str);

    /// Bulk-update working directories keyed by session id
    fn sync_field(&mut self, updates: &[WorkingDirectoryUpdate]);

    /// Snapshot of all sessions, most recently updated first
    fn sessions(&self) -> Vec<Session>;

    /// Identifier of the currently active session
    fn active_session_id(&self) -> Option<String>;
}

/// In-memory session cache with optional write-through persistence
#[derive(Debug, Default)]
pub struct LocalSessionCache {
    sessions: Vec<Session>,
    active_session_id: Option<String>,
    storage: Option<SqliteStorage>,
}

impl LocalSessionCache {
    /// Create an empty, memory-only cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache backed by `storage`, loading whatever it already holds
    pub fn with_storage(storage: SqliteStorage) -> Result<Self> {
        let sessions = storage.load_sessions()?;
        let active_session_id = storage
            .load_active_session()?
            .filter(|id| sessions.iter().any(|s| &s.id == id));

        tracing::debug!(
            count = sessions.len(),
            db = %storage.db_path().display(),
            "Loaded local session cache"
        );

        Ok(Self {
            sessions,
            active_session_id,
            storage: Some(storage),
        })
    }

    /// Wrap this cache in the shared handle the sync engine expects
    pub fn into_shared(self) -> Arc<Mutex<LocalSessionCache>> {
        Arc::new(Mutex::new(self))
    }

    /// Look up a session by identifier
    pub fn get(&self, id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    /// Make `id` the active session if it exists
    pub fn set_active(&mut self, id: &str) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        self.active_session_id = Some(id.to_string());
        self.persist();
        true
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.sessions.iter().position(|s| s.id == id)
    }

    fn persist(&self) {
        let Some(storage) = &self.storage else {
            return;
        };
        if let Err(e) = storage.save_sessions(&self.sessions) {
            tracing::warn!(error = %e, "Failed to persist session cache");
        }
        if let Err(e) = storage.save_active_session(self.active_session_id.as_deref()) {
            tracing::warn!(error = %e, "Failed to persist active session");
        }
    }
}

impl SessionCache for LocalSessionCache {
    fn hydrate(&mut self, mut sessions: Vec<Session>) {
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        // In-flight creations survive; everything confirmed is replaced.
        let mut merged: Vec<Session> = self
            .sessions
            .drain(..)
            .filter(|s| is_temporary_id(&s.id))
            .collect();
        merged.extend(sessions);
        self.sessions = merged;

        let active_still_present = self
            .active_session_id
            .as_deref()
            .is_some_and(|id| self.sessions.iter().any(|s| s.id == id));
        if !active_still_present {
            self.active_session_id = self.sessions.first().map(|s| s.id.clone());
        }

        self.persist();
    }

    fn create_with_id(&mut self, id: &str, title: &str) {
        if self.position(id).is_none() {
            self.sessions.insert(0, Session::new(id, title));
        }
        self.active_session_id = Some(id.to_string());
        self.persist();
    }

    fn delete(&mut self, id: &str) {
        let Some(index) = self.position(id) else {
            return;
        };
        self.sessions.remove(index);

        if self.active_session_id.as_deref() == Some(id) {
            self.active_session_id = self.sessions.first().map(|s| s.id.clone());
        }
        self.persist();
    }

    fn rename_title(&mut self, id: &str, title: &str) {
        let Some(index) = self.position(id) else {
            return;
        };
        let session = &mut self.sessions[index];
        session.title = title.to_string();
        session.updated_at = now_millis();
        self.persist();
    }

    fn mark_pending(&mut self, id: &str, pending: bool) {
        let Some(index) = self.position(id) else {
            return;
        };
        self.sessions[index].pending = pending;
        self.persist();
    }

    fn replace_identifier(&mut self, old_id: &str, new_id: &str, new_title: &str) {
        let Some(index) = self.position(old_id) else {
            return;
        };

        if let Some(existing) = self.position(new_id) {
            // The confirmed record already arrived through hydration.
            self.sessions[existing].title = new_title.to_string();
            self.sessions.remove(index);
        } else {
            let session = &mut self.sessions[index];
            session.id = new_id.to_string();
            session.title = new_title.to_string();
            session.pending = false;
            session.updated_at = now_millis();
        }

        if self.active_session_id.as_deref() == Some(old_id) {
            self.active_session_id = Some(new_id.to_string());
        }
        self.persist();
    }

    fn sync_field(&mut self, updates: &[WorkingDirectoryUpdate]) {
        let by_id: HashMap<&str, &str> = updates
            .iter()
            .map(|u| (u.id.as_str(), u.working_directory.as_str()))
            .collect();

        let mut changed = false;
        for session in &mut self.sessions {
            if let Some(dir) = by_id.get(session.id.as_str()) {
                if session.working_directory != *dir {
                    session.working_directory = dir.to_string();
                    changed = true;
                }
            }
        }

        if changed {
            self.persist();
        }
    }

    fn sessions(&self) -> Vec<Session> {
        self.sessions.clone()
    }

    fn active_session_id(&self) -> Option<String> {
        self.active_session_id.clone()
    }
}
