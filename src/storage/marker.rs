//! Durable one-time migration marker

use std::sync::atomic::{AtomicBool, Ordering};

use super::SqliteStorage;

/// Fixed `meta` key under which the migration marker is stored
pub const MIGRATION_MARKER_KEY: &str = "sessions_migrated_to_remote";

/// A flag that flips from absent to present exactly once per local store
pub trait MigrationMarker: Send + Sync {
    /// Whether the local→remote backfill has already been attempted
    fn is_set(&self) -> bool;

    /// Record that the backfill was attempted
    fn set(&self);
}

impl MigrationMarker for SqliteStorage {
    fn is_set(&self) -> bool {
        match self.get_meta(MIGRATION_MARKER_KEY) {
            Ok(value) => value.is_some(),
            Err(e) => {
                // An unreadable marker must not trigger a duplicate backfill.
                tracing::warn!(error = %e, "Failed to read migration marker, assuming set");
                true
            }
        }
    }

    fn set(&self) {
        if let Err(e) = self.set_meta(MIGRATION_MARKER_KEY, "true") {
            tracing::warn!(error = %e, "Failed to persist migration marker");
        }
    }
}

/// Process-local marker, for memory-only caches and tests
#[derive(Debug, Default)]
pub struct InMemoryMarker {
    set: AtomicBool,
}

impl InMemoryMarker {
    /// Create a marker in the given state
    pub fn new(set: bool) -> Self {
        Self {
            set: AtomicBool::new(set),
        }
    }
}

impl MigrationMarker for InMemoryMarker {
    fn is_set(&self) -> bool {
        self.set.load(Ordering::SeqCst)
    }

    fn set(&self) {
        self.set.store(true, Ordering::SeqCst);
    }
}
