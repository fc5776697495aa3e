//! Session synchronization engine
//!
//! Keeps the local session cache and the remote session store consistent.
//! Every user-facing mutation is applied to the cache synchronously and then
//! mirrored to the remote store in a background task; results are reconciled
//! back into the cache when they arrive.
//!
//! # Hydration and migration
//!
//! The first successful remote listing installs the remote set as the
//! cache baseline. If the durable migration marker is absent, sessions that
//! only exist locally are pushed to the remote once, and the marker is set
//! in the same synchronous step that issues the pushes. A failed push is
//! not retried; a second launch never pushes again.
//!
//! # Failure handling
//!
//! | Operation       | On remote failure                                    |
//! |-----------------|------------------------------------------------------|
//! | create          | temporary record removed, one user notification      |
//! | rename / delete | local change kept, repaired on the next listing      |
//! | generate title  | placeholder title kept                               |
//! | add message     | logged only                                          |
//!
//! Every remote call is bounded by [`SyncOptions::request_timeout`]; expiry
//! counts as a failure.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio_util::task::TaskTracker;

use crate::error::{ChatsyncError, Result};
use crate::gateway::{
    AddMessageRequest, CreateSessionRequest, CreatedSession, RemoteSession, SessionGateway,
    UpdateSessionRequest,
};
use crate::storage::{
    is_temporary_id, new_temporary_id, MigrationMarker, Session, SessionCache, SharedCache,
    WorkingDirectoryUpdate,
};

pub mod notify;
pub mod reconcile;

pub use notify::{ConsoleNotifier, Notifier, TracingNotifier};
pub use reconcile::{DriftLedger, RepairPlan};

/// Tunables for the sync engine
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Upper bound on every remote call
    pub request_timeout: Duration,
    /// Prefix of generated default titles (`"<prefix> <n>"`)
    pub default_title_prefix: String,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            default_title_prefix: "Chat".to_string(),
        }
    }
}

/// Bookkeeping for in-flight creations and unrepaired drift
#[derive(Debug, Default)]
struct EngineState {
    /// Temporary ids whose remote create has not settled
    in_flight: HashSet<String>,
    /// Local-only ids whose migration push has not settled
    migrating: HashSet<String>,
    /// Titles set on a pending or migrating session before its create confirmed
    deferred_titles: HashMap<String, String>,
    /// Pending or migrating sessions the user deleted before their create confirmed
    deleted_pending: HashSet<String>,
    drift: DriftLedger,
}

struct EngineInner {
    cache: SharedCache,
    gateway: Arc<dyn SessionGateway>,
    marker: Arc<dyn MigrationMarker>,
    notifier: Arc<dyn Notifier>,
    options: SyncOptions,
    hydrated: AtomicBool,
    state: Mutex<EngineState>,
    tasks: TaskTracker,
}

/// Orchestrates hydration, migration and optimistic CRUD between the
/// local cache and the remote gateway
///
/// Cloning is cheap and every clone drives the same engine.
#[derive(Clone)]
pub struct SessionSyncEngine {
    inner: Arc<EngineInner>,
}

impl std::fmt::Debug for SessionSyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSyncEngine")
            .field("hydrated", &self.is_hydrated())
            .field("options", &self.inner.options)
            .finish_non_exhaustive()
    }
}

impl SessionSyncEngine {
    /// Create an engine over the given collaborators
    pub fn new(
        cache: SharedCache,
        gateway: Arc<dyn SessionGateway>,
        marker: Arc<dyn MigrationMarker>,
        notifier: Arc<dyn Notifier>,
        options: SyncOptions,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                cache,
                gateway,
                marker,
                notifier,
                options,
                hydrated: AtomicBool::new(false),
                state: Mutex::new(EngineState::default()),
                tasks: TaskTracker::new(),
            }),
        }
    }

    /// Shared handle to the cache this engine writes to
    pub fn cache(&self) -> SharedCache {
        Arc::clone(&self.inner.cache)
    }

    /// Snapshot of the cached sessions
    pub fn sessions(&self) -> Vec<Session> {
        self.lock_cache().sessions()
    }

    /// Whether hydration already ran in this process
    pub fn is_hydrated(&self) -> bool {
        self.inner.hydrated.load(Ordering::SeqCst)
    }

    /// Number of optimistic creations still waiting for the remote
    pub fn in_flight_creations(&self) -> usize {
        self.lock_state().in_flight.len()
    }

    /// Number of failed renames/deletes awaiting repair
    pub fn unrepaired_drift(&self) -> usize {
        self.lock_state().drift.len()
    }

    /// Wait until every background task spawned by this engine has finished
    pub async fn settle(&self) {
        self.inner.tasks.close();
        self.inner.tasks.wait().await;
        self.inner.tasks.reopen();
    }

    /// Fetch the remote list and reconcile it into the cache
    ///
    /// A failed listing skips hydration for this cycle; the next successful
    /// call picks it up.
    pub async fn refresh(&self) -> Result<()> {
        let remote = match self.call("list", self.inner.gateway.list()).await {
            Ok(remote) => remote,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to list remote sessions, skipping hydration");
                return Err(e);
            }
        };
        self.apply_remote_list(remote);
        Ok(())
    }

    /// Reconcile a successful remote listing into the cache
    ///
    /// Hydration and migration run only on the first call per process.
    /// Working directories are synced and recorded drift is repaired on
    /// every call.
    pub fn apply_remote_list(&self, remote: Vec<RemoteSession>) {
        if !self.inner.hydrated.swap(true, Ordering::SeqCst) {
            self.hydrate(&remote);
        }
        self.sync_working_directories(&remote);
        self.repair_drift(&remote);
    }

    fn hydrate(&self, remote: &[RemoteSession]) {
        let remote_ids: HashSet<&str> = remote.iter().map(|r| r.id.as_str()).collect();
        let in_flight = self.lock_state().in_flight.clone();
        let migrate = !self.inner.marker.is_set();

        let local_only = {
            let mut cache = self.lock_cache();

            // Temporary records from an earlier run never got confirmed.
            for stale in cache
                .sessions()
                .into_iter()
                .filter(|s| s.is_temporary() && !in_flight.contains(&s.id))
            {
                tracing::warn!(id = %stale.id, title = %stale.title, "Dropping unconfirmed session");
                cache.delete(&stale.id);
            }

            let local_only: Vec<Session> = if migrate {
                cache
                    .sessions()
                    .into_iter()
                    .filter(|s| !s.is_temporary() && !remote_ids.contains(s.id.as_str()))
                    .collect()
            } else {
                Vec::new()
            };

            if !remote.is_empty() {
                let mut baseline: Vec<Session> = remote.iter().map(RemoteSession::to_local).collect();
                baseline.extend(local_only.iter().cloned());
                cache.hydrate(baseline);
            }

            local_only
        };

        tracing::info!(
            remote = remote.len(),
            local_only = local_only.len(),
            migrate,
            "Hydrated session cache"
        );

        if migrate {
            self.spawn_migration(local_only);
            self.inner.marker.set();
        }
    }

    fn spawn_migration(&self, local_only: Vec<Session>) {
        if local_only.is_empty() {
            return;
        }

        tracing::info!(count = local_only.len(), "Migrating local sessions to remote");

        self.lock_state()
            .migrating
            .extend(local_only.iter().map(|s| s.id.clone()));

        let engine = self.clone();
        self.inner.tasks.spawn(async move {
            let pushes = local_only.iter().map(|session| {
                engine.call(
                    "create",
                    engine.inner.gateway.create(CreateSessionRequest {
                        title: session.title.clone(),
                    }),
                )
            });
            let results = futures::future::join_all(pushes).await;

            for (session, result) in local_only.iter().zip(results) {
                let (deferred_title, deleted) = engine.take_awaited(&session.id, false);
                match result {
                    Ok(created) => {
                        tracing::debug!(local = %session.id, remote = %created.id, "Migrated session");
                        engine.adopt_created(&session.id, created, deferred_title, deleted);
                    }
                    Err(e) => {
                        tracing::warn!(id = %session.id, error = %e, "Failed to migrate session");
                    }
                }
            }
        });
    }

    fn sync_working_directories(&self, remote: &[RemoteSession]) {
        let updates: Vec<WorkingDirectoryUpdate> = remote
            .iter()
            .map(|r| WorkingDirectoryUpdate {
                id: r.id.clone(),
                working_directory: r.working_directory.clone().unwrap_or_default(),
            })
            .collect();
        self.lock_cache().sync_field(&updates);
    }

    fn repair_drift(&self, remote: &[RemoteSession]) {
        let plan = self.lock_state().drift.plan(remote);
        if plan.is_empty() {
            return;
        }

        tracing::info!(
            titles = plan.titles.len(),
            deletes = plan.deletes.len(),
            "Repairing local/remote drift"
        );

        {
            let mut cache = self.lock_cache();
            for (id, title) in &plan.titles {
                cache.rename_title(id, title);
            }
        }
        for id in plan.deletes {
            self.spawn_remote_delete(id);
        }
    }

    /// Optimistically create a session and return its temporary id
    ///
    /// The pending record is visible in the cache before this returns. The
    /// remote create runs in the background: on success the temporary id is
    /// swapped for the remote one in place, on failure the record is removed
    /// and one error notification is raised.
    pub fn create_session_with_sync(&self, title: Option<&str>) -> String {
        let temp_id = new_temporary_id();

        let title = {
            let mut cache = self.lock_cache();
            let title = match title {
                Some(title) => title.to_string(),
                None => self.default_title(cache.sessions().len()),
            };
            cache.create_with_id(&temp_id, &title);
            cache.mark_pending(&temp_id, true);
            title
        };
        self.lock_state().in_flight.insert(temp_id.clone());

        tracing::debug!(id = %temp_id, title = %title, "Created pending session");

        let engine = self.clone();
        let id = temp_id.clone();
        self.inner
            .tasks
            .spawn(async move { engine.confirm_creation(id, title).await });

        temp_id
    }

    async fn confirm_creation(&self, temp_id: String, title: String) {
        let result = self
            .call(
                "create",
                self.inner.gateway.create(CreateSessionRequest {
                    title: title.clone(),
                }),
            )
            .await;

        let (deferred_title, deleted) = self.take_awaited(&temp_id, true);

        match result {
            Ok(created) => self.adopt_created(&temp_id, created, deferred_title, deleted),
            Err(e) => {
                self.lock_cache().delete(&temp_id);
                if deleted {
                    tracing::debug!(id = %temp_id, error = %e, "Create failed for already deleted session");
                    return;
                }
                tracing::warn!(id = %temp_id, error = %e, "Failed to create session, rolled back");
                self.inner
                    .notifier
                    .notify_error(&format!("Failed to create session \"{}\": {}", title, e));
            }
        }
    }

    fn adopt_created(
        &self,
        previous_id: &str,
        created: CreatedSession,
        deferred_title: Option<String>,
        deleted: bool,
    ) {
        if deleted {
            tracing::debug!(remote = %created.id, "Session deleted before confirmation, removing remote copy");
            self.spawn_remote_delete(created.id);
            return;
        }

        let title = deferred_title.clone().unwrap_or(created.title);
        self.lock_cache()
            .replace_identifier(previous_id, &created.id, &title);
        tracing::info!(previous = %previous_id, id = %created.id, "Confirmed session");

        if let Some(title) = deferred_title {
            self.spawn_remote_update(created.id, title);
        }
    }

    /// Rename a session locally, then mirror it to the remote
    pub fn rename_session_with_sync(&self, id: &str, title: &str) {
        self.lock_cache().rename_title(id, title);

        {
            let mut state = self.lock_state();
            if is_temporary_id(id) || state.migrating.contains(id) {
                state
                    .deferred_titles
                    .insert(id.to_string(), title.to_string());
                return;
            }
        }

        self.spawn_remote_update(id.to_string(), title.to_string());
    }

    /// Delete a session locally, then mirror it to the remote
    pub fn delete_session_with_sync(&self, id: &str) {
        self.lock_cache().delete(id);

        {
            let mut state = self.lock_state();
            if is_temporary_id(id) || state.migrating.contains(id) {
                state.deferred_titles.remove(id);
                if state.in_flight.contains(id) || state.migrating.contains(id) {
                    state.deleted_pending.insert(id.to_string());
                }
                return;
            }
        }

        self.lock_state().drift.clear_rename(id);
        self.spawn_remote_delete(id.to_string());
    }

    /// Ask the remote for an AI title; failures keep the current title
    pub fn generate_title_with_sync(&self, id: &str) {
        if is_temporary_id(id) || self.lock_state().migrating.contains(id) {
            tracing::debug!(id = %id, "Skipping title generation until the remote id is known");
            return;
        }

        let engine = self.clone();
        let id = id.to_string();
        self.inner.tasks.spawn(async move {
            match engine
                .call("generate_title", engine.inner.gateway.generate_title(&id))
                .await
            {
                Ok(generated) => {
                    engine.lock_cache().rename_title(&id, &generated.title);
                    tracing::debug!(id = %id, title = %generated.title, "Applied generated title");
                }
                Err(e) => {
                    tracing::debug!(id = %id, error = %e, "Title generation failed, keeping placeholder");
                }
            }
        });
    }

    /// Forward a message to the remote and wait for the result
    ///
    /// The cache is not touched; message content lives outside it.
    pub async fn send_message(&self, request: AddMessageRequest) -> Result<()> {
        let session_id = request.session_id.clone();
        let result = self
            .call("add_message", self.inner.gateway.add_message(request))
            .await;
        if let Err(e) = &result {
            tracing::warn!(id = %session_id, error = %e, "Failed to append message");
        }
        result
    }

    /// Forward a message to the remote in the background
    pub fn add_message_with_sync(&self, request: AddMessageRequest) {
        let engine = self.clone();
        self.inner.tasks.spawn(async move {
            let _ = engine.send_message(request).await;
        });
    }

    /// Stop tracking `id` as awaiting a remote identifier and return what the
    /// user did to it meanwhile
    fn take_awaited(&self, id: &str, temporary: bool) -> (Option<String>, bool) {
        let mut state = self.lock_state();
        if temporary {
            state.in_flight.remove(id);
        } else {
            state.migrating.remove(id);
        }
        (
            state.deferred_titles.remove(id),
            state.deleted_pending.remove(id),
        )
    }

    fn spawn_remote_update(&self, id: String, title: String) {
        let engine = self.clone();
        self.inner.tasks.spawn(async move {
            let result = engine
                .call(
                    "update",
                    engine
                        .inner
                        .gateway
                        .update(&id, UpdateSessionRequest { title }),
                )
                .await;
            match result {
                Ok(()) => {
                    engine.lock_state().drift.clear_rename(&id);
                    tracing::debug!(id = %id, "Remote rename applied");
                }
                Err(e) => {
                    tracing::warn!(id = %id, error = %e, "Remote rename failed");
                    engine.lock_state().drift.record_failed_rename(&id);
                }
            }
        });
    }

    fn spawn_remote_delete(&self, id: String) {
        let engine = self.clone();
        self.inner.tasks.spawn(async move {
            match engine.call("delete", engine.inner.gateway.delete(&id)).await {
                Ok(()) => tracing::debug!(id = %id, "Remote delete applied"),
                Err(e) => {
                    tracing::warn!(id = %id, error = %e, "Remote delete failed");
                    engine.lock_state().drift.record_failed_delete(&id);
                }
            }
        });
    }

    async fn call<T>(&self, operation: &str, fut: impl Future<Output = Result<T>>) -> Result<T> {
        let timeout = self.inner.options.request_timeout;
        match tokio::time::timeout(timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(ChatsyncError::Timeout {
                operation: operation.to_string(),
                seconds: timeout.as_secs_f64(),
            }
            .into()),
        }
    }

    fn default_title(&self, existing: usize) -> String {
        format!("{} {}", self.inner.options.default_title_prefix, existing + 1)
    }

    fn lock_cache(&self) -> MutexGuard<'_, dyn SessionCache + 'static> {
        self.inner
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_state(&self) -> MutexGuard<'_, EngineState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
