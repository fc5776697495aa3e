use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use chatsync::error::{ChatsyncError, Result};
use chatsync::gateway::{
    AddMessageRequest, CreateSessionRequest, CreatedSession, GeneratedTitle, RemoteSession,
    SessionGateway, UpdateSessionRequest,
};
use chatsync::storage::{LocalSessionCache, MigrationMarker, SharedCache, SqliteStorage};
use chatsync::sync::{Notifier, SessionSyncEngine, SyncOptions};

#[allow(dead_code)]
pub fn create_temp_storage() -> (SqliteStorage, TempDir) {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let db_path = tmp.path().join("sessions.db");
    let storage =
        SqliteStorage::new_with_path(db_path).expect("failed to create sqlite storage with path");
    (storage, tmp)
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

#[allow(dead_code)]
pub fn remote_session(id: &str, title: &str) -> RemoteSession {
    RemoteSession {
        id: id.to_string(),
        title: title.to_string(),
        created_at: 1_700_000_000_000,
        updated_at: Some(1_700_000_000_000),
        message_count: Some(0),
        working_directory: None,
    }
}

/// Notifier that records every message
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify_error(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

/// In-process remote session store
///
/// Behaves like the real backend: creates assign fresh ids, listings return
/// what was stored. Individual operations can be told to fail or hang.
#[derive(Debug, Default)]
pub struct FakeGateway {
    sessions: Mutex<Vec<RemoteSession>>,
    calls: Mutex<Vec<String>>,
    next_id: AtomicUsize,
    pub fail_list: AtomicBool,
    pub fail_create: AtomicBool,
    pub hang_create: AtomicBool,
    pub fail_update: AtomicBool,
    pub fail_delete: AtomicBool,
    pub fail_title: AtomicBool,
}

#[allow(dead_code)]
impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sessions(sessions: Vec<RemoteSession>) -> Self {
        let gateway = Self::default();
        *gateway.sessions.lock().unwrap() = sessions;
        gateway
    }

    pub fn stored(&self) -> Vec<RemoteSession> {
        self.sessions.lock().unwrap().clone()
    }

    pub fn stored_titles(&self) -> Vec<String> {
        self.stored().into_iter().map(|s| s.title).collect()
    }

    pub fn set_working_directory(&self, id: &str, dir: &str) {
        for session in self.sessions.lock().unwrap().iter_mut() {
            if session.id == id {
                session.working_directory = Some(dir.to_string());
            }
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn failure(flag: &AtomicBool, operation: &str) -> Result<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(ChatsyncError::GatewayStatus {
                status: 500,
                body: format!("{} unavailable", operation),
            }
            .into());
        }
        Ok(())
    }
}

#[async_trait]
impl SessionGateway for FakeGateway {
    async fn list(&self) -> Result<Vec<RemoteSession>> {
        self.record("list".to_string());
        Self::failure(&self.fail_list, "list")?;
        Ok(self.stored())
    }

    async fn create(&self, request: CreateSessionRequest) -> Result<CreatedSession> {
        self.record(format!("create {}", request.title));
        if self.hang_create.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        Self::failure(&self.fail_create, "create")?;

        let id = format!("remote-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let mut session = remote_session(&id, &request.title);
        session.created_at = chatsync::storage::now_millis();
        self.sessions.lock().unwrap().insert(0, session);
        Ok(CreatedSession {
            id,
            title: request.title,
        })
    }

    async fn update(&self, id: &str, request: UpdateSessionRequest) -> Result<()> {
        self.record(format!("update {} {}", id, request.title));
        Self::failure(&self.fail_update, "update")?;
        for session in self.sessions.lock().unwrap().iter_mut() {
            if session.id == id {
                session.title = request.title.clone();
            }
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.record(format!("delete {}", id));
        Self::failure(&self.fail_delete, "delete")?;
        self.sessions.lock().unwrap().retain(|s| s.id != id);
        Ok(())
    }

    async fn add_message(&self, request: AddMessageRequest) -> Result<()> {
        self.record(format!("message {} {}", request.session_id, request.role));
        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions
            .iter_mut()
            .find(|s| s.id == request.session_id)
            .ok_or_else(|| ChatsyncError::GatewayStatus {
                status: 404,
                body: "no such session".to_string(),
            })?;
        session.message_count = Some(session.message_count.unwrap_or(0) + 1);
        Ok(())
    }

    async fn generate_title(&self, id: &str) -> Result<GeneratedTitle> {
        self.record(format!("title {}", id));
        Self::failure(&self.fail_title, "title")?;
        Ok(GeneratedTitle {
            title: format!("Generated for {}", id),
        })
    }
}

/// Engine wired to a fake gateway with handles for assertions
#[allow(dead_code)]
pub struct TestEngine {
    pub engine: SessionSyncEngine,
    pub cache: Arc<Mutex<LocalSessionCache>>,
    pub gateway: Arc<FakeGateway>,
    pub notifier: Arc<RecordingNotifier>,
}

#[allow(dead_code)]
impl TestEngine {
    pub fn ids(&self) -> Vec<String> {
        self.engine.sessions().into_iter().map(|s| s.id).collect()
    }

    pub fn titles(&self) -> Vec<String> {
        self.engine.sessions().into_iter().map(|s| s.title).collect()
    }
}

#[allow(dead_code)]
pub fn engine_with(
    cache: LocalSessionCache,
    gateway: Arc<FakeGateway>,
    marker: Arc<dyn MigrationMarker>,
    request_timeout: Duration,
) -> TestEngine {
    let cache = cache.into_shared();
    let shared: SharedCache = cache.clone();
    let notifier = Arc::new(RecordingNotifier::default());
    let engine = SessionSyncEngine::new(
        shared,
        gateway.clone(),
        marker,
        notifier.clone(),
        SyncOptions {
            request_timeout,
            ..SyncOptions::default()
        },
    );
    TestEngine {
        engine,
        cache,
        gateway,
        notifier,
    }
}
