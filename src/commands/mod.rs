/*!
Command handlers for the CLI

Each handler builds a [`SessionSyncEngine`] over the SQLite-backed local
cache and the HTTP gateway, refreshes from the remote store, performs its
operation, then settles all background work before printing results.
*/

use std::sync::{Arc, Mutex};

use crate::cli::Commands;
use crate::config::Config;
use crate::error::{ChatsyncError, Result};
use crate::gateway::{HttpSessionGateway, SessionGateway};
use crate::storage::{LocalSessionCache, Session, SharedCache, SqliteStorage};
use crate::sync::{ConsoleNotifier, SessionSyncEngine};

pub mod sessions;

/// Engine plus a concrete handle to the cache it writes to
pub struct Workspace {
    /// The sync engine
    pub engine: SessionSyncEngine,
    /// Concrete cache handle for reads the trait does not cover
    pub cache: Arc<Mutex<LocalSessionCache>>,
}

impl Workspace {
    /// Wire the engine from configuration
    pub fn open(config: &Config) -> Result<Self> {
        let storage = match &config.storage.db_path {
            Some(path) => SqliteStorage::new_with_path(path.clone())?,
            None => SqliteStorage::new()?,
        };
        let gateway = HttpSessionGateway::new(
            config.base_url()?,
            config.gateway.headers.clone(),
            config.request_timeout(),
        )?;
        Self::with_gateway(config, storage, Arc::new(gateway))
    }

    /// Wire the engine around an explicit gateway
    pub fn with_gateway(
        config: &Config,
        storage: SqliteStorage,
        gateway: Arc<dyn SessionGateway>,
    ) -> Result<Self> {
        let cache = LocalSessionCache::with_storage(storage.clone())?.into_shared();
        let shared: SharedCache = cache.clone();
        let engine = SessionSyncEngine::new(
            shared,
            gateway,
            Arc::new(storage),
            Arc::new(ConsoleNotifier),
            config.sync_options(),
        );
        Ok(Self { engine, cache })
    }

    /// Resolve a full id or unique id prefix against the cache
    pub fn resolve(&self, id: &str) -> Result<String> {
        resolve_session_id(&self.engine.sessions(), id)
    }
}

/// Resolve `id` as an exact id or a unique prefix of one
pub fn resolve_session_id(sessions: &[Session], id: &str) -> Result<String> {
    if sessions.iter().any(|s| s.id == id) {
        return Ok(id.to_string());
    }

    let matches: Vec<&Session> = sessions.iter().filter(|s| s.id.starts_with(id)).collect();
    match matches.as_slice() {
        [single] => Ok(single.id.clone()),
        [] => Err(ChatsyncError::SessionNotFound(id.to_string()).into()),
        _ => Err(ChatsyncError::SessionNotFound(format!(
            "{} (prefix matches {} sessions)",
            id,
            matches.len()
        ))
        .into()),
    }
}

/// Dispatch a parsed command
pub async fn run(command: Commands, config: Config) -> Result<()> {
    let workspace = Workspace::open(&config)?;

    match command {
        Commands::List => sessions::list(&workspace).await,
        Commands::New { title } => sessions::create(&workspace, title).await,
        Commands::Rename { id, title } => sessions::rename(&workspace, &id, &title).await,
        Commands::Delete { id } => sessions::delete(&workspace, &id).await,
        Commands::Title { id } => sessions::generate_title(&workspace, &id).await,
        Commands::Send {
            id,
            content,
            role,
            model,
        } => sessions::send(&workspace, &id, content, role, model).await,
        Commands::Sync => sessions::sync(&workspace).await,
    }
}
