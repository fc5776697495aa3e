//! Chatsync - chat session client library
//!
//! This library keeps a user-facing list of chat sessions consistent
//! between an instantly-updated local cache and a remote session store
//! reached over HTTP.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `sync`: The session sync engine (hydration, one-time migration,
//!   optimistic create/rename/delete, drift repair)
//! - `gateway`: Remote session store contract and its HTTP implementation
//! - `storage`: Local session cache, SQLite persistence and migration marker
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli` / `commands`: Command-line interface and its handlers
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use chatsync::gateway::HttpSessionGateway;
//! use chatsync::storage::{InMemoryMarker, LocalSessionCache, SharedCache};
//! use chatsync::sync::{SessionSyncEngine, SyncOptions, TracingNotifier};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let gateway = HttpSessionGateway::new(
//!         url::Url::parse("http://localhost:8080/api")?,
//!         Default::default(),
//!         std::time::Duration::from_secs(30),
//!     )?;
//!     let cache: SharedCache = LocalSessionCache::new().into_shared();
//!     let engine = SessionSyncEngine::new(
//!         cache,
//!         Arc::new(gateway),
//!         Arc::new(InMemoryMarker::default()),
//!         Arc::new(TracingNotifier),
//!         SyncOptions::default(),
//!     );
//!
//!     engine.refresh().await?;
//!     engine.create_session_with_sync(Some("Hello"));
//!     engine.settle().await;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod gateway;
pub mod storage;
pub mod sync;

// Re-export commonly used types
pub use config::Config;
pub use error::{ChatsyncError, Result};
pub use gateway::{HttpSessionGateway, RemoteSession, SessionGateway};
pub use storage::{LocalSessionCache, Session, SessionCache};
pub use sync::{SessionSyncEngine, SyncOptions};

#[cfg(test)]
pub mod test_utils;
