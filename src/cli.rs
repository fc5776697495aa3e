//! Command-line interface definition for Chatsync
//!
//! This module defines the CLI structure using clap's derive API.
//! Every subcommand drives the session sync engine against the
//! configured remote store.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Chatsync - chat sessions kept in sync with a remote store
#[derive(Parser, Debug, Clone)]
#[command(name = "chatsync")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long)]
    pub json_logs: bool,

    /// Override the remote session API base URL
    #[arg(long)]
    pub base_url: Option<String>,

    /// Override the local session cache database path
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Chatsync
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List cached sessions after syncing with the remote store
    List,

    /// Create a new session
    New {
        /// Title for the session (defaults to "<prefix> <n>")
        #[arg(short, long)]
        title: Option<String>,
    },

    /// Rename a session
    Rename {
        /// Session ID (or unique prefix)
        id: String,

        /// New title
        title: String,
    },

    /// Delete a session
    Delete {
        /// Session ID (or unique prefix)
        id: String,
    },

    /// Ask the remote store to generate a title for a session
    Title {
        /// Session ID (or unique prefix)
        id: String,
    },

    /// Append a message to a session
    Send {
        /// Session ID (or unique prefix)
        id: String,

        /// Message content
        content: String,

        /// Message role
        #[arg(short, long, default_value = "user")]
        role: String,

        /// Model that produced the message
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Sync with the remote store and report what changed
    Sync,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
