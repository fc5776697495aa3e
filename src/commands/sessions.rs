use chrono::{Local, TimeZone};
use colored::Colorize;
use prettytable::{format, Table};

use super::Workspace;
use crate::error::{ChatsyncError, Result};
use crate::gateway::AddMessageRequest;
use crate::storage::{is_temporary_id, Session, SessionCache};

/// Refresh from the remote, falling back to cached data when it is unreachable
async fn refresh_or_warn(workspace: &Workspace) {
    if let Err(e) = workspace.engine.refresh().await {
        println!(
            "{}",
            format!("Remote store unavailable, using cached sessions ({})", e).yellow()
        );
    }
}

fn warn_on_drift(workspace: &Workspace, what: &str) {
    if workspace.engine.unrepaired_drift() > 0 {
        println!(
            "{}",
            format!(
                "Remote {} failed; the local change is kept and will be reconciled on the next sync.",
                what
            )
            .yellow()
        );
    }
}

fn format_millis(millis: i64) -> String {
    Local
        .timestamp_millis_opt(millis)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn short_id(id: &str) -> &str {
    if is_temporary_id(id) {
        return id;
    }
    id.get(..8).unwrap_or(id)
}

fn print_sessions(sessions: &[Session], active: Option<&str>) {
    if sessions.is_empty() {
        println!("{}", "No sessions found.".yellow());
        return;
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);

    table.add_row(prettytable::row![
        "",
        "ID".bold(),
        "Title".bold(),
        "Messages".bold(),
        "Working Directory".bold(),
        "Last Updated".bold()
    ]);

    for session in sessions {
        let marker = if active == Some(session.id.as_str()) {
            "*"
        } else {
            ""
        };
        let title = if session.title.chars().count() > 40 {
            format!("{}...", session.title.chars().take(37).collect::<String>())
        } else {
            session.title.clone()
        };
        let id = if session.pending {
            format!("{} (pending)", short_id(&session.id)).yellow()
        } else {
            short_id(&session.id).cyan()
        };
        let dir = if session.working_directory.is_empty() {
            "-".to_string()
        } else {
            session.working_directory.clone()
        };

        table.add_row(prettytable::row![
            marker,
            id,
            title,
            session.message_count,
            dir,
            format_millis(session.updated_at)
        ]);
    }

    println!("\nSessions:");
    table.printstd();
    println!();
}

fn print_cache(workspace: &Workspace) {
    let cache = workspace
        .cache
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    print_sessions(&cache.sessions(), cache.active_session_id().as_deref());
}

/// `chatsync list`
pub async fn list(workspace: &Workspace) -> Result<()> {
    refresh_or_warn(workspace).await;
    workspace.engine.settle().await;
    print_cache(workspace);
    Ok(())
}

/// `chatsync new`
pub async fn create(workspace: &Workspace, title: Option<String>) -> Result<()> {
    refresh_or_warn(workspace).await;

    let temp_id = workspace.engine.create_session_with_sync(title.as_deref());
    tracing::debug!(id = %temp_id, "Waiting for remote confirmation");
    workspace.engine.settle().await;

    let confirmed = {
        let cache = workspace
            .cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if cache.get(&temp_id).is_some() {
            None
        } else {
            cache
                .active_session_id()
                .filter(|id| !is_temporary_id(id))
                .and_then(|id| cache.get(&id).cloned())
        }
    };

    match confirmed {
        Some(session) => {
            println!(
                "{}",
                format!("Created session {} \"{}\"", session.id, session.title).green()
            );
            Ok(())
        }
        None => Err(ChatsyncError::Gateway("Session was not created".to_string()).into()),
    }
}

/// `chatsync rename`
pub async fn rename(workspace: &Workspace, id: &str, title: &str) -> Result<()> {
    refresh_or_warn(workspace).await;
    let id = workspace.resolve(id)?;

    workspace.engine.rename_session_with_sync(&id, title);
    workspace.engine.settle().await;

    println!("{}", format!("Renamed session {} to \"{}\"", id, title).green());
    warn_on_drift(workspace, "rename");
    Ok(())
}

/// `chatsync delete`
pub async fn delete(workspace: &Workspace, id: &str) -> Result<()> {
    refresh_or_warn(workspace).await;
    let id = workspace.resolve(id)?;

    workspace.engine.delete_session_with_sync(&id);
    workspace.engine.settle().await;

    println!("{}", format!("Deleted session {}", id).green());
    warn_on_drift(workspace, "delete");
    Ok(())
}

/// `chatsync title`
pub async fn generate_title(workspace: &Workspace, id: &str) -> Result<()> {
    refresh_or_warn(workspace).await;
    let id = workspace.resolve(id)?;

    workspace.engine.generate_title_with_sync(&id);
    workspace.engine.settle().await;

    let title = workspace
        .cache
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .get(&id)
        .map(|s| s.title.clone())
        .ok_or_else(|| ChatsyncError::SessionNotFound(id.clone()))?;
    println!("{} {}", format!("{}:", id).cyan(), title);
    Ok(())
}

/// `chatsync send`
pub async fn send(
    workspace: &Workspace,
    id: &str,
    content: String,
    role: String,
    model: Option<String>,
) -> Result<()> {
    refresh_or_warn(workspace).await;
    let session_id = workspace.resolve(id)?;

    workspace
        .engine
        .send_message(AddMessageRequest {
            session_id: session_id.clone(),
            role,
            content,
            model,
        })
        .await?;
    workspace.engine.settle().await;

    println!("{}", format!("Message added to {}", session_id).green());
    Ok(())
}

/// `chatsync sync`
pub async fn sync(workspace: &Workspace) -> Result<()> {
    let before = workspace.engine.sessions().len();
    workspace.engine.refresh().await?;
    workspace.engine.settle().await;

    let sessions = workspace.engine.sessions();
    let pending = sessions.iter().filter(|s| s.pending).count();

    println!(
        "{} {} -> {} sessions, {} pending, {} awaiting repair",
        "Synced:".green().bold(),
        before,
        sessions.len(),
        pending,
        workspace.engine.unrepaired_drift()
    );
    print_cache(workspace);
    Ok(())
}
