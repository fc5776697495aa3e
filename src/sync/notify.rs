//! User-visible failure notifications
//!
//! Only the creation path surfaces failures; everything else degrades
//! silently. The engine reports through [`Notifier`] so the surface that
//! shows the message stays swappable.

use colored::Colorize;

/// Sink for user-visible error notifications
pub trait Notifier: Send + Sync {
    /// Show an error message to the user
    fn notify_error(&self, message: &str);
}

/// Notifier that only emits a `tracing` error event
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify_error(&self, message: &str) {
        tracing::error!("{}", message);
    }
}

/// Notifier that prints to stderr for terminal use
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify_error(&self, message: &str) {
        tracing::error!("{}", message);
        eprintln!("{} {}", "error:".red().bold(), message);
    }
}
