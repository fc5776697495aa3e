//! Chatsync - chat session client
//!
#![doc = "Main entry point for the Chatsync command-line client."]

use anyhow::Result;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use chatsync::cli::Cli;
use chatsync::commands;
use chatsync::config::Config;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    init_tracing(cli.verbose, cli.json_logs);

    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    config.validate()?;

    tracing::debug!(base_url = %config.gateway.base_url, "Loaded configuration");

    commands::run(cli.command, config).await
}

/// Initialize tracing subscriber with environment filter
///
/// Logs go to stderr, as JSON lines when `json` is set.
fn init_tracing(verbose: bool, json: bool) {
    let default_filter = if verbose {
        "chatsync=debug"
    } else {
        "chatsync=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let registry = tracing_subscriber::registry().with(env_filter);

    if json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
