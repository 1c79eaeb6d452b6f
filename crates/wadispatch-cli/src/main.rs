//! wadispatch - campaign authoring command line

mod args;
mod commands;

use anyhow::{Context, Result};
use args::{Args, Commands};
use clap::Parser;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use wadispatch_common::config::{Config, LoggingConfig};
use wadispatch_storage::{Backend, RestBackend};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_layered(Some(path.as_path())),
        None => Config::load(),
    }
    .context("Failed to load configuration")?;

    init_logging(&config.logging);
    debug!(command = ?args.command, "Starting wadispatch");

    match &args.command {
        Commands::Preview(preview) => {
            commands::preview(preview, &config.defaults, args.json).await
        }
        Commands::Campaigns => commands::campaigns(connect(&config)?, args.json).await,
        Commands::Apis => commands::apis(connect(&config)?, args.json).await,
        Commands::TestApi { id } => commands::test_api(connect(&config)?, *id, args.json).await,
    }
}

fn connect(config: &Config) -> Result<Arc<dyn Backend>> {
    let backend = RestBackend::new(&config.backend).context("Failed to set up the backend client")?;
    info!(
        url = config.backend.url.as_deref().unwrap_or_default(),
        "Backend client ready"
    );
    Ok(Arc::new(backend))
}

/// Logs go to stderr so command output stays clean on stdout
fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let registry = tracing_subscriber::registry().with(filter);

    if logging.format == "json" {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}
