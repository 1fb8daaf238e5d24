use anyhow::Result;
use colored::Colorize;
use delog::{config, server};
use std::path::Path;
use tracing::info;

/// Execute the start command
///
/// Loads configuration and runs the server until a shutdown signal arrives.
/// Any startup failure (bad configuration, unreachable database, schema
/// creation) is returned and terminates the process.
pub async fn execute(config_path: &Path) -> Result<()> {
    println!("{}", "Starting delog in foreground mode...".green());

    let cfg = config::load_config(config_path)?;

    info!(
        config = %config_path.display(),
        backend = cfg.database.backend_name(),
        "Starting delog"
    );

    // Blocks until shutdown
    server::start_server(cfg).await?;

    Ok(())
}
