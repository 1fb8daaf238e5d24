use anyhow::Result;
use colored::Colorize;
use delog::config::{self, Config};
use std::path::Path;
use tracing::info;

/// Execute the config show command
///
/// Displays the effective configuration with the database password masked
pub fn show(config_path: &Path) -> Result<()> {
    println!("{}", "Loading configuration...".yellow());
    info!("Loading configuration for display");

    let cfg = config::load_config(config_path)?;
    let sanitized = sanitize_secrets(&cfg);

    println!("{}", "Current Configuration:".green().bold());
    println!();

    let toml_string = toml::to_string_pretty(&sanitized)?;
    println!("{}", toml_string);

    Ok(())
}

/// Execute the config validate command
pub fn validate(config_path: &Path) -> Result<()> {
    println!("{}", "Validating configuration...".yellow());
    info!("Validating configuration");

    let cfg = config::load_config(config_path)?;

    println!("{}", "✓ Configuration is valid".green());
    println!();
    println!("{}", "Summary:".bold());
    println!("  Listen: {}:{}", cfg.server.host, cfg.server.port);
    println!("  Submit path: {}", cfg.server.submit_path);
    println!("  Audit backend: {}", describe_backend(&cfg));
    println!(
        "  Metrics: {}",
        if cfg.metrics.enabled {
            cfg.metrics.endpoint.as_str()
        } else {
            "disabled"
        }
    );

    info!("Configuration validation successful");
    Ok(())
}

fn describe_backend(cfg: &Config) -> String {
    match &cfg.database.sqlite_path {
        Some(path) => format!("sqlite ({})", path.display()),
        None => format!(
            "postgres ({}@{}:{}/{})",
            cfg.database.user,
            config::DB_HOST,
            config::DB_PORT,
            cfg.database.name
        ),
    }
}

/// Sanitize secrets in configuration for safe display
fn sanitize_secrets(cfg: &Config) -> Config {
    let mut sanitized = cfg.clone();
    sanitized.database.password = mask_secret(&sanitized.database.password);
    sanitized
}

/// Mask a secret for safe display
///
/// Empty secrets stay empty so a missing password is visible
fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        String::new()
    } else {
        "***".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("hunter2"), "***");
        assert_eq!(mask_secret(""), "");
    }

    #[test]
    fn test_sanitize_secrets() {
        let mut cfg = Config::default();
        cfg.database.password = "hunter2".to_string();

        let sanitized = sanitize_secrets(&cfg);
        assert_eq!(sanitized.database.password, "***");
        assert_eq!(cfg.database.password, "hunter2");
    }

    #[test]
    fn test_describe_backend() {
        let mut cfg = Config::default();
        cfg.database.user = "delog".to_string();
        cfg.database.name = "logs".to_string();
        assert_eq!(describe_backend(&cfg), "postgres (delog@db:5432/logs)");

        cfg.database.sqlite_path = Some(PathBuf::from("audit.db"));
        assert_eq!(describe_backend(&cfg), "sqlite (audit.db)");
    }
}
