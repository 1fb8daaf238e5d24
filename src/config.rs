use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// PostgreSQL host; fixed, not configurable
pub const DB_HOST: &str = "db";
/// PostgreSQL port; fixed, not configurable
pub const DB_PORT: u16 = 5432;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub submit_path: String,
    pub max_body_bytes: usize,
    pub shutdown_grace_seconds: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub user: String,
    pub password: String,
    pub name: String,
    /// Record audits to this SQLite file instead of PostgreSQL
    pub sqlite_path: Option<PathBuf>,
    pub max_connections: u32,
    pub connect_timeout_seconds: u64,
    pub insert_timeout_seconds: u64,
}

impl DatabaseConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    pub fn insert_timeout(&self) -> Duration {
        Duration::from_secs(self.insert_timeout_seconds)
    }

    pub fn backend_name(&self) -> &'static str {
        if self.sqlite_path.is_some() {
            "sqlite"
        } else {
            "postgres"
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub endpoint: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8001,
                submit_path: "/api/parse".to_string(),
                max_body_bytes: 10 * 1024 * 1024,
                shutdown_grace_seconds: 10,
            },
            database: DatabaseConfig {
                user: String::new(),
                password: String::new(),
                name: String::new(),
                sqlite_path: None,
                max_connections: 10,
                connect_timeout_seconds: 10,
                insert_timeout_seconds: 5,
            },
            metrics: MetricsConfig {
                enabled: true,
                endpoint: "/metrics".to_string(),
            },
        }
    }
}

/// Load configuration from defaults, an optional TOML file and the environment
///
/// `POSTGRES_USER`, `POSTGRES_PASSWORD` and `POSTGRES_DB_NAME` take precedence
/// over everything else for the database credentials.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let defaults = config::Config::try_from(&Config::default())?;

    let config = config::Config::builder()
        .add_source(defaults)
        .add_source(config::File::from(path).required(false))
        .add_source(
            config::Environment::with_prefix("DELOG")
                .separator("__")
                .try_parsing(true),
        )
        .set_override_option("database.user", std::env::var("POSTGRES_USER").ok())?
        .set_override_option("database.password", std::env::var("POSTGRES_PASSWORD").ok())?
        .set_override_option("database.name", std::env::var("POSTGRES_DB_NAME").ok())?
        .build()?;

    let cfg: Config = config.try_deserialize()?;
    validate_config(&cfg)?;

    Ok(cfg)
}

pub fn validate_config(cfg: &Config) -> anyhow::Result<()> {
    let server = &cfg.server;

    if !server.submit_path.starts_with('/') {
        anyhow::bail!("Submit path '{}' must start with '/'", server.submit_path);
    }
    if server.submit_path == "/health" {
        anyhow::bail!("Submit path cannot be /health");
    }
    if server.max_body_bytes == 0 {
        anyhow::bail!("server.max_body_bytes must be greater than zero");
    }

    if cfg.metrics.enabled {
        if !cfg.metrics.endpoint.starts_with('/') {
            anyhow::bail!("Metrics endpoint '{}' must start with '/'", cfg.metrics.endpoint);
        }
        if cfg.metrics.endpoint == server.submit_path || cfg.metrics.endpoint == "/health" {
            anyhow::bail!(
                "Metrics endpoint '{}' collides with another route",
                cfg.metrics.endpoint
            );
        }
    }

    let db = &cfg.database;
    if db.max_connections == 0 {
        anyhow::bail!("database.max_connections must be greater than zero");
    }
    if db.connect_timeout_seconds == 0 || db.insert_timeout_seconds == 0 {
        anyhow::bail!("Database timeouts must be greater than zero");
    }
    if db.sqlite_path.is_none() {
        if db.user.is_empty() {
            anyhow::bail!("PostgreSQL user is not set (POSTGRES_USER)");
        }
        if db.name.is_empty() {
            anyhow::bail!("PostgreSQL database name is not set (POSTGRES_DB_NAME)");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> Config {
        let mut cfg = Config::default();
        cfg.database.user = "delog".to_string();
        cfg.database.password = "secret".to_string();
        cfg.database.name = "logs".to_string();
        cfg
    }

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.server.port, 8001);
        assert_eq!(cfg.server.submit_path, "/api/parse");
        assert_eq!(cfg.database.insert_timeout(), Duration::from_secs(5));
        assert_eq!(cfg.database.backend_name(), "postgres");
    }

    #[test]
    fn test_validate_config_accepts_test_config() {
        assert!(validate_config(&create_test_config()).is_ok());
    }

    #[test]
    fn test_validate_config_requires_postgres_credentials() {
        let mut cfg = create_test_config();
        cfg.database.user.clear();

        let result = validate_config(&cfg);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("POSTGRES_USER"));
    }

    #[test]
    fn test_validate_config_sqlite_needs_no_credentials() {
        let mut cfg = Config::default();
        cfg.database.sqlite_path = Some(PathBuf::from("audit.db"));
        assert!(validate_config(&cfg).is_ok());
        assert_eq!(cfg.database.backend_name(), "sqlite");
    }

    #[test]
    fn test_validate_config_rejects_bad_paths() {
        let mut cfg = create_test_config();
        cfg.server.submit_path = "api/parse".to_string();
        assert!(validate_config(&cfg).is_err());

        let mut cfg = create_test_config();
        cfg.metrics.endpoint = cfg.server.submit_path.clone();
        assert!(validate_config(&cfg).is_err());

        let mut cfg = create_test_config();
        cfg.metrics.enabled = false;
        cfg.metrics.endpoint = cfg.server.submit_path.clone();
        assert!(validate_config(&cfg).is_ok());
    }

    #[test]
    fn test_validate_config_rejects_zero_limits() {
        let mut cfg = create_test_config();
        cfg.database.insert_timeout_seconds = 0;
        assert!(validate_config(&cfg).is_err());

        let mut cfg = create_test_config();
        cfg.server.max_body_bytes = 0;
        assert!(validate_config(&cfg).is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[server]
port = 9100
submit_path = "/ingest"

[database]
sqlite_path = "audit.db"
insert_timeout_seconds = 2
"#,
        )
        .unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.server.port, 9100);
        assert_eq!(cfg.server.submit_path, "/ingest");
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.database.sqlite_path, Some(PathBuf::from("audit.db")));
        assert_eq!(cfg.database.insert_timeout(), Duration::from_secs(2));
        assert_eq!(cfg.database.max_connections, 10);
    }
}
