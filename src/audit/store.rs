use anyhow::Result;
use async_trait::async_trait;

use super::{AuditRecord, AuditSink, PgAuditStore, SqliteAuditStore, StoredAuditRecord};
use crate::config::DatabaseConfig;
use crate::error::AuditError;

/// Configured audit backend
///
/// Constructed once at startup and shared behind an `Arc`; closed explicitly at
/// shutdown.
pub enum AuditStore {
    Postgres(PgAuditStore),
    Sqlite(SqliteAuditStore),
}

impl AuditStore {
    /// Connect to the backend selected by `database.sqlite_path`
    pub async fn connect(cfg: &DatabaseConfig) -> Result<Self> {
        match &cfg.sqlite_path {
            Some(path) => Ok(Self::Sqlite(SqliteAuditStore::connect(path, cfg).await?)),
            None => Ok(Self::Postgres(PgAuditStore::connect(cfg).await?)),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Postgres(_) => "postgres",
            Self::Sqlite(_) => "sqlite",
        }
    }

    pub async fn recent(&self, limit: u32) -> Result<Vec<StoredAuditRecord>, AuditError> {
        match self {
            Self::Postgres(store) => store.recent(limit).await,
            Self::Sqlite(store) => store.recent(limit).await,
        }
    }

    pub async fn close(&self) {
        match self {
            Self::Postgres(store) => store.close().await,
            Self::Sqlite(store) => store.close().await,
        }
        tracing::info!(backend = self.backend_name(), "Audit database connections closed");
    }
}

#[async_trait]
impl AuditSink for AuditStore {
    async fn insert(&self, record: &AuditRecord) -> Result<(), AuditError> {
        match self {
            Self::Postgres(store) => store.insert(record).await,
            Self::Sqlite(store) => store.insert(record).await,
        }
    }
}
