//! SQLite audit store for running without PostgreSQL
//!
//! Same table and contract as the PostgreSQL store; `response_body` is plain
//! TEXT holding the JSON payload.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;
use std::time::Duration;

use super::{AuditRecord, AuditSink, StoredAuditRecord};
use crate::config::DatabaseConfig;
use crate::error::AuditError;

pub struct SqliteAuditStore {
    pool: SqlitePool,
}

impl SqliteAuditStore {
    /// Open (creating if missing) the database file and ensure the schema
    pub async fn connect(path: &Path, cfg: &DatabaseConfig) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)  // readers don't block the writer
            .busy_timeout(Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(cfg.max_connections)
            .acquire_timeout(cfg.connect_timeout())
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open audit database {}", path.display()))?;

        sqlx::migrate!("./migrations/sqlite")
            .run(&pool)
            .await
            .context("Failed to create table")?;

        tracing::info!(path = %path.display(), "SQLite audit database ready");

        Ok(Self { pool })
    }

    /// Newest records first
    pub async fn recent(&self, limit: u32) -> Result<Vec<StoredAuditRecord>, AuditError> {
        let rows = sqlx::query(
            "SELECT id, timestamp, remote_addr, request_body, response_body, status_code, error_msg
             FROM delogged
             ORDER BY id DESC
             LIMIT ?",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        let records = rows
            .into_iter()
            .map(|row| StoredAuditRecord {
                id: row.get("id"),
                timestamp: row.get("timestamp"),
                remote_addr: row.get::<Option<String>, _>("remote_addr").unwrap_or_default(),
                request_body: row.get::<Option<String>, _>("request_body").unwrap_or_default(),
                response_body: row.get("response_body"),
                status_code: row.get::<Option<i32>, _>("status_code").unwrap_or_default(),
                error_msg: row.get::<Option<String>, _>("error_msg").unwrap_or_default(),
            })
            .collect();

        Ok(records)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl AuditSink for SqliteAuditStore {
    async fn insert(&self, record: &AuditRecord) -> Result<(), AuditError> {
        sqlx::query(
            "INSERT INTO delogged (timestamp, remote_addr, request_body, response_body, status_code, error_msg)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(record.timestamp)
        .bind(&record.remote_addr)
        .bind(&record.request_body)
        .bind(record.response_body.as_deref())
        .bind(i32::from(record.status_code))
        .bind(&record.error_msg)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
