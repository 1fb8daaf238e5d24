//! PostgreSQL audit store
//!
//! Production backend. Connection pooling, the startup ping and the schema
//! migration live here; the rest of the crate only sees [`AuditSink::insert`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};
use sqlx::Row;

use super::{AuditRecord, AuditSink, StoredAuditRecord};
use crate::config::{DatabaseConfig, DB_HOST, DB_PORT};
use crate::error::AuditError;

/// Audit store backed by a PostgreSQL pool
pub struct PgAuditStore {
    pool: PgPool,
}

impl PgAuditStore {
    /// Connect to `db:5432`, verify the connection and ensure the `delogged` table
    pub async fn connect(cfg: &DatabaseConfig) -> Result<Self> {
        let options = PgConnectOptions::new()
            .host(DB_HOST)
            .port(DB_PORT)
            .username(&cfg.user)
            .password(&cfg.password)
            .database(&cfg.name)
            .ssl_mode(PgSslMode::Disable);

        let pool = PgPoolOptions::new()
            .max_connections(cfg.max_connections)
            .acquire_timeout(cfg.connect_timeout())
            .connect_with(options)
            .await
            .context("Unable to connect to database")?;

        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .context("Failed to ping database")?;

        tracing::info!(host = DB_HOST, port = DB_PORT, "Successfully connected to PostgreSQL");

        let store = Self::from_pool(pool);
        store.run_migrations().await?;

        Ok(store)
    }

    /// Wrap an existing pool; the schema is assumed to exist
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations/postgres")
            .run(&self.pool)
            .await
            .context("Failed to create table")?;

        tracing::info!("Database table 'delogged' ready");
        Ok(())
    }

    /// Newest records first
    pub async fn recent(&self, limit: u32) -> Result<Vec<StoredAuditRecord>, AuditError> {
        let rows = sqlx::query(
            "SELECT id::BIGINT AS id, timestamp, remote_addr, request_body,
                    response_body::TEXT AS response_body, status_code, error_msg
             FROM delogged
             ORDER BY id DESC
             LIMIT $1",
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
impl AuditSink for PgAuditStore {
    async fn insert(&self, record: &AuditRecord) -> Result<(), AuditError> {
        sqlx::query(
            "INSERT INTO delogged (timestamp, remote_addr, request_body, response_body, status_code, error_msg)
             VALUES ($1, $2, $3, $4::JSONB, $5, $6)",
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
