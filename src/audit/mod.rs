//! Per-request audit trail
//!
//! Every request to the submit endpoint produces exactly one [`AuditRecord`]:
//!
//! ```text
//! AuditWriter::begin ──▶ AuditGuard (mutated by the handler) ──drop──▶ AuditSink::insert
//! ```
//!
//! The guard hands its record to the sink when it goes out of scope, whichever
//! way the handler exits. Inserts run as independent tasks; a failed or timed
//! out insert is logged and dropped.

pub mod postgres;
pub mod sqlite;
pub mod store;
pub mod writer;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::AuditError;

pub use postgres::PgAuditStore;
pub use sqlite::SqliteAuditStore;
pub use store::AuditStore;
pub use writer::{AuditGuard, AuditWriter};

/// Audit row for one HTTP request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    /// Request arrival time
    pub timestamp: DateTime<Utc>,
    pub remote_addr: String,
    /// Body as received (lossy UTF-8)
    pub request_body: String,
    /// JSON payload exactly as sent to the client, `None` when none was produced
    pub response_body: Option<String>,
    pub status_code: u16,
    /// Empty when the request succeeded
    pub error_msg: String,
}

impl AuditRecord {
    /// Fresh record with optimistic defaults (200, no error)
    pub fn new(remote_addr: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            remote_addr: remote_addr.into(),
            request_body: String::new(),
            response_body: None,
            status_code: 200,
            error_msg: String::new(),
        }
    }
}

/// An audit row read back from storage
#[derive(Debug, Clone)]
pub struct StoredAuditRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub remote_addr: String,
    pub request_body: String,
    pub response_body: Option<String>,
    pub status_code: i32,
    pub error_msg: String,
}

/// Durable destination for finalized audit records
///
/// Implementations must tolerate concurrent calls from many requests.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn insert(&self, record: &AuditRecord) -> Result<(), AuditError>;
}
