//! Audit record finalization and dispatch
//!
//! [`AuditGuard`] owns the record for the lifetime of one request. Dropping the
//! guard (normal return, early return or unwinding) finalizes the record and
//! spawns a single insert task on the writer's [`TaskTracker`]. The tracker
//! lets shutdown wait for inserts that are still in flight.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::task::TaskTracker;

use super::{AuditRecord, AuditSink};
use crate::error::{AppError, AuditError};
use crate::metrics;

/// Shared handle that opens audit records and persists finalized ones
#[derive(Clone)]
pub struct AuditWriter {
    sink: Arc<dyn AuditSink>,
    insert_timeout: Duration,
    tracker: TaskTracker,
}

impl AuditWriter {
    /// # Arguments
    ///
    /// * `sink` - Destination for finalized records
    /// * `insert_timeout` - Upper bound for a single insert; exceeding it counts as a failure
    pub fn new(sink: Arc<dyn AuditSink>, insert_timeout: Duration) -> Self {
        Self {
            sink,
            insert_timeout,
            tracker: TaskTracker::new(),
        }
    }

    /// Open a record for a request that just arrived
    pub fn begin(&self, remote_addr: impl Into<String>) -> AuditGuard {
        AuditGuard {
            record: Some(AuditRecord::new(remote_addr)),
            writer: self.clone(),
        }
    }

    #[cfg(test)]
    fn pending_count(&self) -> usize {
        self.tracker.len()
    }

    /// Close the tracker and wait for in-flight inserts
    ///
    /// Returns `false` if `grace` elapsed before every insert finished.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        self.tracker.close();

        let pending = self.tracker.len();
        if pending > 0 {
            tracing::info!(pending = pending, "Waiting for in-flight audit inserts");
        }

        match tokio::time::timeout(grace, self.tracker.wait()).await {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!(
                    remaining = self.tracker.len(),
                    grace_ms = grace.as_millis(),
                    "Audit inserts still running after shutdown grace period"
                );
                false
            }
        }
    }

    fn submit(&self, record: AuditRecord) {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                tracing::error!(
                    remote_addr = %record.remote_addr,
                    status = record.status_code,
                    "No async runtime available, audit record dropped"
                );
                return;
            }
        };

        let sink = self.sink.clone();
        let insert_timeout = self.insert_timeout;
        self.tracker
            .spawn_on(persist(sink, record, insert_timeout), &handle);
    }
}

/// Single insert attempt; never retried
async fn persist(sink: Arc<dyn AuditSink>, record: AuditRecord, insert_timeout: Duration) {
    let start = Instant::now();

    let result = match tokio::time::timeout(insert_timeout, sink.insert(&record)).await {
        Ok(result) => result,
        Err(_) => Err(AuditError::Timeout(insert_timeout)),
    };

    match result {
        Ok(()) => {
            metrics::record_audit_insert(true);
            tracing::debug!(
                remote_addr = %record.remote_addr,
                status = record.status_code,
                duration_ms = start.elapsed().as_millis(),
                "Audit record stored"
            );
        }
        Err(e) => {
            metrics::record_audit_insert(false);
            tracing::error!(
                error = %e,
                remote_addr = %record.remote_addr,
                status = record.status_code,
                "Failed to insert audit record"
            );
        }
    }
}

/// Exclusive, mutable audit record for one request
///
/// Finalized exactly once, when dropped.
pub struct AuditGuard {
    record: Option<AuditRecord>,
    writer: AuditWriter,
}

impl AuditGuard {
    pub fn record_request_body(&mut self, body: String) {
        if let Some(record) = self.record.as_mut() {
            record.request_body = body;
        }
    }

    /// Store the payload sent to the client; status stays 200
    pub fn succeed(&mut self, response_body: String) {
        if let Some(record) = self.record.as_mut() {
            record.response_body = Some(response_body);
        }
    }

    pub fn fail(&mut self, error: &AppError) {
        if let Some(record) = self.record.as_mut() {
            record.status_code = error.status().as_u16();
            record.error_msg = error.audit_message().to_string();
        }
    }

    #[cfg(test)]
    fn record(&self) -> Option<&AuditRecord> {
        self.record.as_ref()
    }
}

impl Drop for AuditGuard {
    fn drop(&mut self) {
        if let Some(record) = self.record.take() {
            self.writer.submit(record);
        }
    }
}
