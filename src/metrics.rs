use anyhow::Context;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Install the Prometheus recorder
///
/// Fails if a global recorder is already installed.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;

    init_metric_descriptions();

    Ok(handle)
}

/// Initialize metric descriptions (can be called multiple times safely)
fn init_metric_descriptions() {
    describe_counter!(
        "delog_requests_total",
        "Requests to the submit endpoint by response status"
    );
    describe_histogram!(
        "delog_request_duration_seconds",
        "Submit request handling time in seconds"
    );
    describe_counter!(
        "delog_entries_total",
        "Classified log lines by kind"
    );
    describe_counter!(
        "delog_audit_inserts_total",
        "Audit record inserts by outcome"
    );
    describe_gauge!("delog_info", "Service version information");

    gauge!("delog_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
}

/// Record a finished submit request
pub fn record_request(status: u16, duration: Duration) {
    counter!("delog_requests_total", "status" => status.to_string()).increment(1);
    histogram!("delog_request_duration_seconds").record(duration.as_secs_f64());
}

/// Record classified entries
pub fn record_entries(structured: u64, raw: u64) {
    if structured > 0 {
        counter!("delog_entries_total", "kind" => "structured").increment(structured);
    }
    if raw > 0 {
        counter!("delog_entries_total", "kind" => "raw").increment(raw);
    }
}

/// Record the outcome of one audit insert
pub fn record_audit_insert(ok: bool) {
    let outcome = if ok { "ok" } else { "error" };
    counter!("delog_audit_inserts_total", "outcome" => outcome).increment(1);
}
