use crate::{
    audit::{AuditGuard, AuditWriter},
    error::AppError,
    metrics,
    parser::{self, LogEntry},
};
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, Method},
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use std::time::Instant;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub audit: AuditWriter,
    pub max_body_bytes: usize,
}

/// Handle the submit endpoint
///
/// Accepts any method so that rejections are audited too. The audit guard is
/// created first and finalized when this function returns, on every path.
pub async fn handle_parse(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
) -> Response {
    let start = Instant::now();
    let remote_addr = connect_info
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_default();

    let mut audit = state.audit.begin(remote_addr.clone());

    tracing::info!(
        remote_addr = %remote_addr,
        method = %request.method(),
        path = %request.uri().path(),
        "Received request"
    );

    let response = match parse_request(&state, &mut audit, request).await {
        Ok(payload) => {
            tracing::info!(
                remote_addr = %remote_addr,
                bytes = payload.len(),
                "Successfully parsed request"
            );
            audit.succeed(payload.clone());
            json_response(payload)
        }
        Err(e) => {
            match &e {
                AppError::MethodNotAllowed(method) => {
                    tracing::warn!(remote_addr = %remote_addr, method = %method, "Rejected request: method not allowed");
                }
                _ => {
                    tracing::error!(
                        remote_addr = %remote_addr,
                        error = %e,
                        error_type = e.error_type(),
                        "Failed to handle request"
                    );
                }
            }
            audit.fail(&e);
            e.into_response()
        }
    };

    metrics::record_request(response.status().as_u16(), start.elapsed());
    response
}

/// Validate, read, classify and encode; the first failure wins
async fn parse_request(
    state: &AppState,
    audit: &mut AuditGuard,
    request: Request,
) -> Result<String, AppError> {
    if request.method() != Method::POST {
        return Err(AppError::MethodNotAllowed(request.method().clone()));
    }

    let body = axum::body::to_bytes(request.into_body(), state.max_body_bytes)
        .await
        .map_err(|e| AppError::BodyRead(e.to_string()))?;

    let text = String::from_utf8_lossy(&body).into_owned();
    tracing::debug!(bytes = text.len(), "Received log data");

    let entries = parser::classify_text(&text);
    audit.record_request_body(text);
    record_entry_metrics(&entries);

    // Plain string fields only; encoding cannot fail in practice
    Ok(serde_json::to_string(&entries)?)
}

fn json_response(payload: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, "application/json"),
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
        ],
        payload,
    )
        .into_response()
}

fn record_entry_metrics(entries: &[LogEntry]) {
    let structured = entries.iter().filter(|e| e.is_structured()).count() as u64;
    metrics::record_entries(structured, entries.len() as u64 - structured);
}
