/// End-to-end tests for the submit endpoint: routing, classification and the
/// one-audit-record-per-request guarantee
use async_trait::async_trait;
use axum::{
    body::Body,
    extract::connect_info::MockConnectInfo,
    http::{Request, StatusCode},
    Router,
};
use delog::{
    audit::{AuditRecord, AuditSink, AuditStore, AuditWriter},
    config::Config,
    error::AuditError,
    handlers::parse::AppState,
    server::create_router,
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::sync::Mutex;
use tower::ServiceExt;

#[derive(Default)]
struct RecordingSink {
    records: Mutex<Vec<AuditRecord>>,
}

#[async_trait]
impl AuditSink for RecordingSink {
    async fn insert(&self, record: &AuditRecord) -> Result<(), AuditError> {
        self.records.lock().await.push(record.clone());
        Ok(())
    }
}

fn build_app(config: &Config, sink: Arc<dyn AuditSink>) -> (Router, AuditWriter) {
    let writer = AuditWriter::new(sink, config.database.insert_timeout());
    let state = AppState {
        audit: writer.clone(),
        max_body_bytes: config.server.max_body_bytes,
    };
    let app = create_router(config, state, None)
        .layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 5555))));
    (app, writer)
}

fn submit(method: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri("/api/parse")
        .header("content-type", "text/plain")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_structured_and_raw_lines() {
    let sink = Arc::new(RecordingSink::default());
    let (app, writer) = build_app(&Config::default(), sink.clone());

    let body = "[2024-05-01 10:00:00] [ERROR] disk full [sda1]\n  \n[a][b]c\n[x] [] empty level";
    let response = app.oneshot(submit("POST", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = read_json(response).await;
    assert_eq!(
        json,
        serde_json::json!([
            {"timestamp": "2024-05-01 10:00:00", "level": "ERROR", "message": "disk full [sda1]"},
            {"raw": "[a][b]c"},
            {"timestamp": "x", "message": "empty level"},
        ])
    );

    assert!(writer.shutdown(Duration::from_secs(1)).await);
    let records = sink.records.lock().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].request_body, body);
    assert_eq!(records[0].remote_addr, "127.0.0.1:5555");
}

#[tokio::test]
async fn test_every_method_other_than_post_is_rejected() {
    let sink = Arc::new(RecordingSink::default());
    let (app, writer) = build_app(&Config::default(), sink.clone());

    for method in ["GET", "PUT", "DELETE", "PATCH", "OPTIONS"] {
        let response = app.clone().oneshot(submit(method, "[t] [I] m")).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED, "{method}");
    }

    assert!(writer.shutdown(Duration::from_secs(1)).await);
    let records = sink.records.lock().await;
    assert_eq!(records.len(), 5);
    for record in records.iter() {
        assert_eq!(record.status_code, 405);
        assert_eq!(record.error_msg, "Method not allowed");
        assert!(record.request_body.is_empty());
        assert!(record.response_body.is_none());
    }
}

#[tokio::test]
async fn test_concurrent_requests_each_audited_once() {
    let sink = Arc::new(RecordingSink::default());
    let (app, writer) = build_app(&Config::default(), sink.clone());

    let mut handles = Vec::new();
    for i in 0..25 {
        let app = app.clone();
        handles.push(tokio::spawn(async move {
            let response = app
                .oneshot(submit("POST", &format!("[t{i}] [INFO] request {i}")))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert!(writer.shutdown(Duration::from_secs(2)).await);
    let records = sink.records.lock().await;
    assert_eq!(records.len(), 25);

    let mut bodies: Vec<&str> = records.iter().map(|r| r.request_body.as_str()).collect();
    bodies.sort();
    bodies.dedup();
    assert_eq!(bodies.len(), 25);
}

#[tokio::test]
async fn test_sqlite_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.database.sqlite_path = Some(dir.path().join("audit.db"));

    let store = Arc::new(AuditStore::connect(&config.database).await.unwrap());
    let (app, writer) = build_app(&config, store.clone());

    let response = app
        .clone()
        .oneshot(submit("POST", "[t] [WARN] low memory\nfree text"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let sent = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    let response = app.oneshot(submit("GET", "")).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

    assert!(writer.shutdown(Duration::from_secs(2)).await);

    let records = store.recent(10).await.unwrap();
    assert_eq!(records.len(), 2);

    let success = records.iter().find(|r| r.status_code == 200).unwrap();
    assert_eq!(success.response_body.as_deref().map(str::as_bytes), Some(&sent[..]));
    assert_eq!(success.request_body, "[t] [WARN] low memory\nfree text");
    assert_eq!(success.error_msg, "");

    let rejected = records.iter().find(|r| r.status_code == 405).unwrap();
    assert_eq!(rejected.error_msg, "Method not allowed");
    assert!(rejected.response_body.is_none());

    store.close().await;
}
