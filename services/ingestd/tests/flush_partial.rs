mod common;
mod http_helpers;

use async_trait::async_trait;
use axum::http::StatusCode;
use common::{read_json, state_with_sink};
use http_helpers::{device_request, get_request, json_request};
use ingestd::app::build_router;
use ingestd::sink::{BulkInsertOutcome, ReadingSink, Result as SinkResult, SinkError};
use std::sync::Arc;
use tower::ServiceExt;

/// Accepts a batch but rejects the last two rows, as a constraint-violating
/// subset would.
struct PartiallyRejectingSink;

#[async_trait]
impl ReadingSink for PartiallyRejectingSink {
    async fn insert_many(
        &self,
        readings: &[Arc<acequia_model::Reading>],
    ) -> SinkResult<BulkInsertOutcome> {
        let rejected = readings.len().min(2);
        Ok(BulkInsertOutcome {
            inserted: readings.len() - rejected,
            rejected,
        })
    }

    async fn health_check(&self) -> SinkResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "partial"
    }
}

struct UnavailableSink;

#[async_trait]
impl ReadingSink for UnavailableSink {
    async fn insert_many(
        &self,
        _readings: &[Arc<acequia_model::Reading>],
    ) -> SinkResult<BulkInsertOutcome> {
        Err(SinkError::unavailable(anyhow::anyhow!("connection refused")))
    }

    async fn health_check(&self) -> SinkResult<()> {
        Err(SinkError::unavailable(anyhow::anyhow!("connection refused")))
    }

    fn backend_name(&self) -> &'static str {
        "unavailable"
    }
}

async fn ingest_n(app: &axum::Router, n: usize) {
    for i in 0..n {
        let request = device_request(
            "POST",
            "/v1/readings",
            "esp32-001",
            serde_json::json!({
                "channel_id": "west-main",
                "flow_rate": 3.0 + i as f64,
            }),
        );
        let response = app.clone().oneshot(request).await.expect("ingest");
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }
}

#[tokio::test]
async fn partial_rejection_is_reported_and_buffer_still_clears() {
    let state = state_with_sink(Arc::new(PartiallyRejectingSink));
    let app = build_router(state.clone());
    ingest_n(&app, 5).await;

    let response = app
        .clone()
        .oneshot(json_request("POST", "/v1/flush", serde_json::json!({})))
        .await
        .expect("flush");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["drained"], 5);
    assert_eq!(body["inserted"], 3);
    assert_eq!(body["rejected"], 2);
    assert!(body.get("error").is_none());

    let response = app
        .clone()
        .oneshot(get_request("/v1/buffer/stats"))
        .await
        .expect("stats");
    let body = read_json(response).await;
    assert_eq!(body["channels"]["west-main"]["pending"], 0);
}

#[tokio::test]
async fn total_failure_loses_the_batch_but_keeps_serving_latest() {
    let state = state_with_sink(Arc::new(UnavailableSink));
    let app = build_router(state.clone());
    ingest_n(&app, 2).await;

    let response = app
        .clone()
        .oneshot(json_request("POST", "/v1/flush", serde_json::json!({})))
        .await
        .expect("flush");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["drained"], 2);
    assert_eq!(body["inserted"], 0);
    assert!(body["error"]
        .as_str()
        .expect("error")
        .contains("connection refused"));

    // At-most-once: nothing is re-queued for the next flush.
    let response = app
        .clone()
        .oneshot(json_request("POST", "/v1/flush", serde_json::json!({})))
        .await
        .expect("second flush");
    let body = read_json(response).await;
    assert_eq!(body["drained"], 0);

    // Snapshot reads still answer from the buffer's latest slot.
    let response = app
        .clone()
        .oneshot(get_request("/v1/channels/west-main/latest"))
        .await
        .expect("latest");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["reading"]["flow_rate"], 4.0);

    // The degraded sink shows up in health.
    let response = app
        .clone()
        .oneshot(get_request("/v1/system/health"))
        .await
        .expect("health");
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = read_json(response).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["sink"]["healthy"], false);
}
