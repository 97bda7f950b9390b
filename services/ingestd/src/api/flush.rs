//! Manual flush trigger for operators and tests.
use crate::app::AppState;
use crate::flusher::FlushReport;
use axum::extract::State;
use axum::Json;

#[utoipa::path(
    post,
    path = "/v1/flush",
    tag = "flush",
    responses(
        (status = 200, description = "Flush completed; error field set if the batch was lost", body = FlushReport)
    )
)]
pub(crate) async fn trigger_flush(State(state): State<AppState>) -> Json<FlushReport> {
    let report = state.flusher.flush().await;
    tracing::info!(
        drained = report.drained,
        inserted = report.inserted,
        rejected = report.rejected,
        "manual flush requested"
    );
    Json(report)
}
