use axum::http::StatusCode;

/// Liveness probe
#[tracing::instrument]
pub async fn healthz() -> StatusCode {
    StatusCode::OK
}
