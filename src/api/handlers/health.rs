use crate::AppState;
use axum::{Json, extract::State, response::IntoResponse};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub staging_dir: String,
    pub staging_writable: bool,
    pub version: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service health status", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let dir = state.store.staging_dir();
    let staging_writable = tokio::fs::metadata(dir)
        .await
        .map(|m| m.is_dir() && !m.permissions().readonly())
        .unwrap_or(false);

    Json(HealthResponse {
        status: (if staging_writable { "ok" } else { "degraded" }).to_string(),
        staging_dir: dir.display().to_string(),
        staging_writable,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
