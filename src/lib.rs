pub mod api;
pub mod config;
pub mod services;
pub mod utils;

use crate::config::UploadConfig;
use crate::services::staging::{PayloadStore, TempFileStore};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::from_fn,
    routing::{get, post},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::upload::upload_payload,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            services::report::UploadReportResponse,
            services::report::PayloadSource,
            api::handlers::upload::ResponseFormat,
            api::handlers::health::HealthResponse,
        )
    ),
    tags(
        (name = "upload", description = "Payload staging and echo"),
        (name = "system", description = "Service status")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PayloadStore>,
    pub config: UploadConfig,
}

impl AppState {
    /// State backed by temp files in `config.temp_dir`.
    pub fn new(config: UploadConfig) -> Self {
        Self {
            store: Arc::new(TempFileStore::from_config(&config)),
            config,
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    let body_limit = state.config.body_limit();

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health::health_check))
        .route("/", post(api::handlers::upload::upload_payload))
        .route("/upload", post(api::handlers::upload::upload_payload))
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
