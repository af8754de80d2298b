use axum::{
    Json,
    extract::multipart::MultipartError,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::services::report::REPORT_HEADING;
use crate::services::staging::StagingError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Staging(#[from] StagingError),

    #[error("no payload field or body in request")]
    MissingPayload,

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Payload Too Large: {0}")]
    PayloadTooLarge(String),
}

impl AppError {
    /// Classifies a body/multipart read failure the way the HTTP layer reports it.
    pub fn from_body_error(status: StatusCode, message: String) -> Self {
        if status == StatusCode::PAYLOAD_TOO_LARGE || message.contains("length limit exceeded") {
            AppError::PayloadTooLarge("Request body exceeds the maximum allowed limit".to_string())
        } else {
            AppError::BadRequest(message)
        }
    }

    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            AppError::Staging(StagingError::Stream { source }) => {
                let err = match source
                    .get_ref()
                    .and_then(|inner| inner.downcast_ref::<MultipartError>())
                {
                    Some(e) => AppError::from_body_error(e.status(), e.body_text()),
                    None => AppError::from_body_error(StatusCode::BAD_REQUEST, source.to_string()),
                };
                err.status_and_message()
            }
            AppError::Staging(e) => {
                tracing::error!("Staging error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            AppError::MissingPayload => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg.clone()),
        }
    }

    pub fn into_json_response(self) -> Response {
        let (status, message) = self.status_and_message();
        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        let body = format!("{}error: {}<BR>\n", REPORT_HEADING, message);

        (
            status,
            [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
            body,
        )
            .into_response()
    }
}
