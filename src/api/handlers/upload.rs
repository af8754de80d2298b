use crate::AppState;
use crate::api::error::AppError;
use crate::services::report::{PayloadSource, UploadReport, UploadReportResponse};
use crate::utils::form::find_form_field;
use axum::{
    Json,
    body::Bytes,
    extract::{FromRequest, Multipart, Query, Request, State},
    http::header,
    response::{IntoResponse, Response},
};
use futures::TryStreamExt;
use serde::Deserialize;
use std::path::PathBuf;
use tokio_util::io::StreamReader;
use tracing::{info, warn};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    #[default]
    Html,
    Json,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UploadQuery {
    /// Response body format (default: html)
    pub format: Option<ResponseFormat>,
}

#[utoipa::path(
    post,
    path = "/upload",
    params(UploadQuery),
    request_body(
        content = String,
        description = "Multipart file or form value named `payload`, or a raw body",
        content_type = "multipart/form-data"
    ),
    responses(
        (status = 200, description = "Payload staged and echoed", body = UploadReportResponse),
        (status = 400, description = "No payload in request"),
        (status = 413, description = "Payload too large"),
        (status = 500, description = "Temp file could not be written or read")
    ),
    tag = "upload"
)]
pub async fn upload_payload(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    request: Request,
) -> Response {
    let format = query.format.unwrap_or_default();

    match process_upload(&state, request).await {
        Ok(report) => {
            info!(
                "Echoed {} bytes from {} ({:?})",
                report.size,
                report.path.display(),
                report.source
            );
            match format {
                ResponseFormat::Html => (
                    [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                    report.to_html(),
                )
                    .into_response(),
                ResponseFormat::Json => Json(report.to_response()).into_response(),
            }
        }
        Err(e) => {
            warn!("Upload failed: {}", e);
            match format {
                ResponseFormat::Html => e.into_response(),
                ResponseFormat::Json => e.into_json_response(),
            }
        }
    }
}

/// Stages the request payload, then reads it back in full.
pub async fn process_upload(state: &AppState, request: Request) -> Result<UploadReport, AppError> {
    let (source, path) = resolve_payload_source(state, request).await?;
    let read = state.store.read_all(&path).await?;

    Ok(UploadReport {
        source,
        path,
        size: read.size,
        content: read.content,
    })
}

/// Puts the payload on disk and returns where it landed.
///
/// Multipart file parts are streamed to their own temp file. Any other value
/// (form field, multipart text field, raw body) is written out by the store.
pub async fn resolve_payload_source(
    state: &AppState,
    request: Request,
) -> Result<(PayloadSource, PathBuf), AppError> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<mime::Mime>().ok());

    match content_type {
        Some(m) if m.type_() == mime::MULTIPART && m.subtype() == mime::FORM_DATA => {
            let multipart = Multipart::from_request(request, state)
                .await
                .map_err(|e| AppError::from_body_error(e.status(), e.body_text()))?;
            stage_multipart(state, multipart).await
        }
        Some(m) if m.essence_str() == mime::APPLICATION_WWW_FORM_URLENCODED.essence_str() => {
            let body = read_body(state, request).await?;
            let value = find_form_field(&body, &state.config.field_name)
                .ok_or(AppError::MissingPayload)?;
            let path = state.store.stage_bytes(&value).await?;
            Ok((PayloadSource::Posted, path))
        }
        _ => {
            let body = read_body(state, request).await?;
            if body.is_empty() {
                return Err(AppError::MissingPayload);
            }
            let path = state.store.stage_bytes(&body).await?;
            Ok((PayloadSource::Posted, path))
        }
    }
}

async fn stage_multipart(
    state: &AppState,
    mut multipart: Multipart,
) -> Result<(PayloadSource, PathBuf), AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::from_body_error(e.status(), e.body_text()))?
    {
        if field.name() != Some(state.config.field_name.as_str()) {
            continue;
        }

        let source = if field.file_name().is_some() {
            PayloadSource::Uploaded
        } else {
            PayloadSource::Posted
        };

        let reader = StreamReader::new(field.map_err(std::io::Error::other));
        let path = state.store.stage_stream(Box::new(reader)).await?;
        return Ok((source, path));
    }

    Err(AppError::MissingPayload)
}

async fn read_body(state: &AppState, request: Request) -> Result<Bytes, AppError> {
    Bytes::from_request(request, state)
        .await
        .map_err(|e| AppError::from_body_error(e.status(), e.body_text()))
}
