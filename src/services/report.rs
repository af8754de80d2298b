use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use utoipa::ToSchema;

pub const REPORT_HEADING: &str = "<B>Uploaded file processing</B><BR>\n";

/// How the payload reached the staging directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PayloadSource {
    /// Multipart file part, streamed straight to disk.
    Uploaded,
    /// Plain form value or raw body, written out by the handler.
    Posted,
}

#[derive(Debug, Clone)]
pub struct UploadReport {
    pub source: PayloadSource,
    pub path: PathBuf,
    pub size: u64,
    pub content: Vec<u8>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadReportResponse {
    pub source: PayloadSource,
    pub path: String,
    pub size: u64,
    pub content_base64: String,
}

impl UploadReport {
    /// Renders the status-line fragment. Content bytes are echoed as received.
    pub fn to_html(&self) -> Vec<u8> {
        let path = self.path.display();
        let mut out = Vec::with_capacity(self.content.len() + 256);
        out.extend_from_slice(REPORT_HEADING.as_bytes());
        if self.source == PayloadSource::Posted {
            out.extend_from_slice(format!("written {}<BR>\n", path).as_bytes());
        }
        out.extend_from_slice(
            format!("reading {} bytes from {}<BR>\n", self.size, path).as_bytes(),
        );
        out.extend_from_slice(b"content: ");
        out.extend_from_slice(&self.content);
        out.extend_from_slice(b"<BR>\n");
        out
    }

    pub fn to_response(&self) -> UploadReportResponse {
        UploadReportResponse {
            source: self.source,
            path: self.path.display().to_string(),
            size: self.size,
            content_base64: STANDARD.encode(&self.content),
        }
    }
}
