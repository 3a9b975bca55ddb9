use bytes::Bytes;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// An uploaded file, exactly as the caller sent it.
///
/// Lives for one request: read from the inbound multipart body, then moved into the
/// outbound provider request.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Filename declared by the caller, if any
    pub filename: Option<String>,
    /// Content type declared by the caller, if any
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl Upload {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Multipart body accepted by `POST /transcribe` (documentation only)
#[derive(ToSchema)]
#[allow(unused)]
pub struct TranscriptionUpload {
    /// Audio file to transcribe. Filename and content type are forwarded unchanged.
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

/// Error envelope for every failed request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Provider's raw response text for upstream failures, otherwise the error description
    pub detail: String,
}
