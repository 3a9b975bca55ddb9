//! The relay endpoint: one upload in, the provider's transcription out.

use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartRejection},
};
use serde_json::Value;

use crate::AppState;
use crate::api::models::transcriptions::{ErrorResponse, TranscriptionUpload, Upload};
use crate::errors::{Error, Result};

/// Multipart field conventionally carrying the audio
const FILE_FIELD: &str = "file";

#[utoipa::path(
    post,
    path = "/transcribe",
    tag = "transcriptions",
    summary = "Transcribe audio",
    description = "Forward one uploaded audio file to the speech-to-text provider and return its JSON response unchanged.

The file is taken from the `file` field, or from the first part that carries a filename. Its filename and content type are passed through as sent.",
    request_body(
        content = TranscriptionUpload,
        content_type = "multipart/form-data",
        description = "Audio upload"
    ),
    responses(
        (status = 200, description = "Provider's transcription, passed through verbatim", body = serde_json::Value),
        (status = "4XX", description = "Provider rejected the request; status mirrors the provider's and `detail` holds its raw reply", body = ErrorResponse),
        (status = 500, description = "Malformed upload, provider unreachable, or unreadable provider reply", body = ErrorResponse),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn transcribe(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>> {
    let upload = read_upload(multipart?).await?;

    tracing::info!(
        filename = ?upload.filename,
        content_type = ?upload.content_type,
        bytes = upload.size(),
        "Received upload for transcription"
    );

    let transcription = state.provider.transcribe(upload).await?;
    Ok(Json(transcription))
}

/// Pull the audio part out of the request body.
///
/// Takes the first part named `file` or carrying a filename; later parts are not read.
async fn read_upload(mut multipart: Multipart) -> Result<Upload> {
    while let Some(field) = multipart.next_field().await? {
        let is_file = field.name() == Some(FILE_FIELD) || field.file_name().is_some();
        if !is_file {
            continue;
        }

        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?;

        return Ok(Upload {
            filename,
            content_type,
            bytes,
        });
    }

    Err(Error::Internal {
        message: format!("No file found in upload; send the audio in a multipart field named '{FILE_FIELD}'"),
    })
}
