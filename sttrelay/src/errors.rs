use crate::api::models::transcriptions::ErrorResponse;
use axum::{
    Json,
    extract::multipart::{MultipartError, MultipartRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error as ThisError;

/// Failures surfaced to relay callers.
///
/// Only two shapes reach the wire: the provider said no (`Upstream`, status
/// mirrored), or anything else went wrong (`Internal`, always 500).
/// Both render as `{"detail": "..."}`.
#[derive(ThisError, Debug)]
pub enum Error {
    /// The speech-to-text provider answered with a non-success status
    #[error("Provider responded with {status}: {body}")]
    Upstream { status: StatusCode, body: String },

    /// Any failure on our side of the call: bad upload, unreachable provider, undecodable reply
    #[error("{message}")]
    Internal { message: String },
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Upstream { status, .. } => *status,
            Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The text placed in the `detail` field of the error envelope
    pub fn detail(&self) -> String {
        match self {
            Error::Upstream { body, .. } => body.clone(),
            Error::Internal { message } => message.clone(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self {
            Error::Upstream { status, .. } => {
                tracing::warn!(status = %status, "Provider rejected transcription request");
            }
            Error::Internal { message } => {
                tracing::error!("Internal relay error: {}", message);
            }
        }

        let body = ErrorResponse { detail: self.detail() };
        (self.status_code(), Json(body)).into_response()
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        // reqwest's Display carries the URL but never request headers, so the credential stays out
        Error::Internal { message: err.to_string() }
    }
}

impl From<MultipartError> for Error {
    fn from(err: MultipartError) -> Self {
        Error::Internal {
            message: format!("Failed to parse multipart data: {}", err.body_text()),
        }
    }
}

impl From<MultipartRejection> for Error {
    fn from(rejection: MultipartRejection) -> Self {
        Error::Internal {
            message: rejection.body_text(),
        }
    }
}

/// Type alias for relay operation results
pub type Result<T> = std::result::Result<T, Error>;
