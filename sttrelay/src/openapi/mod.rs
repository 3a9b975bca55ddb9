//! OpenAPI documentation for the relay, served at `/openapi.json` and rendered at `/docs`.

use utoipa::OpenApi;

use crate::api::{handlers, models};

#[derive(OpenApi)]
#[openapi(
    paths(handlers::transcriptions::transcribe, handlers::health::healthz),
    components(schemas(
        models::transcriptions::TranscriptionUpload,
        models::transcriptions::ErrorResponse,
        models::health::HealthResponse,
    )),
    tags(
        (name = "transcriptions", description = "Relay audio to the speech-to-text provider"),
        (name = "health", description = "Process liveness"),
    ),
    info(
        title = "sttrelay",
        description = "Forwards uploaded audio to the ElevenLabs speech-to-text API and returns its response unchanged.",
    )
)]
pub struct ApiDoc;
