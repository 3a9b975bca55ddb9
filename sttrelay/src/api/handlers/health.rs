//! Liveness check.

use axum::Json;

use crate::api::models::health::HealthResponse;

#[utoipa::path(
    get,
    path = "/healthz",
    tag = "health",
    summary = "Liveness check",
    description = "Returns ok while the process is serving. Does not contact the provider.",
    responses(
        (status = 200, description = "Relay is up", body = HealthResponse),
    )
)]
pub async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}
