use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Liveness check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Always "ok" while the process is serving
    pub status: String,
}
