use axum::Json;
use serde::Serialize;

/// Service name reported by the health check.
pub const SERVICE_NAME: &str = "orchestrator";

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// GET /health: liveness check. The queue is in-process, so there is
/// nothing else to check.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
