use serde::Serialize;
use utoipa::ToSchema;

/// Simple health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// Number of viewer connections currently registered.
    pub connected_clients: usize,
}

impl HealthResponse {
    /// Health response indicating the system is operational.
    pub fn ok(connected_clients: usize) -> Self {
        Self {
            status: "ok".to_string(),
            connected_clients,
        }
    }

    /// Health response indicating the system runs without storage.
    pub fn degraded(connected_clients: usize) -> Self {
        Self {
            status: "degraded".to_string(),
            connected_clients,
        }
    }
}
