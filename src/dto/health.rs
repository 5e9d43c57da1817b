use serde::Serialize;
use utoipa::ToSchema;

/// Simple health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status (always "ok" while the process serves requests).
    pub status: String,
    /// Number of open WebSocket connections.
    pub connections: usize,
    /// Whether a poll is currently running.
    pub poll_active: bool,
}

impl HealthResponse {
    /// Create a health response indicating the system is operational.
    pub fn ok(connections: usize, poll_active: bool) -> Self {
        Self {
            status: "ok".to_string(),
            connections,
            poll_active,
        }
    }
}

/// Banner returned by the root route.
#[derive(Debug, Serialize, ToSchema)]
pub struct IndexResponse {
    /// Service name.
    pub message: String,
    /// Always "running".
    pub status: String,
}

impl IndexResponse {
    /// Banner for the running service.
    pub fn running() -> Self {
        Self {
            message: "Live polling API".to_string(),
            status: "running".to_string(),
        }
    }
}
