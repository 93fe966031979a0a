use serde::Serialize;
use utoipa::ToSchema;

/// Health payload returned by the `/healthcheck` route, reflecting whether
/// the snapshot store is reachable.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// Number of rooms currently live in memory.
    pub rooms: usize,
}

impl HealthResponse {
    /// Health response for a backend whose snapshot store is reachable.
    pub fn ok(rooms: usize) -> Self {
        Self {
            status: "ok".to_string(),
            rooms,
        }
    }

    /// Health response for a backend running without its snapshot store.
    pub fn degraded(rooms: usize) -> Self {
        Self {
            status: "degraded".to_string(),
            rooms,
        }
    }
}
