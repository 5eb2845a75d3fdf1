use serde::Serialize;
use utoipa::ToSchema;

/// Payload returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema, PartialEq, Eq)]
pub struct HealthResponse {
    /// "ok", or "degraded" while the store is unreachable.
    pub status: &'static str,
    /// Number of attached client connections.
    pub connections: usize,
}

impl HealthResponse {
    pub fn new(degraded: bool, connections: usize) -> Self {
        Self {
            status: if degraded { "degraded" } else { "ok" },
            connections,
        }
    }
}
