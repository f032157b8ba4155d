use serde::Serialize;
use utoipa::ToSchema;

/// Overall service condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Session store reachable.
    Ok,
    /// Session store unreachable; gameplay calls fail with 503.
    Degraded,
}

/// Payload of the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Current condition.
    pub status: HealthStatus,
    /// Sessions with at least one open event stream.
    pub streaming_sessions: usize,
}

impl HealthResponse {
    /// Everything reachable.
    pub fn ok(streaming_sessions: usize) -> Self {
        Self {
            status: HealthStatus::Ok,
            streaming_sessions,
        }
    }

    /// Running without a session store.
    pub fn degraded(streaming_sessions: usize) -> Self {
        Self {
            status: HealthStatus::Degraded,
            streaming_sessions,
        }
    }
}
