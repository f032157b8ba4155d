use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Probe the session store and report the degraded flag.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.session_store().await {
        Some(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "session store health check failed");
            }
        }
        None => warn!("session store unavailable (degraded mode)"),
    }

    let streaming = state.sse().hub_count();
    if state.is_degraded() {
        HealthResponse::degraded(streaming)
    } else {
        HealthResponse::ok(streaming)
    }
}
