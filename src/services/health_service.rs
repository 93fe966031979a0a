use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report the backend health along with the number of live rooms, logging
/// connectivity issues as they are observed.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.require_session_store().await {
        Ok(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "snapshot store health check failed");
            }
        }
        Err(_) => warn!("snapshot store unavailable (degraded mode)"),
    }

    let rooms = state.room_count();
    if state.is_degraded() {
        HealthResponse::degraded(rooms)
    } else {
        HealthResponse::ok(rooms)
    }
}
