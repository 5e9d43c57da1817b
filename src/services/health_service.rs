use crate::{dto::health::HealthResponse, state::SharedState};

/// Report liveness together with a few classroom counters.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let connections = state.connections().len();
    let poll_active = state
        .classroom()
        .lock()
        .await
        .coordinator
        .active_poll()
        .is_some();

    HealthResponse::ok(connections, poll_active)
}
