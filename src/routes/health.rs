use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::health::{HealthResponse, IndexResponse},
    services::health_service,
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/",
    tag = "health",
    responses((status = 200, description = "Service banner", body = IndexResponse))
)]
/// Identify the service.
pub async fn index() -> Json<IndexResponse> {
    Json(IndexResponse::running())
}

#[utoipa::path(
    get,
    path = "/healthcheck",
    tag = "health",
    responses((status = 200, description = "Service is healthy", body = HealthResponse))
)]
/// Return the current health status with connection and poll counters.
pub async fn healthcheck(State(state): State<SharedState>) -> Json<HealthResponse> {
    let status = health_service::health_status(&state).await;
    Json(status)
}

/// Configure the health routes subtree.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/", get(index))
        .route("/healthcheck", get(healthcheck))
}
