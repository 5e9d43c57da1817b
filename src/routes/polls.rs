use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::poll::{HistoryEntrySnapshot, ParticipantsResponse, PollSnapshot},
    error::AppError,
    services::public_service,
    state::SharedState,
};

/// Read-only endpoints exposing the classroom state.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/polls/current", get(get_current_poll))
        .route("/polls/history", get(get_history))
        .route("/polls/history/{poll_id}", get(get_history_entry))
        .route("/participants", get(get_participants))
}

#[utoipa::path(
    get,
    path = "/polls/current",
    tag = "polls",
    responses((status = 200, description = "Running poll, or null while idle", body = Option<PollSnapshot>))
)]
/// Return the poll currently accepting answers.
pub async fn get_current_poll(State(state): State<SharedState>) -> Json<Option<PollSnapshot>> {
    Json(public_service::get_current_poll(&state).await)
}

#[utoipa::path(
    get,
    path = "/polls/history",
    tag = "polls",
    responses((status = 200, description = "Finished polls, oldest first", body = [HistoryEntrySnapshot]))
)]
/// Return every finished poll with its final counts.
pub async fn get_history(State(state): State<SharedState>) -> Json<Vec<HistoryEntrySnapshot>> {
    Json(public_service::get_history(&state).await)
}

#[utoipa::path(
    get,
    path = "/polls/history/{poll_id}",
    tag = "polls",
    params(("poll_id" = Uuid, Path, description = "Identifier of a finished poll")),
    responses(
        (status = 200, description = "Finished poll", body = HistoryEntrySnapshot),
        (status = 404, description = "Unknown poll")
    )
)]
/// Return one finished poll with its final counts.
pub async fn get_history_entry(
    State(state): State<SharedState>,
    Path(poll_id): Path<Uuid>,
) -> Result<Json<HistoryEntrySnapshot>, AppError> {
    let payload = public_service::get_history_entry(&state, poll_id).await?;
    Ok(Json(payload))
}

#[utoipa::path(
    get,
    path = "/participants",
    tag = "polls",
    responses((status = 200, description = "Connected students", body = ParticipantsResponse))
)]
/// Return the names of the connected students.
pub async fn get_participants(State(state): State<SharedState>) -> Json<ParticipantsResponse> {
    Json(public_service::get_participants(&state).await)
}
