//! Service helpers that expose read-only projections of the classroom.

use uuid::Uuid;

use crate::{
    dto::poll::{HistoryEntrySnapshot, ParticipantsResponse, PollSnapshot},
    error::ServiceError,
    state::SharedState,
};

/// Return the running poll with its remaining time, if any.
pub async fn get_current_poll(state: &SharedState) -> Option<PollSnapshot> {
    let classroom = state.classroom().lock().await;
    classroom.coordinator.current_poll()
}

/// Return every finished poll, oldest first.
pub async fn get_history(state: &SharedState) -> Vec<HistoryEntrySnapshot> {
    let classroom = state.classroom().lock().await;
    classroom.coordinator.history_snapshots()
}

/// Return the finished poll identified by `poll_id`.
pub async fn get_history_entry(
    state: &SharedState,
    poll_id: Uuid,
) -> Result<HistoryEntrySnapshot, ServiceError> {
    let classroom = state.classroom().lock().await;
    classroom
        .coordinator
        .history()
        .iter()
        .find(|entry| entry.poll.id == poll_id)
        .map(Into::into)
        .ok_or_else(|| ServiceError::NotFound(format!("poll `{poll_id}` not found in history")))
}

/// Return the names of the connected students in join order.
pub async fn get_participants(state: &SharedState) -> ParticipantsResponse {
    let classroom = state.classroom().lock().await;
    ParticipantsResponse {
        names: classroom.coordinator.registry().participant_names(),
    }
}
