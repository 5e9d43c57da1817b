//! Command handling for the classroom: role checks, coordinator calls and
//! execution of the resulting effects, including the poll timers.

use tokio::{
    task::JoinHandle,
    time::{Instant, MissedTickBehavior, interval_at, sleep},
};
use tracing::{debug, info};

use crate::{
    dto::ws::{
        ClientMessage, CreatePollRequest, JoinRequest, RemoveParticipantRequest, ServerMessage,
        SubmitAnswerRequest,
    },
    error::ServiceError,
    state::{
        Classroom, SharedState,
        coordinator::{Effect, PollCoordinator},
        poll::PollId,
        registry::{ConnectionId, Role},
        timers::{PollTimer, TimerKind},
    },
};

/// Route a parsed client message to its handler.
pub async fn handle_message(
    state: &SharedState,
    connection_id: ConnectionId,
    message: ClientMessage,
) -> Result<(), ServiceError> {
    match message {
        ClientMessage::Join(request) => join(state, connection_id, request).await,
        ClientMessage::CreatePoll(request) => create_poll(state, connection_id, request).await,
        ClientMessage::SubmitAnswer(request) => {
            submit_answer(state, connection_id, request).await
        }
        ClientMessage::EndPollEarly => end_poll_early(state, connection_id).await,
        ClientMessage::RemoveParticipant(request) => {
            remove_participant(state, connection_id, request).await
        }
        ClientMessage::RequestHistory => request_history(state, connection_id).await,
        ClientMessage::Unknown => Err(ServiceError::InvalidInput(
            "unknown message type".into(),
        )),
    }
}

/// Register the connection as a teacher or a student.
pub async fn join(
    state: &SharedState,
    connection_id: ConnectionId,
    request: JoinRequest,
) -> Result<(), ServiceError> {
    let mut classroom = state.classroom().lock().await;
    let Classroom { coordinator, timer } = &mut *classroom;

    let effects = coordinator.join(connection_id, request.role, request.name.clone())?;
    info!(
        %connection_id,
        role = ?request.role,
        name = request.name.as_deref().unwrap_or("-"),
        "participant joined"
    );
    dispatch(state, timer, effects);
    Ok(())
}

/// Start a poll on behalf of a teacher.
pub async fn create_poll(
    state: &SharedState,
    connection_id: ConnectionId,
    request: CreatePollRequest,
) -> Result<(), ServiceError> {
    let draft = request.into_draft(state.config().default_time_limit_seconds());

    let mut classroom = state.classroom().lock().await;
    let Classroom { coordinator, timer } = &mut *classroom;
    require_role(coordinator, &connection_id, Role::Teacher, "create_poll")?;

    let effects = coordinator.create_poll(draft)?;
    if let Some(active) = coordinator.active_poll() {
        info!(
            poll_id = %active.poll.id,
            question = %active.poll.question,
            seconds = active.poll.time_limit_seconds,
            "poll started"
        );
    }
    dispatch(state, timer, effects);
    Ok(())
}

/// Record a student's answer.
pub async fn submit_answer(
    state: &SharedState,
    connection_id: ConnectionId,
    request: SubmitAnswerRequest,
) -> Result<(), ServiceError> {
    let mut classroom = state.classroom().lock().await;
    let Classroom { coordinator, timer } = &mut *classroom;
    require_role(coordinator, &connection_id, Role::Student, "submit_answer")?;
    let name = request.name.trim();
    require_own_name(coordinator, &connection_id, name)?;

    let effects = coordinator.submit_answer(name, &request.option)?;
    debug!(%name, option = %request.option, "answer recorded");
    dispatch(state, timer, effects);
    Ok(())
}

/// Stop the running poll right away.
pub async fn end_poll_early(
    state: &SharedState,
    connection_id: ConnectionId,
) -> Result<(), ServiceError> {
    let mut classroom = state.classroom().lock().await;
    let Classroom { coordinator, timer } = &mut *classroom;
    require_role(coordinator, &connection_id, Role::Teacher, "end_poll_early")?;

    let effects = coordinator.end_poll_early()?;
    info!("poll ended early by teacher");
    dispatch(state, timer, effects);
    Ok(())
}

/// Kick a student out of the session.
pub async fn remove_participant(
    state: &SharedState,
    connection_id: ConnectionId,
    request: RemoveParticipantRequest,
) -> Result<(), ServiceError> {
    let mut classroom = state.classroom().lock().await;
    let Classroom { coordinator, timer } = &mut *classroom;
    require_role(coordinator, &connection_id, Role::Teacher, "remove_participant")?;

    let effects = coordinator.remove_participant(&request.name)?;
    info!(name = %request.name, "participant removed by teacher");
    dispatch(state, timer, effects);
    Ok(())
}

/// Reply to the teacher with every finished poll.
pub async fn request_history(
    state: &SharedState,
    connection_id: ConnectionId,
) -> Result<(), ServiceError> {
    let classroom = state.classroom().lock().await;
    require_role(
        &classroom.coordinator,
        &connection_id,
        Role::Teacher,
        "request_history",
    )?;

    let entries = classroom.coordinator.history_snapshots();
    state.send_to(&[connection_id], &ServerMessage::PollHistory { entries });
    Ok(())
}

/// Forget a connection whose socket went away.
pub async fn disconnect(state: &SharedState, connection_id: ConnectionId) {
    let mut classroom = state.classroom().lock().await;
    let Classroom { coordinator, timer } = &mut *classroom;

    let effects = coordinator.leave(&connection_id);
    dispatch(state, timer, effects);
}

fn require_role(
    coordinator: &PollCoordinator,
    connection_id: &ConnectionId,
    role: Role,
    operation: &str,
) -> Result<(), ServiceError> {
    match coordinator.registry().get(connection_id) {
        Some(participant) if participant.role == role => Ok(()),
        Some(participant) => Err(ServiceError::RoleViolation(format!(
            "{operation} requires the {role:?} role, connection joined as {:?}",
            participant.role
        ))),
        None => Err(ServiceError::RoleViolation(format!(
            "{operation} requires joining as {role:?} first"
        ))),
    }
}

fn require_own_name(
    coordinator: &PollCoordinator,
    connection_id: &ConnectionId,
    name: &str,
) -> Result<(), ServiceError> {
    let registered = coordinator
        .registry()
        .get(connection_id)
        .and_then(|participant| participant.display_name.as_deref());

    match registered {
        Some(registered) if registered == name => Ok(()),
        _ => Err(ServiceError::RoleViolation(format!(
            "connection cannot answer on behalf of `{name}`"
        ))),
    }
}

/// Carry out coordinator effects in order. Runs under the classroom lock.
fn dispatch(state: &SharedState, timer: &mut PollTimer, effects: Vec<Effect>) {
    for effect in effects {
        match effect {
            Effect::Send {
                recipients,
                message,
            } => state.send_to(&recipients, &message),
            Effect::StartCountdown { poll_id } => {
                timer.replace(poll_id, TimerKind::Countdown, spawn_countdown(state, poll_id));
            }
            Effect::ScheduleCompletion { poll_id } => {
                timer.replace(
                    poll_id,
                    TimerKind::Completion,
                    spawn_completion(state, poll_id),
                );
            }
            Effect::CancelTimer => {
                timer.cancel();
            }
            Effect::Disconnect(connection_id) => state.close_connection(&connection_id),
        }
    }
}

/// Tick the countdown of `poll_id` once per configured interval until the
/// poll is no longer running.
fn spawn_countdown(state: &SharedState, poll_id: PollId) -> JoinHandle<()> {
    let state = state.clone();
    let period = state.config().tick_interval();

    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let mut classroom = state.classroom().lock().await;
            let Classroom { coordinator, timer } = &mut *classroom;
            let effects = coordinator.tick(poll_id);
            let running = coordinator.active_poll_id() == Some(poll_id);
            dispatch(&state, timer, effects);

            if !running {
                info!(%poll_id, "poll timed out");
                break;
            }
        }
    })
}

/// Complete `poll_id` once the debounce delay elapsed.
fn spawn_completion(state: &SharedState, poll_id: PollId) -> JoinHandle<()> {
    let state = state.clone();
    let delay = state.config().completion_debounce();

    tokio::spawn(async move {
        sleep(delay).await;

        let mut classroom = state.classroom().lock().await;
        let Classroom { coordinator, timer } = &mut *classroom;
        let effects = coordinator.complete_scheduled(poll_id);
        if !effects.is_empty() {
            info!(%poll_id, "every student answered; poll completed");
        }
        dispatch(&state, timer, effects);
    })
}
