use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::{
    dto::{
        poll::{HistoryEntrySnapshot, OptionResult, PollSnapshot},
        validation::{validate_correct_options, validate_options, validate_question},
    },
    error::ServiceError,
    state::{poll::PollDraft, registry::Role},
};

#[derive(Debug, Deserialize, Serialize, ToSchema)]
/// Messages accepted from classroom WebSocket clients.
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Join(JoinRequest),
    CreatePoll(CreatePollRequest),
    SubmitAnswer(SubmitAnswerRequest),
    EndPollEarly,
    RemoveParticipant(RemoveParticipantRequest),
    RequestHistory,
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    /// Parse a text frame and validate the payloads that carry constraints.
    pub fn from_json_str(text: &str) -> Result<Self, ServiceError> {
        let message: Self = serde_json::from_str(text)
            .map_err(|err| ServiceError::InvalidInput(err.to_string()))?;

        if let Self::CreatePoll(request) = &message {
            request.validate()?;
        }

        Ok(message)
    }
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
/// Registers the connection as a teacher or a named student.
pub struct JoinRequest {
    pub role: Role,
    /// Required for students.
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
#[validate(schema(function = "validate_correct_option_subset"))]
/// Starts a new poll. Teacher only.
pub struct CreatePollRequest {
    #[validate(length(min = 1, max = 100), custom(function = "validate_question"))]
    pub question: String,
    #[validate(length(min = 2, max = 6), custom(function = "validate_options"))]
    pub options: Vec<String>,
    /// Options the teacher flags as correct; reported back in the results.
    #[serde(default)]
    pub correct_options: Vec<String>,
    /// Falls back to the configured default when omitted.
    #[serde(default)]
    #[validate(range(min = 1, max = 3600))]
    pub time_limit_seconds: Option<u32>,
}

fn validate_correct_option_subset(request: &CreatePollRequest) -> Result<(), ValidationError> {
    validate_correct_options(&request.options, &request.correct_options)
}

impl CreatePollRequest {
    /// Normalise the request into a poll draft.
    pub fn into_draft(self, default_time_limit_seconds: u32) -> PollDraft {
        let trim_all = |values: Vec<String>| {
            values
                .into_iter()
                .map(|value| value.trim().to_string())
                .collect::<Vec<_>>()
        };

        PollDraft {
            question: self.question.trim().to_string(),
            options: trim_all(self.options),
            correct_options: trim_all(self.correct_options),
            time_limit_seconds: self
                .time_limit_seconds
                .unwrap_or(default_time_limit_seconds),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
/// A student's answer to the active poll.
pub struct SubmitAnswerRequest {
    pub name: String,
    pub option: String,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
/// Kicks a student out of the session. Teacher only.
pub struct RemoveParticipantRequest {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
/// Messages pushed to classroom WebSocket clients.
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Full state sent to teachers when they join and when a poll starts.
    StateSnapshot {
        active_poll: Option<PollSnapshot>,
        participants: Vec<String>,
        history: Vec<HistoryEntrySnapshot>,
    },
    /// A poll started; sent to students and late joiners.
    NewQuestion { poll: PollSnapshot },
    /// The set of connected students changed.
    ParticipantsChanged { names: Vec<String> },
    /// A student answered; sent to teachers.
    AnswerAcknowledged { name: String },
    /// Countdown update, once per tick.
    TimeRemaining { seconds: u32 },
    /// Partial or final counts.
    PollResults { results: Vec<OptionResult> },
    /// The poll ended.
    PollCompleted { results: Vec<OptionResult> },
    /// Reply to `request_history`.
    PollHistory { entries: Vec<HistoryEntrySnapshot> },
    /// Sent to a kicked student right before the connection is closed.
    RemovedFromSession {},
    /// The originating command was refused.
    OperationRejected { reason: String, message: String },
}

impl ServerMessage {
    /// Build the rejection notice for `err`.
    pub fn rejected(err: &ServiceError) -> Self {
        Self::OperationRejected {
            reason: err.reason_code().to_string(),
            message: err.to_string(),
        }
    }
}
