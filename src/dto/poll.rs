use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::format_system_time,
    state::poll::{OptionTally, Poll, PollHistoryEntry},
};

/// Poll as shown to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PollSnapshot {
    pub id: Uuid,
    pub question: String,
    pub options: Vec<String>,
    pub time_limit_seconds: u32,
    /// Present while the poll is running.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_seconds: Option<u32>,
    /// RFC 3339 start time.
    pub created_at: String,
}

impl PollSnapshot {
    /// Project `poll`, attaching the countdown when it is still running.
    pub fn from_poll(poll: &Poll, remaining_seconds: Option<u32>) -> Self {
        Self {
            id: poll.id,
            question: poll.question.clone(),
            options: poll.options.clone(),
            time_limit_seconds: poll.time_limit_seconds,
            remaining_seconds,
            created_at: format_system_time(poll.created_at),
        }
    }
}

/// Count of answers for one option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct OptionResult {
    pub option: String,
    pub count: usize,
    pub is_correct: bool,
}

impl From<OptionTally> for OptionResult {
    fn from(value: OptionTally) -> Self {
        Self {
            option: value.option,
            count: value.count,
            is_correct: value.is_correct,
        }
    }
}

/// A finished poll with its final counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct HistoryEntrySnapshot {
    pub poll: PollSnapshot,
    pub results: Vec<OptionResult>,
    /// RFC 3339 end time.
    pub ended_at: String,
}

impl From<&PollHistoryEntry> for HistoryEntrySnapshot {
    fn from(value: &PollHistoryEntry) -> Self {
        Self {
            poll: PollSnapshot::from_poll(&value.poll, None),
            results: value.results.iter().cloned().map(Into::into).collect(),
            ended_at: format_system_time(value.ended_at),
        }
    }
}

/// Names of the students currently connected, in join order.
#[derive(Debug, Serialize, ToSchema)]
pub struct ParticipantsResponse {
    pub names: Vec<String>,
}
