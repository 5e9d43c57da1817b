use std::time::SystemTime;

use uuid::Uuid;

use crate::state::registry::SessionRegistry;

/// Identifier of a poll.
pub type PollId = Uuid;

/// Teacher-supplied content of a poll before it is started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollDraft {
    /// Question shown to students.
    pub question: String,
    /// Ordered answer options.
    pub options: Vec<String>,
    /// Options flagged as correct by the teacher. Only surfaced in results.
    pub correct_options: Vec<String>,
    /// Seconds students have to answer.
    pub time_limit_seconds: u32,
}

/// A question with its options and time limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Poll {
    /// Unique identifier of the poll.
    pub id: PollId,
    /// Question shown to students.
    pub question: String,
    /// Ordered answer options.
    pub options: Vec<String>,
    /// Options flagged as correct by the teacher.
    pub correct_options: Vec<String>,
    /// Seconds students have to answer.
    pub time_limit_seconds: u32,
    /// When the poll was started.
    pub created_at: SystemTime,
}

impl Poll {
    /// Start a poll from `draft`, stamping it with a fresh identifier.
    pub fn new(draft: PollDraft, created_at: SystemTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            question: draft.question,
            options: draft.options,
            correct_options: draft.correct_options,
            time_limit_seconds: draft.time_limit_seconds,
            created_at,
        }
    }

    /// True when `option` is one of the poll's options.
    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|candidate| candidate == option)
    }

    fn is_correct(&self, option: &str) -> bool {
        self.correct_options.iter().any(|correct| correct == option)
    }
}

/// Number of students who picked one option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionTally {
    /// Option text.
    pub option: String,
    /// Students whose current answer is this option.
    pub count: usize,
    /// Whether the teacher flagged this option as correct.
    pub is_correct: bool,
}

/// A finished poll and its final results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollHistoryEntry {
    /// The poll as it was asked.
    pub poll: Poll,
    /// Final counts per option, in option order.
    pub results: Vec<OptionTally>,
    /// When the poll ended.
    pub ended_at: SystemTime,
}

/// Count the current answers of registered students for each option of `poll`.
pub fn tally(poll: &Poll, registry: &SessionRegistry) -> Vec<OptionTally> {
    poll.options
        .iter()
        .map(|option| OptionTally {
            option: option.clone(),
            count: registry
                .students()
                .filter(|student| student.current_answer.as_deref() == Some(option.as_str()))
                .count(),
            is_correct: poll.is_correct(option),
        })
        .collect()
}
