//! Live set of connected participants keyed by their connection identity.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

/// Identity of a single WebSocket connection.
pub type ConnectionId = Uuid;

/// Role a connection claims when it joins the classroom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Creates polls and manages the session.
    Teacher,
    /// Answers the active poll.
    Student,
}

/// A connected teacher or student.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    /// Connection the participant joined from.
    pub connection_id: ConnectionId,
    /// Name shown to the class. Always present for students.
    pub display_name: Option<String>,
    /// Role claimed at join time.
    pub role: Role,
    /// Whether an answer was recorded for the active poll.
    pub has_answered: bool,
    /// Option chosen for the active poll, if any.
    pub current_answer: Option<String>,
}

impl Participant {
    fn new(connection_id: ConnectionId, role: Role, display_name: Option<String>) -> Self {
        Self {
            connection_id,
            display_name,
            role,
            has_answered: false,
            current_answer: None,
        }
    }

    /// True when the participant is a student.
    pub fn is_student(&self) -> bool {
        self.role == Role::Student
    }

    fn has_name(&self, name: &str) -> bool {
        self.display_name.as_deref() == Some(name)
    }
}

/// Errors raised by registry lookups and answer bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// No student is registered under the given name.
    #[error("participant `{0}` not found")]
    NotFound(String),
    /// The student already answered the active poll.
    #[error("participant `{0}` has already answered")]
    AlreadyAnswered(String),
    /// A student tried to join without a usable display name.
    #[error("students must join with a display name")]
    MissingName,
}

/// Records displaced by [`SessionRegistry::register`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registration {
    /// What the same connection was registered as before joining again.
    pub previous: Option<Participant>,
    /// Student on another connection that held the same name.
    pub evicted: Option<Participant>,
}

impl Registration {
    /// True when a student record left the registry, either way.
    pub fn displaced_student(&self) -> bool {
        self.previous.iter().chain(&self.evicted).any(Participant::is_student)
    }

    /// True when a displaced record carried an answer for the active poll.
    pub fn lost_answer(&self) -> bool {
        self.previous
            .iter()
            .chain(&self.evicted)
            .any(|participant| participant.has_answered)
    }
}

/// Registry of live participants, ordered by join time.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    participants: IndexMap<ConnectionId, Participant>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `connection_id` with the given role, replacing any previous record.
    ///
    /// A student re-joining under a name that is already registered evicts the
    /// stale entry (last join wins); its connection is not notified. Both
    /// displaced records are handed back so the caller can account for them.
    pub fn register(
        &mut self,
        connection_id: ConnectionId,
        role: Role,
        display_name: Option<String>,
    ) -> Result<Registration, RegistryError> {
        let display_name = display_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());

        if role == Role::Student && display_name.is_none() {
            return Err(RegistryError::MissingName);
        }

        let previous = self.participants.shift_remove(&connection_id);

        let evicted = match (role, display_name.as_deref()) {
            (Role::Student, Some(name)) => self
                .participants
                .iter()
                .find(|(_, existing)| existing.is_student() && existing.has_name(name))
                .map(|(id, _)| *id)
                .and_then(|stale| self.participants.shift_remove(&stale)),
            _ => None,
        };

        self.participants.insert(
            connection_id,
            Participant::new(connection_id, role, display_name),
        );

        Ok(Registration { previous, evicted })
    }

    /// Remove the participant joined from `connection_id`, returning it when present.
    pub fn unregister(&mut self, connection_id: &ConnectionId) -> Option<Participant> {
        self.participants.shift_remove(connection_id)
    }

    /// Record `option` as the answer of the student called `display_name`.
    pub fn mark_answered(&mut self, display_name: &str, option: &str) -> Result<(), RegistryError> {
        let participant = self
            .student_mut(display_name)
            .ok_or_else(|| RegistryError::NotFound(display_name.to_string()))?;

        if participant.has_answered {
            return Err(RegistryError::AlreadyAnswered(display_name.to_string()));
        }

        participant.has_answered = true;
        participant.current_answer = Some(option.to_string());
        Ok(())
    }

    /// Forget every recorded answer.
    pub fn reset_answers(&mut self) {
        for participant in self.participants.values_mut() {
            participant.has_answered = false;
            participant.current_answer = None;
        }
    }

    /// Kick the student called `display_name`.
    ///
    /// The removed record carries the connection that must receive the removal
    /// notice and then be closed.
    pub fn remove(&mut self, display_name: &str) -> Result<Participant, RegistryError> {
        let connection_id = self
            .students()
            .find(|participant| participant.has_name(display_name))
            .map(|participant| participant.connection_id)
            .ok_or_else(|| RegistryError::NotFound(display_name.to_string()))?;

        self.participants
            .shift_remove(&connection_id)
            .ok_or_else(|| RegistryError::NotFound(display_name.to_string()))
    }

    /// True when at least one student is connected and all of them answered.
    pub fn all_answered(&self) -> bool {
        let mut students = self.students().peekable();
        students.peek().is_some() && students.all(|participant| participant.has_answered)
    }

    /// Student names in join order.
    pub fn participant_names(&self) -> Vec<String> {
        self.students()
            .filter_map(|participant| participant.display_name.clone())
            .collect()
    }

    /// Answers recorded for the active poll, keyed by student name.
    pub fn answers(&self) -> IndexMap<String, String> {
        self.students()
            .filter_map(|participant| {
                let name = participant.display_name.clone()?;
                let answer = participant.current_answer.clone()?;
                Some((name, answer))
            })
            .collect()
    }

    /// Look up the participant joined from `connection_id`.
    pub fn get(&self, connection_id: &ConnectionId) -> Option<&Participant> {
        self.participants.get(connection_id)
    }

    /// Connections of every participant holding `role`.
    pub fn connections_for(&self, role: Role) -> Vec<ConnectionId> {
        self.participants
            .values()
            .filter(|participant| participant.role == role)
            .map(|participant| participant.connection_id)
            .collect()
    }

    /// Connections of every registered participant.
    pub fn all_connections(&self) -> Vec<ConnectionId> {
        self.participants.keys().copied().collect()
    }

    /// Iterate over registered students in join order.
    pub fn students(&self) -> impl Iterator<Item = &Participant> {
        self.participants
            .values()
            .filter(|participant| participant.is_student())
    }

    fn student_mut(&mut self, display_name: &str) -> Option<&mut Participant> {
        self.participants
            .values_mut()
            .find(|participant| participant.is_student() && participant.has_name(display_name))
    }
}
