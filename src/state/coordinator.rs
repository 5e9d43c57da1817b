//! Single-poll lifecycle: `Idle -> Active -> Idle`.
//!
//! The coordinator never performs I/O. Every operation returns the [`Effect`]s
//! the caller must carry out (deliveries, timer changes, forced disconnects) in
//! order, while holding the same lock the operation ran under.

use std::{mem, sync::Arc};

use thiserror::Error;
use tracing::debug;

use crate::{
    dto::{
        poll::{HistoryEntrySnapshot, OptionResult, PollSnapshot},
        ws::ServerMessage,
    },
    state::{
        clock::Clock,
        poll::{Poll, PollDraft, PollHistoryEntry, PollId, tally},
        registry::{ConnectionId, Role, RegistryError, SessionRegistry},
    },
};

/// A poll that is currently accepting answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivePoll {
    /// The running poll.
    pub poll: Poll,
    /// Seconds left on the countdown.
    pub remaining_seconds: u32,
    /// Set once every student answered and completion has been scheduled.
    pub completion_scheduled: bool,
}

/// Phase of the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollPhase {
    /// No poll is running.
    Idle,
    /// A poll is running.
    Active(ActivePoll),
}

/// Work the caller must perform after an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Deliver `message` to each connection in `recipients`.
    Send {
        /// Connections resolved when the effect was produced.
        recipients: Vec<ConnectionId>,
        /// Payload to deliver.
        message: ServerMessage,
    },
    /// Start the once-per-tick countdown for `poll_id`, replacing any timer.
    StartCountdown {
        /// Poll the countdown belongs to.
        poll_id: PollId,
    },
    /// Complete `poll_id` after the debounce delay, replacing any timer.
    ScheduleCompletion {
        /// Poll to complete.
        poll_id: PollId,
    },
    /// Cancel whichever timer is outstanding.
    CancelTimer,
    /// Close the connection after everything queued for it was sent.
    Disconnect(ConnectionId),
}

/// Errors returned by coordinator operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollError {
    /// A poll is running and not every student answered yet.
    #[error("a poll is already in progress")]
    PollInProgress,
    /// The operation needs a running poll.
    #[error("no poll is active")]
    NoActivePoll,
    /// The option is not part of the active poll.
    #[error("`{0}` is not an option of the active poll")]
    InvalidOption(String),
    /// Registry lookup or bookkeeping failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Owns the session registry, the active poll and the poll history.
pub struct PollCoordinator {
    registry: SessionRegistry,
    phase: PollPhase,
    history: Vec<PollHistoryEntry>,
    clock: Arc<dyn Clock>,
}

impl PollCoordinator {
    /// Create an idle coordinator with an empty registry.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            registry: SessionRegistry::new(),
            phase: PollPhase::Idle,
            history: Vec::new(),
            clock,
        }
    }

    /// Live participants.
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Current phase.
    pub fn phase(&self) -> &PollPhase {
        &self.phase
    }

    /// The running poll, if any.
    pub fn active_poll(&self) -> Option<&ActivePoll> {
        match &self.phase {
            PollPhase::Active(active) => Some(active),
            PollPhase::Idle => None,
        }
    }

    /// Finished polls, oldest first.
    pub fn history(&self) -> &[PollHistoryEntry] {
        &self.history
    }

    /// Register a connection and produce the deliveries a join triggers.
    ///
    /// Teachers receive a state snapshot. Students trigger a participant list
    /// broadcast and, when a poll is running, receive it right away. A student
    /// record displaced by the join counts as a departure.
    pub fn join(
        &mut self,
        connection_id: ConnectionId,
        role: Role,
        display_name: Option<String>,
    ) -> Result<Vec<Effect>, PollError> {
        let registration = self.registry.register(connection_id, role, display_name)?;
        for stale in registration.previous.iter().chain(&registration.evicted) {
            debug!(
                stale_connection = %stale.connection_id,
                %connection_id,
                role = ?stale.role,
                "replaced stale participant entry"
            );
        }

        if role == Role::Teacher {
            let mut effects = Vec::new();
            if registration.displaced_student() {
                effects.push(participants_changed(&self.registry));
                effects.extend(self.after_departure());
            }
            effects.push(send(vec![connection_id], self.state_snapshot()));
            return Ok(effects);
        }

        // The joining student has not answered, so the poll cannot be complete.
        let mut effects = vec![participants_changed(&self.registry)];
        if let PollPhase::Active(active) = &self.phase {
            effects.push(send(
                vec![connection_id],
                ServerMessage::NewQuestion {
                    poll: PollSnapshot::from_poll(&active.poll, Some(active.remaining_seconds)),
                },
            ));
            if registration.lost_answer() {
                effects.push(poll_results(&active.poll, &self.registry));
            }
        }
        Ok(effects)
    }

    /// Handle a transport-level disconnect.
    ///
    /// Departing students are treated like a kick for completion purposes, but
    /// nobody is sent a removal notice.
    pub fn leave(&mut self, connection_id: &ConnectionId) -> Vec<Effect> {
        match self.registry.unregister(connection_id) {
            Some(participant) if participant.is_student() => {
                let mut effects = vec![participants_changed(&self.registry)];
                effects.extend(self.after_departure());
                effects
            }
            _ => Vec::new(),
        }
    }

    /// Start a new poll.
    ///
    /// Allowed while idle, or while a poll is running whose students all
    /// answered; that poll is completed first.
    pub fn create_poll(&mut self, draft: PollDraft) -> Result<Vec<Effect>, PollError> {
        if matches!(self.phase, PollPhase::Active(_)) && !self.registry.all_answered() {
            return Err(PollError::PollInProgress);
        }

        let mut effects = self.complete_poll();

        let poll = Poll::new(draft, self.clock.now());
        let poll_id = poll.id;
        let snapshot = PollSnapshot::from_poll(&poll, Some(poll.time_limit_seconds));
        self.registry.reset_answers();
        self.phase = PollPhase::Active(ActivePoll {
            remaining_seconds: poll.time_limit_seconds,
            poll,
            completion_scheduled: false,
        });

        effects.push(Effect::StartCountdown { poll_id });
        effects.push(send(
            self.registry.connections_for(Role::Student),
            ServerMessage::NewQuestion { poll: snapshot },
        ));
        effects.push(send(
            self.registry.connections_for(Role::Teacher),
            self.state_snapshot(),
        ));
        Ok(effects)
    }

    /// Record `option` as the answer of the student called `display_name`.
    ///
    /// Once every student answered, completion is scheduled rather than run
    /// inline so the final partial results reach clients first.
    pub fn submit_answer(
        &mut self,
        display_name: &str,
        option: &str,
    ) -> Result<Vec<Effect>, PollError> {
        let PollPhase::Active(active) = &mut self.phase else {
            return Err(PollError::NoActivePoll);
        };
        if !active.poll.has_option(option) {
            return Err(PollError::InvalidOption(option.to_string()));
        }

        self.registry.mark_answered(display_name, option)?;

        let mut effects = vec![
            send(
                self.registry.connections_for(Role::Teacher),
                ServerMessage::AnswerAcknowledged {
                    name: display_name.to_string(),
                },
            ),
            poll_results(&active.poll, &self.registry),
        ];

        if self.registry.all_answered() && !active.completion_scheduled {
            active.completion_scheduled = true;
            effects.push(Effect::ScheduleCompletion {
                poll_id: active.poll.id,
            });
        }
        Ok(effects)
    }

    /// Advance the countdown of `poll_id` by one tick.
    ///
    /// Ticks for a poll that is no longer running are ignored.
    pub fn tick(&mut self, poll_id: PollId) -> Vec<Effect> {
        let PollPhase::Active(active) = &mut self.phase else {
            return Vec::new();
        };
        if active.poll.id != poll_id {
            return Vec::new();
        }

        active.remaining_seconds = active.remaining_seconds.saturating_sub(1);
        let seconds = active.remaining_seconds;

        let mut effects = vec![send(
            self.registry.all_connections(),
            ServerMessage::TimeRemaining { seconds },
        )];
        if seconds == 0 {
            effects.extend(self.complete_poll());
        }
        effects
    }

    /// Complete `poll_id` if it is still the running poll.
    pub fn complete_scheduled(&mut self, poll_id: PollId) -> Vec<Effect> {
        if self.active_poll_id() != Some(poll_id) {
            return Vec::new();
        }
        self.complete_poll()
    }

    /// End the running poll: tally, archive, broadcast and return to idle.
    ///
    /// Does nothing while idle, so racing completions collapse into one.
    pub fn complete_poll(&mut self) -> Vec<Effect> {
        let PollPhase::Active(active) = mem::replace(&mut self.phase, PollPhase::Idle) else {
            return Vec::new();
        };

        let results = tally(&active.poll, &self.registry);
        let dto_results: Vec<OptionResult> = results.iter().cloned().map(Into::into).collect();
        debug!(poll_id = %active.poll.id, ?results, "poll completed");

        self.history.push(PollHistoryEntry {
            poll: active.poll,
            results,
            ended_at: self.clock.now(),
        });
        self.registry.reset_answers();

        let everyone = self.registry.all_connections();
        vec![
            Effect::CancelTimer,
            send(
                everyone.clone(),
                ServerMessage::PollResults {
                    results: dto_results.clone(),
                },
            ),
            send(
                everyone,
                ServerMessage::PollCompleted {
                    results: dto_results,
                },
            ),
        ]
    }

    /// Teacher-initiated immediate timeout.
    pub fn end_poll_early(&mut self) -> Result<Vec<Effect>, PollError> {
        if matches!(self.phase, PollPhase::Idle) {
            return Err(PollError::NoActivePoll);
        }
        Ok(self.complete_poll())
    }

    /// Kick the student called `display_name`.
    ///
    /// The student is sent a removal notice and disconnected; if they were the
    /// last one the poll was waiting for, the poll completes immediately.
    pub fn remove_participant(&mut self, display_name: &str) -> Result<Vec<Effect>, PollError> {
        let removed = self.registry.remove(display_name)?;

        let mut effects = vec![
            send(
                vec![removed.connection_id],
                ServerMessage::RemovedFromSession {},
            ),
            Effect::Disconnect(removed.connection_id),
            participants_changed(&self.registry),
        ];
        effects.extend(self.after_departure());
        Ok(effects)
    }

    /// Snapshot sent to teachers.
    pub fn state_snapshot(&self) -> ServerMessage {
        ServerMessage::StateSnapshot {
            active_poll: self.current_poll(),
            participants: self.registry.participant_names(),
            history: self.history_snapshots(),
        }
    }

    /// The running poll as shown to clients.
    pub fn current_poll(&self) -> Option<PollSnapshot> {
        self.active_poll()
            .map(|active| PollSnapshot::from_poll(&active.poll, Some(active.remaining_seconds)))
    }

    /// Finished polls as shown to clients.
    pub fn history_snapshots(&self) -> Vec<HistoryEntrySnapshot> {
        self.history.iter().map(Into::into).collect()
    }

    /// Identifier of the running poll.
    pub fn active_poll_id(&self) -> Option<PollId> {
        self.active_poll().map(|active| active.poll.id)
    }

    /// Results refresh and completion check after a student left.
    fn after_departure(&mut self) -> Vec<Effect> {
        let PollPhase::Active(active) = &self.phase else {
            return Vec::new();
        };

        let mut effects = vec![poll_results(&active.poll, &self.registry)];
        if self.registry.all_answered() {
            effects.extend(self.complete_poll());
        }
        effects
    }
}

fn send(recipients: Vec<ConnectionId>, message: ServerMessage) -> Effect {
    Effect::Send {
        recipients,
        message,
    }
}

fn participants_changed(registry: &SessionRegistry) -> Effect {
    send(
        registry.all_connections(),
        ServerMessage::ParticipantsChanged {
            names: registry.participant_names(),
        },
    )
}

fn poll_results(poll: &Poll, registry: &SessionRegistry) -> Effect {
    send(
        registry.all_connections(),
        ServerMessage::PollResults {
            results: tally(poll, registry).into_iter().map(Into::into).collect(),
        },
    )
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::state::clock::fixed::FixedClock;

    fn coordinator() -> PollCoordinator {
        PollCoordinator::new(Arc::new(FixedClock::at_secs(1_700_000_000)))
    }

    fn draft(options: &[&str], seconds: u32) -> PollDraft {
        PollDraft {
            question: "Pick one".into(),
            options: options.iter().map(|option| option.to_string()).collect(),
            correct_options: Vec::new(),
            time_limit_seconds: seconds,
        }
    }

    fn student(coordinator: &mut PollCoordinator, name: &str) -> ConnectionId {
        let id = Uuid::new_v4();
        coordinator
            .join(id, Role::Student, Some(name.into()))
            .unwrap();
        id
    }

    fn teacher(coordinator: &mut PollCoordinator) -> ConnectionId {
        let id = Uuid::new_v4();
        coordinator.join(id, Role::Teacher, None).unwrap();
        id
    }

    fn counts(message: &ServerMessage) -> Vec<(String, usize)> {
        match message {
            ServerMessage::PollResults { results } | ServerMessage::PollCompleted { results } => {
                results
                    .iter()
                    .map(|result| (result.option.clone(), result.count))
                    .collect()
            }
            other => panic!("expected results, got {other:?}"),
        }
    }

    fn messages(effects: &[Effect]) -> Vec<&ServerMessage> {
        effects
            .iter()
            .filter_map(|effect| match effect {
                Effect::Send { message, .. } => Some(message),
                _ => None,
            })
            .collect()
    }

    fn find<'a>(effects: &'a [Effect], pred: fn(&ServerMessage) -> bool) -> &'a ServerMessage {
        messages(effects)
            .into_iter()
            .find(|message| pred(message))
            .expect("message not produced")
    }

    fn pair(option: &str, count: usize) -> (String, usize) {
        (option.to_string(), count)
    }

    #[test]
    fn starts_idle() {
        let coordinator = coordinator();
        assert_eq!(coordinator.phase(), &PollPhase::Idle);
        assert!(coordinator.history().is_empty());
    }

    #[test]
    fn teacher_join_receives_snapshot() {
        let mut coordinator = coordinator();
        student(&mut coordinator, "ada");
        let id = Uuid::new_v4();

        let effects = coordinator.join(id, Role::Teacher, None).unwrap();

        match effects.as_slice() {
            [
                Effect::Send {
                    recipients,
                    message: ServerMessage::StateSnapshot { active_poll, participants, history },
                },
            ] => {
                assert_eq!(recipients, &vec![id]);
                assert!(active_poll.is_none());
                assert_eq!(participants, &vec!["ada".to_string()]);
                assert!(history.is_empty());
            }
            other => panic!("unexpected effects: {other:?}"),
        }
    }

    #[test]
    fn create_poll_starts_countdown_and_delivers_question() {
        let mut coordinator = coordinator();
        let teacher_id = teacher(&mut coordinator);
        let ada = student(&mut coordinator, "ada");

        let effects = coordinator.create_poll(draft(&["A", "B"], 10)).unwrap();

        let poll_id = coordinator.active_poll_id().unwrap();
        assert!(effects.contains(&Effect::StartCountdown { poll_id }));
        assert!(effects.iter().any(|effect| matches!(
            effect,
            Effect::Send { recipients, message: ServerMessage::NewQuestion { .. } } if recipients == &vec![ada]
        )));
        assert!(effects.iter().any(|effect| matches!(
            effect,
            Effect::Send { recipients, message: ServerMessage::StateSnapshot { active_poll: Some(_), .. } } if recipients == &vec![teacher_id]
        )));
    }

    #[test]
    fn create_poll_while_unanswered_is_rejected() {
        let mut coordinator = coordinator();
        student(&mut coordinator, "ada");
        coordinator.create_poll(draft(&["A", "B"], 10)).unwrap();

        assert_eq!(
            coordinator.create_poll(draft(&["C", "D"], 10)),
            Err(PollError::PollInProgress)
        );
    }

    #[test]
    fn create_poll_with_no_students_while_active_is_rejected() {
        let mut coordinator = coordinator();
        coordinator.create_poll(draft(&["A", "B"], 10)).unwrap();

        assert_eq!(
            coordinator.create_poll(draft(&["C", "D"], 10)),
            Err(PollError::PollInProgress)
        );
    }

    #[test]
    fn create_poll_after_everyone_answered_completes_stale_poll() {
        let mut coordinator = coordinator();
        student(&mut coordinator, "ada");
        coordinator.create_poll(draft(&["A", "B"], 10)).unwrap();
        coordinator.submit_answer("ada", "A").unwrap();
        let first = coordinator.active_poll_id().unwrap();

        let effects = coordinator.create_poll(draft(&["C", "D"], 10)).unwrap();

        assert_eq!(coordinator.history().len(), 1);
        assert_eq!(coordinator.history()[0].poll.id, first);
        assert_eq!(effects.first(), Some(&Effect::CancelTimer));
        assert_ne!(coordinator.active_poll_id(), Some(first));
        assert!(coordinator.registry().answers().is_empty());
        assert!(!coordinator.registry().all_answered());
    }

    #[test]
    fn answers_are_tallied_and_completion_is_scheduled_once() {
        let mut coordinator = coordinator();
        teacher(&mut coordinator);
        for name in ["ada", "bob", "cy"] {
            student(&mut coordinator, name);
        }
        coordinator.create_poll(draft(&["A", "B"], 10)).unwrap();
        let poll_id = coordinator.active_poll_id().unwrap();

        coordinator.submit_answer("ada", "A").unwrap();
        coordinator.submit_answer("bob", "A").unwrap();
        let effects = coordinator.submit_answer("cy", "B").unwrap();

        let results = find(&effects, |m| matches!(m, ServerMessage::PollResults { .. }));
        assert_eq!(counts(results), vec![pair("A", 2), pair("B", 1)]);
        assert!(effects.contains(&Effect::ScheduleCompletion { poll_id }));
        // Completion is deferred, the poll is still running.
        assert_eq!(coordinator.active_poll_id(), Some(poll_id));

        let effects = coordinator.complete_scheduled(poll_id);
        let completed = find(&effects, |m| matches!(m, ServerMessage::PollCompleted { .. }));
        assert_eq!(counts(completed), vec![pair("A", 2), pair("B", 1)]);

        let entry = &coordinator.history()[0];
        let recorded: Vec<_> = entry
            .results
            .iter()
            .map(|result| (result.option.clone(), result.count))
            .collect();
        assert_eq!(recorded, vec![pair("A", 2), pair("B", 1)]);
    }

    #[test]
    fn completion_resets_everything_and_appends_one_entry() {
        let mut coordinator = coordinator();
        for name in ["ada", "bob", "cy"] {
            student(&mut coordinator, name);
        }
        coordinator.create_poll(draft(&["A", "B", "C"], 10)).unwrap();
        coordinator.submit_answer("ada", "C").unwrap();
        coordinator.submit_answer("bob", "A").unwrap();

        coordinator.end_poll_early().unwrap();

        assert_eq!(coordinator.phase(), &PollPhase::Idle);
        assert!(coordinator.registry().answers().is_empty());
        assert!(coordinator.registry().students().all(|p| !p.has_answered));
        assert_eq!(coordinator.history().len(), 1);
        let total: usize = coordinator.history()[0]
            .results
            .iter()
            .map(|result| result.count)
            .sum();
        assert_eq!(total, 2);
    }

    #[test]
    fn complete_poll_is_a_no_op_when_idle() {
        let mut coordinator = coordinator();
        assert!(coordinator.complete_poll().is_empty());

        student(&mut coordinator, "ada");
        coordinator.create_poll(draft(&["A", "B"], 10)).unwrap();
        let poll_id = coordinator.active_poll_id().unwrap();
        coordinator.end_poll_early().unwrap();

        assert!(coordinator.complete_scheduled(poll_id).is_empty());
        assert!(coordinator.tick(poll_id).is_empty());
        assert_eq!(coordinator.history().len(), 1);
    }

    #[test]
    fn end_poll_early_requires_active_poll() {
        let mut coordinator = coordinator();
        assert_eq!(coordinator.end_poll_early(), Err(PollError::NoActivePoll));
    }

    #[test]
    fn submit_answer_validates_state_and_option() {
        let mut coordinator = coordinator();
        student(&mut coordinator, "ada");

        assert_eq!(
            coordinator.submit_answer("ada", "A"),
            Err(PollError::NoActivePoll)
        );

        coordinator.create_poll(draft(&["A", "B"], 10)).unwrap();
        assert_eq!(
            coordinator.submit_answer("ada", "Z"),
            Err(PollError::InvalidOption("Z".into()))
        );
        assert!(coordinator.registry().answers().is_empty());

        assert_eq!(
            coordinator.submit_answer("zed", "A"),
            Err(PollError::Registry(RegistryError::NotFound("zed".into())))
        );
    }

    #[test]
    fn second_answer_is_rejected_and_count_unchanged() {
        let mut coordinator = coordinator();
        student(&mut coordinator, "ada");
        student(&mut coordinator, "bob");
        coordinator.create_poll(draft(&["A", "B"], 10)).unwrap();

        coordinator.submit_answer("ada", "A").unwrap();
        assert_eq!(
            coordinator.submit_answer("ada", "B"),
            Err(PollError::Registry(RegistryError::AlreadyAnswered(
                "ada".into()
            )))
        );

        let effects = coordinator.end_poll_early().unwrap();
        let completed = find(&effects, |m| matches!(m, ServerMessage::PollCompleted { .. }));
        assert_eq!(counts(completed), vec![pair("A", 1), pair("B", 0)]);
    }

    #[test]
    fn countdown_reaching_zero_completes() {
        let mut coordinator = coordinator();
        student(&mut coordinator, "ada");
        coordinator.create_poll(draft(&["A", "B"], 2)).unwrap();
        let poll_id = coordinator.active_poll_id().unwrap();

        let effects = coordinator.tick(poll_id);
        assert_eq!(
            messages(&effects),
            vec![&ServerMessage::TimeRemaining { seconds: 1 }]
        );

        let effects = coordinator.tick(poll_id);
        assert!(effects.contains(&Effect::CancelTimer));
        let completed = find(&effects, |m| matches!(m, ServerMessage::PollCompleted { .. }));
        assert_eq!(counts(completed), vec![pair("A", 0), pair("B", 0)]);
        assert_eq!(coordinator.phase(), &PollPhase::Idle);
    }

    #[test]
    fn stale_tick_is_ignored() {
        let mut coordinator = coordinator();
        coordinator.create_poll(draft(&["A", "B"], 5)).unwrap();

        assert!(coordinator.tick(Uuid::new_v4()).is_empty());
        assert_eq!(coordinator.active_poll().unwrap().remaining_seconds, 5);
    }

    #[test]
    fn late_joiner_receives_running_poll() {
        let mut coordinator = coordinator();
        coordinator.create_poll(draft(&["A", "B"], 10)).unwrap();
        let poll_id = coordinator.active_poll_id().unwrap();
        coordinator.tick(poll_id);

        let id = Uuid::new_v4();
        let effects = coordinator
            .join(id, Role::Student, Some("late".into()))
            .unwrap();

        let question = effects.iter().find_map(|effect| match effect {
            Effect::Send {
                recipients,
                message: ServerMessage::NewQuestion { poll },
            } if recipients == &vec![id] => Some(poll),
            _ => None,
        });
        assert_eq!(question.unwrap().remaining_seconds, Some(9));
    }

    #[test]
    fn kicking_last_unanswered_student_completes_immediately() {
        let mut coordinator = coordinator();
        student(&mut coordinator, "ada");
        student(&mut coordinator, "bob");
        let cy = student(&mut coordinator, "cy");
        coordinator.create_poll(draft(&["A", "B"], 10)).unwrap();
        coordinator.submit_answer("ada", "A").unwrap();
        coordinator.submit_answer("bob", "B").unwrap();

        let effects = coordinator.remove_participant("cy").unwrap();

        assert_eq!(
            effects[0],
            Effect::Send {
                recipients: vec![cy],
                message: ServerMessage::RemovedFromSession {},
            }
        );
        assert_eq!(effects[1], Effect::Disconnect(cy));
        let completed = find(&effects, |m| matches!(m, ServerMessage::PollCompleted { .. }));
        assert_eq!(counts(completed), vec![pair("A", 1), pair("B", 1)]);
        assert_eq!(coordinator.phase(), &PollPhase::Idle);
        assert_eq!(
            coordinator.registry().participant_names(),
            vec!["ada".to_string(), "bob".to_string()]
        );
    }

    #[test]
    fn kicking_unknown_student_fails() {
        let mut coordinator = coordinator();
        assert_eq!(
            coordinator.remove_participant("ghost"),
            Err(PollError::Registry(RegistryError::NotFound("ghost".into())))
        );
    }

    #[test]
    fn disconnect_of_last_unanswered_student_completes_without_notice() {
        let mut coordinator = coordinator();
        student(&mut coordinator, "ada");
        let bob = student(&mut coordinator, "bob");
        coordinator.create_poll(draft(&["A", "B"], 10)).unwrap();
        coordinator.submit_answer("ada", "B").unwrap();

        let effects = coordinator.leave(&bob);

        assert!(!effects.iter().any(|effect| matches!(effect, Effect::Disconnect(_))));
        assert!(
            !messages(&effects)
                .iter()
                .any(|message| matches!(message, ServerMessage::RemovedFromSession {}))
        );
        let completed = find(&effects, |m| matches!(m, ServerMessage::PollCompleted { .. }));
        assert_eq!(counts(completed), vec![pair("A", 0), pair("B", 1)]);
    }

    #[test]
    fn last_student_leaving_does_not_complete_empty_poll() {
        let mut coordinator = coordinator();
        let ada = student(&mut coordinator, "ada");
        coordinator.create_poll(draft(&["A", "B"], 10)).unwrap();

        coordinator.leave(&ada);

        assert!(coordinator.active_poll().is_some());
    }

    #[test]
    fn teacher_leaving_produces_nothing() {
        let mut coordinator = coordinator();
        let id = teacher(&mut coordinator);
        assert!(coordinator.leave(&id).is_empty());
        assert!(coordinator.leave(&id).is_empty());
    }

    #[test]
    fn rejoining_answered_student_loses_the_answer() {
        let mut coordinator = coordinator();
        student(&mut coordinator, "ada");
        student(&mut coordinator, "bob");
        coordinator.create_poll(draft(&["A", "B"], 10)).unwrap();
        coordinator.submit_answer("ada", "A").unwrap();

        let effects = coordinator
            .join(Uuid::new_v4(), Role::Student, Some("ada".into()))
            .unwrap();

        let results = find(&effects, |m| matches!(m, ServerMessage::PollResults { .. }));
        assert_eq!(counts(results), vec![pair("A", 0), pair("B", 0)]);
        assert_eq!(coordinator.registry().participant_names(), vec!["bob", "ada"]);
        assert!(coordinator.registry().answers().is_empty());
        assert!(coordinator.active_poll().is_some());
    }

    #[test]
    fn rejoining_student_without_answer_keeps_results_quiet() {
        let mut coordinator = coordinator();
        student(&mut coordinator, "ada");
        coordinator.create_poll(draft(&["A", "B"], 10)).unwrap();

        let effects = coordinator
            .join(Uuid::new_v4(), Role::Student, Some("ada".into()))
            .unwrap();

        assert!(
            !messages(&effects)
                .iter()
                .any(|message| matches!(message, ServerMessage::PollResults { .. }))
        );
    }

    #[test]
    fn student_connection_joining_as_teacher_counts_as_departure() {
        let mut coordinator = coordinator();
        student(&mut coordinator, "ada");
        let bob = student(&mut coordinator, "bob");
        coordinator.create_poll(draft(&["A", "B"], 10)).unwrap();
        coordinator.submit_answer("ada", "A").unwrap();

        let effects = coordinator.join(bob, Role::Teacher, None).unwrap();

        match find(&effects, |m| matches!(m, ServerMessage::ParticipantsChanged { .. })) {
            ServerMessage::ParticipantsChanged { names } => assert_eq!(names, &vec!["ada".to_string()]),
            other => panic!("unexpected message: {other:?}"),
        }
        let completed = find(&effects, |m| matches!(m, ServerMessage::PollCompleted { .. }));
        assert_eq!(counts(completed), vec![pair("A", 1), pair("B", 0)]);
        assert!(coordinator.active_poll().is_none());
        assert_eq!(coordinator.history().len(), 1);

        // The snapshot comes last so the new teacher sees the finished poll.
        match effects.last() {
            Some(Effect::Send {
                recipients,
                message: ServerMessage::StateSnapshot { active_poll, history, .. },
            }) => {
                assert_eq!(recipients, &vec![bob]);
                assert!(active_poll.is_none());
                assert_eq!(history.len(), 1);
            }
            other => panic!("unexpected last effect: {other:?}"),
        }
    }

    #[test]
    fn renaming_on_same_connection_updates_participants() {
        let mut coordinator = coordinator();
        let carl = student(&mut coordinator, "carl");

        let effects = coordinator
            .join(carl, Role::Student, Some("carla".into()))
            .unwrap();

        match find(&effects, |m| matches!(m, ServerMessage::ParticipantsChanged { .. })) {
            ServerMessage::ParticipantsChanged { names } => {
                assert_eq!(names, &vec!["carla".to_string()])
            }
            other => panic!("unexpected message: {other:?}"),
        }
        assert_eq!(coordinator.registry().students().count(), 1);
    }

    #[test]
    fn teacher_joining_again_produces_only_a_snapshot() {
        let mut coordinator = coordinator();
        student(&mut coordinator, "ada");
        let id = teacher(&mut coordinator);
        coordinator.create_poll(draft(&["A", "B"], 10)).unwrap();

        let effects = coordinator.join(id, Role::Teacher, None).unwrap();

        assert_eq!(effects.len(), 1);
        assert!(matches!(
            &effects[0],
            Effect::Send { message: ServerMessage::StateSnapshot { .. }, .. }
        ));
        assert!(coordinator.active_poll().is_some());
    }
}
