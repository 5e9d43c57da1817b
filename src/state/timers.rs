use tokio::task::JoinHandle;
use tracing::debug;

use crate::state::poll::PollId;

/// What an outstanding timer will do when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Periodic countdown ticks.
    Countdown,
    /// One-shot completion after every student answered.
    Completion,
}

struct ScheduledTask {
    poll_id: PollId,
    kind: TimerKind,
    handle: JoinHandle<()>,
}

/// Single slot holding the only timer task allowed to exist.
///
/// Installing a task aborts the previous one, so at most one timer is ever
/// outstanding.
#[derive(Default)]
pub struct PollTimer {
    current: Option<ScheduledTask>,
}

impl PollTimer {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `handle` as the timer for `poll_id`, aborting the previous one.
    pub fn replace(&mut self, poll_id: PollId, kind: TimerKind, handle: JoinHandle<()>) {
        self.cancel();
        self.current = Some(ScheduledTask {
            poll_id,
            kind,
            handle,
        });
    }

    /// Abort the outstanding timer, returning what it was.
    pub fn cancel(&mut self) -> Option<TimerKind> {
        let task = self.current.take()?;
        task.handle.abort();
        debug!(poll_id = %task.poll_id, kind = ?task.kind, "timer cancelled");
        Some(task.kind)
    }

    /// The timer still scheduled to fire, if any.
    pub fn outstanding(&self) -> Option<(PollId, TimerKind)> {
        self.current
            .as_ref()
            .filter(|task| !task.handle.is_finished())
            .map(|task| (task.poll_id, task.kind))
    }
}
