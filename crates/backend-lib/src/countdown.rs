// ============================
// livepoll-backend-lib/src/countdown.rs
// ============================
//! Countdown handles for the live poll.
//!
//! The poll lifecycle asks a [`CountdownScheduler`] for one tick per
//! [`TICK_PERIOD`] and owns the returned [`Countdown`]. Dropping the handle
//! stops the ticks, so replacing or resetting the poll cancels its timer.
use std::time::Duration;

use tokio::task::AbortHandle;

use crate::poll::PollId;

/// Countdown resolution
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Source of countdown ticks
pub trait CountdownScheduler: Send {
    /// Start ticking for `poll_id` until the returned handle is dropped
    fn start(&self, poll_id: PollId) -> Countdown;
}

/// Owned handle to a running countdown
#[derive(Debug)]
pub struct Countdown {
    poll_id: PollId,
    task: Option<AbortHandle>,
}

impl Countdown {
    /// Handle backed by a spawned ticking task
    pub fn new(poll_id: PollId, task: AbortHandle) -> Self {
        Self {
            poll_id,
            task: Some(task),
        }
    }

    /// Handle with no task behind it; ticks are fed by the caller
    pub fn detached(poll_id: PollId) -> Self {
        Self { poll_id, task: None }
    }

    pub fn poll_id(&self) -> PollId {
        self.poll_id
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Scheduler that never ticks on its own. Used when the caller drives
/// `Session::tick` directly.
#[derive(Debug, Default, Clone, Copy)]
pub struct ManualScheduler;

impl CountdownScheduler for ManualScheduler {
    fn start(&self, poll_id: PollId) -> Countdown {
        Countdown::detached(poll_id)
    }
}
