// ============================
// livepoll-backend-lib/src/poll.rs
// ============================
//! Poll lifecycle: Idle -> Live -> Closed, and back to Live when the
//! presenter opens the next poll.
use chrono::{DateTime, Utc};
use livepoll_common::{ConnectionId, HistoryEntry, OptionResult, PublicPoll};
use tracing::{debug, info};

use crate::countdown::{Countdown, CountdownScheduler};
use crate::history::History;
use crate::ledger::{VoteLedger, VoteOutcome};

/// Identifies one opened poll. Ticks carry it so that ticks of a
/// replaced poll are recognised and dropped.
pub type PollId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStatus {
    Live,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOption {
    pub text: String,
    pub is_correct: bool,
}

/// A validated poll, ready to open
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollDefinition {
    pub question: String,
    pub options: Vec<PollOption>,
    pub time_limit_secs: u32,
}

/// One poll and its votes.
///
/// While `Live`, `remaining_secs > 0` and only voters in the ledger have
/// contributed to the counters.
#[derive(Debug, Clone)]
pub struct Poll {
    id: PollId,
    question: String,
    options: Vec<PollOption>,
    time_limit_secs: u32,
    status: PollStatus,
    remaining_secs: u32,
    ledger: VoteLedger,
}

impl Poll {
    pub fn new(id: PollId, definition: PollDefinition) -> Self {
        let ledger = VoteLedger::new(definition.options.len());
        Self {
            id,
            question: definition.question,
            options: definition.options,
            time_limit_secs: definition.time_limit_secs,
            status: PollStatus::Live,
            remaining_secs: definition.time_limit_secs,
            ledger,
        }
    }

    pub fn id(&self) -> PollId {
        self.id
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn status(&self) -> PollStatus {
        self.status
    }

    pub fn is_live(&self) -> bool {
        self.status == PollStatus::Live
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn ledger(&self) -> &VoteLedger {
        &self.ledger
    }

    pub fn record_vote(&mut self, voter: ConnectionId, option_index: i64) -> VoteOutcome {
        if !self.is_live() {
            return VoteOutcome::NotLive;
        }
        self.ledger.record(voter, option_index)
    }

    /// Advance the countdown by one second, closing the poll when it runs out
    pub fn tick(&mut self) -> PollStatus {
        if self.is_live() {
            self.remaining_secs = self.remaining_secs.saturating_sub(1);
            if self.remaining_secs == 0 {
                self.status = PollStatus::Closed;
            }
        }
        self.status
    }

    /// What respondents may see: texts and timer only
    pub fn public_view(&self) -> PublicPoll {
        PublicPoll {
            question: self.question.clone(),
            option_texts: self.options.iter().map(|o| o.text.clone()).collect(),
            time_limit_seconds: self.time_limit_secs,
            remaining_seconds: self.remaining_secs,
            is_live: self.is_live(),
        }
    }

    pub fn live_tally(&self) -> Vec<u32> {
        self.ledger.counts().to_vec()
    }

    pub fn results(&self) -> Vec<OptionResult> {
        self.options
            .iter()
            .zip(self.ledger.counts())
            .map(|(option, &votes)| OptionResult {
                text: option.text.clone(),
                votes,
                is_correct: option.is_correct,
            })
            .collect()
    }

    pub fn snapshot(&self, timestamp: DateTime<Utc>) -> HistoryEntry {
        HistoryEntry {
            question: self.question.clone(),
            options: self.results(),
            timestamp,
        }
    }
}

/// Result of feeding a countdown tick to the lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The tick belongs to no live poll
    Ignored,
    Running { remaining_secs: u32 },
    /// The poll just closed; the snapshot was appended to history
    Closed(HistoryEntry),
}

/// Owns the current poll, its countdown and the history of closed polls
pub struct PollLifecycle {
    current: Option<Poll>,
    countdown: Option<Countdown>,
    next_id: PollId,
    scheduler: Box<dyn CountdownScheduler>,
    history: History,
}

impl PollLifecycle {
    pub fn new(scheduler: Box<dyn CountdownScheduler>, history_capacity: usize) -> Self {
        Self {
            current: None,
            countdown: None,
            next_id: 1,
            scheduler,
            history: History::new(history_capacity),
        }
    }

    /// The current poll, live or closed
    pub fn current(&self) -> Option<&Poll> {
        self.current.as_ref()
    }

    pub fn live_poll(&self) -> Option<&Poll> {
        self.current.as_ref().filter(|p| p.is_live())
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Open a poll. A live poll is preempted: its countdown is cancelled and
    /// its votes are discarded without reaching history.
    pub fn open(&mut self, definition: PollDefinition) -> &Poll {
        if let Some(previous) = self.live_poll() {
            info!(
                poll_id = previous.id(),
                votes = previous.ledger().voter_count(),
                "preempting live poll"
            );
        }
        self.countdown = None;

        let id = self.next_id;
        self.next_id += 1;
        self.countdown = Some(self.scheduler.start(id));
        self.current.insert(Poll::new(id, definition))
    }

    pub fn record_vote(&mut self, voter: ConnectionId, option_index: i64) -> VoteOutcome {
        match self.current.as_mut() {
            Some(poll) => poll.record_vote(voter, option_index),
            None => VoteOutcome::NotLive,
        }
    }

    /// Apply one countdown tick for `poll_id`
    pub fn tick(&mut self, poll_id: PollId) -> TickOutcome {
        let Some(poll) = self
            .current
            .as_mut()
            .filter(|p| p.id() == poll_id && p.is_live())
        else {
            debug!(poll_id, "dropping stale tick");
            return TickOutcome::Ignored;
        };

        match poll.tick() {
            PollStatus::Live => TickOutcome::Running {
                remaining_secs: poll.remaining_secs(),
            },
            PollStatus::Closed => {
                let entry = poll.snapshot(Utc::now());
                self.countdown = None;
                if self.history.push(entry.clone()).is_some() {
                    debug!(capacity = self.history.capacity(), "history full, evicted oldest poll");
                }
                TickOutcome::Closed(entry)
            },
        }
    }

    /// Cancel the countdown and forget the current poll. History is kept.
    pub fn reset(&mut self) {
        self.countdown = None;
        self.current = None;
    }

    pub fn countdown_poll_id(&self) -> Option<PollId> {
        self.countdown.as_ref().map(Countdown::poll_id)
    }
}
