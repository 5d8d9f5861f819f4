// ============================
// livepoll-backend-lib/src/ledger.rs
// ============================
//! Per-poll vote ledger.
use std::collections::HashSet;

use livepoll_common::ConnectionId;

/// What happened to a vote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    Accepted,
    /// There is no live poll
    NotLive,
    /// The respondent already voted on this poll
    AlreadyVoted,
    OptionOutOfRange,
}

/// Counters per option plus the set of respondents that voted.
///
/// The sum of the counters always equals the number of voters.
#[derive(Debug, Clone)]
pub struct VoteLedger {
    counts: Vec<u32>,
    voters: HashSet<ConnectionId>,
}

impl VoteLedger {
    pub fn new(option_count: usize) -> Self {
        Self {
            counts: vec![0; option_count],
            voters: HashSet::new(),
        }
    }

    /// Count the first vote of `voter`. Later votes and bad indices are ignored.
    pub fn record(&mut self, voter: ConnectionId, option_index: i64) -> VoteOutcome {
        if self.voters.contains(&voter) {
            return VoteOutcome::AlreadyVoted;
        }
        let Some(count) = usize::try_from(option_index)
            .ok()
            .and_then(|index| self.counts.get_mut(index))
        else {
            return VoteOutcome::OptionOutOfRange;
        };

        *count += 1;
        self.voters.insert(voter);
        VoteOutcome::Accepted
    }

    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    pub fn has_voted(&self, voter: ConnectionId) -> bool {
        self.voters.contains(&voter)
    }

    pub fn voter_count(&self) -> usize {
        self.voters.len()
    }
}
