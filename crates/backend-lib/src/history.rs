// ============================
// livepoll-backend-lib/src/history.rs
// ============================
//! Bounded append-only logs for closed polls and chat.
use std::collections::VecDeque;

use livepoll_common::{ChatMessage, HistoryEntry};

/// Closed polls, in completion order
pub type History = BoundedLog<HistoryEntry>;

/// Chat messages, in posting order
pub type ChatLog = BoundedLog<ChatMessage>;

/// FIFO log that evicts its oldest entry once `capacity` is exceeded
#[derive(Debug, Clone)]
pub struct BoundedLog<T> {
    entries: VecDeque<T>,
    capacity: usize,
}

impl<T: Clone> BoundedLog<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an entry, returning the evicted one if the log was full
    pub fn push(&mut self, entry: T) -> Option<T> {
        self.entries.push_back(entry);
        if self.entries.len() > self.capacity {
            self.entries.pop_front()
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Copy of the log, oldest first
    pub fn snapshot(&self) -> Vec<T> {
        self.entries.iter().cloned().collect()
    }

    /// Copy of the log, newest first
    pub fn newest_first(&self) -> Vec<T> {
        self.entries.iter().rev().cloned().collect()
    }
}
