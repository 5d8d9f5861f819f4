// ============================
// livepoll-backend-lib/src/session.rs
// ============================
//! The poll session.
//!
//! `Session` owns the connection registry, the poll lifecycle and the chat
//! log. Every method is a synchronous state transition that returns the
//! domain events to route; serializing calls is the caller's job (see
//! `session_actor`).
use chrono::Utc;
use livepoll_common::{ChatMessage, ClientMessage, ConnectionId, PollOptionInput};
use metrics::{counter, gauge};
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::config::SessionSettings;
use crate::countdown::CountdownScheduler;
use crate::error::AppError;
use crate::history::ChatLog;
use crate::ledger::VoteOutcome;
use crate::poll::{Poll, PollId, PollLifecycle, TickOutcome};
use crate::registry::Registry;
use crate::router::SessionEvent;
use crate::validation;

/// Point-in-time counters for health reporting
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub presenter_connected: bool,
    pub respondents: usize,
    pub live_poll: bool,
    pub history_len: usize,
    pub chat_len: usize,
    /// Open connections, joined or not
    pub connections: usize,
}

pub struct Session {
    settings: SessionSettings,
    registry: Registry,
    polls: PollLifecycle,
    chat: ChatLog,
}

impl Session {
    pub fn new(settings: SessionSettings, scheduler: Box<dyn CountdownScheduler>) -> Self {
        let polls = PollLifecycle::new(scheduler, settings.history_capacity);
        let chat = ChatLog::new(settings.chat_capacity);
        Self {
            settings,
            registry: Registry::new(),
            polls,
            chat,
        }
    }

    pub fn presenter(&self) -> Option<ConnectionId> {
        self.registry.presenter()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn polls(&self) -> &PollLifecycle {
        &self.polls
    }

    pub fn chat(&self) -> &ChatLog {
        &self.chat
    }

    /// Apply one inbound message. Rejections become a [`SessionEvent::Rejected`]
    /// addressed to `origin`; state is unchanged in that case.
    pub fn handle(&mut self, origin: ConnectionId, message: ClientMessage) -> Vec<SessionEvent> {
        let result = match message {
            ClientMessage::PresenterJoin => self.presenter_join(origin).map(|e| vec![e]),
            ClientMessage::RespondentJoin { display_name } => {
                self.respondent_join(origin, &display_name).map(|e| vec![e])
            },
            ClientMessage::OpenPoll {
                question,
                options,
                time_limit_seconds,
            } => self
                .open_poll(origin, &question, &options, time_limit_seconds)
                .map(|e| vec![e]),
            ClientMessage::SubmitVote { option_index } => {
                Ok(self.submit_vote(origin, option_index).into_iter().collect())
            },
            ClientMessage::RemoveRespondent { respondent_id } => self
                .remove_respondent(origin, respondent_id)
                .map(|e| e.into_iter().collect()),
            ClientMessage::PostChat { sender_name, text } => {
                self.post_chat(&sender_name, &text).map(|e| vec![e])
            },
        };

        match result {
            Ok(events) => events,
            Err(error) => {
                warn!(%origin, code = error.error_code(), %error, "operation rejected");
                counter!(crate::metrics::OPERATION_REJECTED).increment(1);
                vec![SessionEvent::Rejected { origin, error }]
            },
        }
    }

    /// Bind the presenter and hand back history, roster and chat for initial sync
    pub fn presenter_join(&mut self, conn: ConnectionId) -> Result<SessionEvent, AppError> {
        self.registry.register_presenter(conn)?;
        info!(%conn, "presenter joined");

        Ok(SessionEvent::PresenterJoined {
            presenter: conn,
            history: self.polls.history().newest_first(),
            roster: self.registry.roster(),
            chat_log: self.chat.snapshot(),
        })
    }

    pub fn respondent_join(
        &mut self,
        conn: ConnectionId,
        display_name: &str,
    ) -> Result<SessionEvent, AppError> {
        let display_name = validation::validate_display_name(display_name, &self.settings)?;
        let respondent = self.registry.register_respondent(conn, display_name)?;
        info!(%conn, name = %respondent.display_name, "respondent joined");
        counter!(crate::metrics::RESPONDENT_JOINED).increment(1);
        gauge!(crate::metrics::RESPONDENTS_ACTIVE).set(self.registry.respondent_count() as f64);

        Ok(SessionEvent::RespondentJoined {
            respondent: conn,
            current_poll: self.polls.current().map(Poll::public_view),
            chat_log: self.chat.snapshot(),
            roster: self.registry.roster(),
        })
    }

    pub fn open_poll(
        &mut self,
        origin: ConnectionId,
        question: &str,
        options: &[PollOptionInput],
        time_limit_secs: Option<u32>,
    ) -> Result<SessionEvent, AppError> {
        if !self.registry.is_presenter(origin) {
            return Err(AppError::NotPresenter);
        }
        let definition = validation::validate_poll(question, options, time_limit_secs, &self.settings)?;

        let poll = self.polls.open(definition);
        info!(
            poll_id = poll.id(),
            question = poll.question(),
            time_limit_secs = poll.remaining_secs(),
            "poll opened"
        );
        counter!(crate::metrics::POLL_OPENED).increment(1);

        Ok(SessionEvent::PollOpened(poll.public_view()))
    }

    /// Record a vote. Votes that do not count are dropped without feedback.
    pub fn submit_vote(&mut self, origin: ConnectionId, option_index: i64) -> Option<SessionEvent> {
        if !self.registry.is_respondent(origin) {
            debug!(%origin, "vote from a connection that has not joined");
            counter!(crate::metrics::VOTE_IGNORED).increment(1);
            return None;
        }

        match self.polls.record_vote(origin, option_index) {
            VoteOutcome::Accepted => {
                trace!(%origin, option_index, "vote accepted");
                counter!(crate::metrics::VOTE_ACCEPTED).increment(1);
                let tally = self.polls.current().map(Poll::live_tally).unwrap_or_default();
                Some(SessionEvent::VoteRecorded { tally })
            },
            VoteOutcome::OptionOutOfRange => {
                warn!(%origin, option_index, "invalid option index");
                counter!(crate::metrics::VOTE_IGNORED).increment(1);
                None
            },
            outcome => {
                debug!(%origin, ?outcome, "vote ignored");
                counter!(crate::metrics::VOTE_IGNORED).increment(1);
                None
            },
        }
    }

    /// Kick a respondent. Unknown targets are ignored.
    pub fn remove_respondent(
        &mut self,
        origin: ConnectionId,
        target: ConnectionId,
    ) -> Result<Option<SessionEvent>, AppError> {
        if !self.registry.is_presenter(origin) {
            return Err(AppError::NotPresenter);
        }

        let Some(removed) = self.registry.remove_respondent(target) else {
            debug!(%target, "kick of unknown respondent ignored");
            return Ok(None);
        };
        info!(%target, name = %removed.display_name, "respondent kicked");
        gauge!(crate::metrics::RESPONDENTS_ACTIVE).set(self.registry.respondent_count() as f64);

        Ok(Some(SessionEvent::RespondentKicked {
            target,
            roster: self.registry.roster(),
        }))
    }

    pub fn post_chat(&mut self, sender_name: &str, text: &str) -> Result<SessionEvent, AppError> {
        let (sender_name, text) = validation::validate_chat(sender_name, text, &self.settings)?;
        let message = ChatMessage {
            sender_name,
            text,
            timestamp: Utc::now(),
        };
        self.chat.push(message.clone());
        counter!(crate::metrics::CHAT_POSTED).increment(1);

        Ok(SessionEvent::ChatPosted(message))
    }

    /// Apply a countdown tick for `poll_id`
    pub fn tick(&mut self, poll_id: PollId) -> Vec<SessionEvent> {
        match self.polls.tick(poll_id) {
            TickOutcome::Closed(entry) => {
                info!(poll_id, question = %entry.question, "poll closed");
                counter!(crate::metrics::POLL_CLOSED).increment(1);
                vec![
                    SessionEvent::PollClosed {
                        question: entry.question,
                        options: entry.options,
                    },
                    SessionEvent::HistoryUpdated {
                        polls: self.polls.history().newest_first(),
                    },
                ]
            },
            TickOutcome::Running { remaining_secs } => {
                trace!(poll_id, remaining_secs, "tick");
                Vec::new()
            },
            TickOutcome::Ignored => Vec::new(),
        }
    }

    /// A connection went away. The presenter leaving resets the session.
    pub fn disconnect(&mut self, conn: ConnectionId) -> Option<SessionEvent> {
        if self.registry.is_presenter(conn) {
            self.reset();
            info!(%conn, "presenter disconnected, session reset");
            return Some(SessionEvent::PresenterLeft);
        }

        let removed = self.registry.remove_respondent(conn)?;
        info!(%conn, name = %removed.display_name, "respondent left");
        gauge!(crate::metrics::RESPONDENTS_ACTIVE).set(self.registry.respondent_count() as f64);
        Some(SessionEvent::RespondentLeft {
            roster: self.registry.roster(),
        })
    }

    /// Clear presenter, poll, respondents and chat. History survives.
    fn reset(&mut self) {
        self.registry.clear();
        self.polls.reset();
        self.chat.clear();
        counter!(crate::metrics::SESSION_RESET).increment(1);
        gauge!(crate::metrics::RESPONDENTS_ACTIVE).set(0.0);
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            presenter_connected: self.registry.presenter().is_some(),
            respondents: self.registry.respondent_count(),
            live_poll: self.polls.live_poll().is_some(),
            history_len: self.polls.history().len(),
            chat_len: self.chat.len(),
            connections: 0,
        }
    }
}
