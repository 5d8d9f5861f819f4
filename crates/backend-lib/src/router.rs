// ============================
// livepoll-backend-lib/src/router.rs
// ============================
//! Session broadcast router.
//!
//! [`route`] is the dispatch table from domain events to audiences. It is the
//! only place that decides who sees what, so vote counts and correctness
//! flags cannot leak to respondents while a poll is live. The [`Outbox`]
//! then delivers the resulting messages to the connection sinks.
use std::collections::HashMap;

use livepoll_common::{
    ChatMessage, ConnectionId, HistoryEntry, OptionResult, PublicPoll, RespondentInfo, ServerMessage,
};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::error::AppError;

/// Domain events produced by the session
#[derive(Debug)]
pub enum SessionEvent {
    PresenterJoined {
        presenter: ConnectionId,
        history: Vec<HistoryEntry>,
        roster: Vec<RespondentInfo>,
        chat_log: Vec<ChatMessage>,
    },
    RespondentJoined {
        respondent: ConnectionId,
        current_poll: Option<PublicPoll>,
        chat_log: Vec<ChatMessage>,
        roster: Vec<RespondentInfo>,
    },
    RespondentLeft {
        roster: Vec<RespondentInfo>,
    },
    RespondentKicked {
        target: ConnectionId,
        roster: Vec<RespondentInfo>,
    },
    PollOpened(PublicPoll),
    VoteRecorded {
        tally: Vec<u32>,
    },
    PollClosed {
        question: String,
        options: Vec<OptionResult>,
    },
    HistoryUpdated {
        polls: Vec<HistoryEntry>,
    },
    PresenterLeft,
    ChatPosted(ChatMessage),
    Rejected {
        origin: ConnectionId,
        error: AppError,
    },
    Malformed {
        origin: ConnectionId,
        err_msg: String,
    },
}

/// Who receives a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// Every open connection, joined or not
    Everyone,
    /// The presenter, if one is bound
    Presenter,
    Connection(ConnectionId),
}

/// One step of delivery
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Send {
        audience: Audience,
        message: ServerMessage,
    },
    /// Close the connection from the server side
    Disconnect(ConnectionId),
}

impl Delivery {
    fn send(audience: Audience, message: ServerMessage) -> Self {
        Delivery::Send { audience, message }
    }
}

/// Map a domain event to its deliveries, in order
pub fn route(event: SessionEvent) -> Vec<Delivery> {
    match event {
        SessionEvent::PresenterJoined {
            presenter,
            history,
            roster,
            chat_log,
        } => vec![Delivery::send(
            Audience::Connection(presenter),
            ServerMessage::PresenterJoinedAck {
                history,
                roster,
                chat_log,
            },
        )],
        SessionEvent::RespondentJoined {
            respondent,
            current_poll,
            chat_log,
            roster,
        } => vec![
            Delivery::send(
                Audience::Connection(respondent),
                ServerMessage::RespondentJoinedAck {
                    respondent_id: respondent,
                    current_poll,
                    chat_log,
                },
            ),
            Delivery::send(
                Audience::Presenter,
                ServerMessage::RosterUpdated { respondents: roster },
            ),
        ],
        SessionEvent::RespondentLeft { roster } => vec![Delivery::send(
            Audience::Presenter,
            ServerMessage::RosterUpdated { respondents: roster },
        )],
        SessionEvent::RespondentKicked { target, roster } => vec![
            Delivery::send(Audience::Connection(target), ServerMessage::RespondentKicked),
            Delivery::Disconnect(target),
            Delivery::send(
                Audience::Presenter,
                ServerMessage::RosterUpdated { respondents: roster },
            ),
        ],
        SessionEvent::PollOpened(poll) => vec![Delivery::send(
            Audience::Everyone,
            ServerMessage::PollOpened {
                question: poll.question,
                option_texts: poll.option_texts,
                time_limit_seconds: poll.time_limit_seconds,
            },
        )],
        SessionEvent::VoteRecorded { tally } => vec![Delivery::send(
            Audience::Presenter,
            ServerMessage::PollLiveTally {
                option_vote_counts: tally,
            },
        )],
        SessionEvent::PollClosed { question, options } => vec![Delivery::send(
            Audience::Everyone,
            ServerMessage::PollClosed { question, options },
        )],
        SessionEvent::HistoryUpdated { polls } => vec![Delivery::send(
            Audience::Presenter,
            ServerMessage::HistoryUpdated { polls },
        )],
        SessionEvent::PresenterLeft => {
            vec![Delivery::send(Audience::Everyone, ServerMessage::PresenterLeft)]
        },
        SessionEvent::ChatPosted(message) => {
            vec![Delivery::send(Audience::Everyone, ServerMessage::ChatPosted(message))]
        },
        SessionEvent::Rejected { origin, error } => vec![Delivery::send(
            Audience::Connection(origin),
            error.to_server_message(),
        )],
        SessionEvent::Malformed { origin, err_msg } => vec![Delivery::send(
            Audience::Connection(origin),
            ServerMessage::MalformedMessage { err_msg },
        )],
    }
}

/// What a connection's writer task receives
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Message(ServerMessage),
    Close,
}

/// Sink for one connection
pub type ConnectionSink = mpsc::UnboundedSender<Outbound>;

/// The set of open connections and their sinks
#[derive(Debug, Default)]
pub struct Outbox {
    sinks: HashMap<ConnectionId, ConnectionSink>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&mut self, conn: ConnectionId, sink: ConnectionSink) {
        self.sinks.insert(conn, sink);
    }

    pub fn detach(&mut self, conn: ConnectionId) -> bool {
        self.sinks.remove(&conn).is_some()
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Deliver one step. `presenter` resolves [`Audience::Presenter`].
    pub fn deliver(&mut self, delivery: Delivery, presenter: Option<ConnectionId>) {
        match delivery {
            Delivery::Send { audience, message } => match audience {
                Audience::Everyone => {
                    debug_assert!(
                        !message.is_presenter_only(),
                        "presenter-only {} broadcast to everyone",
                        message.event_name()
                    );
                    trace!(event = message.event_name(), recipients = self.sinks.len(), "broadcast");
                    for sink in self.sinks.values() {
                        // A closed sink means the connection is on its way out
                        let _ = sink.send(Outbound::Message(message.clone()));
                    }
                },
                Audience::Presenter => match presenter {
                    Some(presenter) => self.send_to(presenter, message),
                    None => debug!(event = message.event_name(), "no presenter, dropping"),
                },
                Audience::Connection(conn) => self.send_to(conn, message),
            },
            Delivery::Disconnect(conn) => {
                if let Some(sink) = self.sinks.remove(&conn) {
                    let _ = sink.send(Outbound::Close);
                }
            },
        }
    }

    fn send_to(&self, conn: ConnectionId, message: ServerMessage) {
        match self.sinks.get(&conn) {
            Some(sink) => {
                trace!(%conn, event = message.event_name(), "unicast");
                let _ = sink.send(Outbound::Message(message));
            },
            None => debug!(%conn, event = message.event_name(), "connection gone, dropping"),
        }
    }
}
