// ================
// common/src/lib.rs
// ================
//! Common types and structures
//! used for communication between live-poll clients and the server.
//! This module defines the WebSocket protocol messages and supporting types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier assigned by the server to every open connection.
/// Respondents are addressed by the id of the connection they joined on.
pub type ConnectionId = Uuid;

/// Messages sent from client to server
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "msgType")]
pub enum ClientMessage {
    /// Claim the presenter role for this connection
    #[serde(rename = "presenter.join")]
    PresenterJoin,
    /// Join as a respondent
    /// # Fields
    /// * `display_name` - Name shown to the presenter (trimmed, non-empty)
    #[serde(rename = "respondent.join", rename_all = "camelCase")]
    RespondentJoin { display_name: String },
    /// Open a new poll, preempting any live one
    /// # Fields
    /// * `question` - Question text
    /// * `options` - At least two options, exactly one flagged correct
    /// * `time_limit_seconds` - Countdown length, server default when absent
    #[serde(rename = "presenter.openPoll", rename_all = "camelCase")]
    OpenPoll {
        question: String,
        options: Vec<PollOptionInput>,
        #[serde(default)]
        time_limit_seconds: Option<u32>,
    },
    /// Vote for one option of the live poll
    /// # Fields
    /// * `option_index` - Zero-based option index; out of range votes are dropped
    #[serde(rename = "respondent.submitVote", rename_all = "camelCase")]
    SubmitVote { option_index: i64 },
    /// Kick a respondent out of the session
    /// # Fields
    /// * `respondent_id` - Connection id of the respondent
    #[serde(rename = "presenter.removeRespondent", rename_all = "camelCase")]
    RemoveRespondent { respondent_id: ConnectionId },
    /// Post a chat message to everyone
    #[serde(rename = "chat.post", rename_all = "camelCase")]
    PostChat { sender_name: String, text: String },
}

/// Option as submitted by the presenter when opening a poll
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PollOptionInput {
    /// Option label
    pub text: String,
    /// Whether this is the correct answer
    #[serde(default)]
    pub is_correct: bool,
}

/// A respondent as listed in the presenter's roster
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RespondentInfo {
    pub id: ConnectionId,
    pub display_name: String,
}

/// The current poll as respondents may see it: no counts, no correctness
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PublicPoll {
    pub question: String,
    pub option_texts: Vec<String>,
    pub time_limit_seconds: u32,
    pub remaining_seconds: u32,
    pub is_live: bool,
}

/// Final result of a single option
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OptionResult {
    pub text: String,
    pub votes: u32,
    pub is_correct: bool,
}

/// Snapshot of a closed poll kept in the session history
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub question: String,
    pub options: Vec<OptionResult>,
    /// When the countdown elapsed
    pub timestamp: DateTime<Utc>,
}

/// A chat line
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub sender_name: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Messages sent from server to client
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "msgType")]
pub enum ServerMessage {
    /// Initial sync for a newly bound presenter
    #[serde(rename = "presenter.joinedAck", rename_all = "camelCase")]
    PresenterJoinedAck {
        /// Closed polls, newest first
        history: Vec<HistoryEntry>,
        roster: Vec<RespondentInfo>,
        chat_log: Vec<ChatMessage>,
    },
    /// Initial sync for a newly joined respondent
    #[serde(rename = "respondent.joinedAck", rename_all = "camelCase")]
    RespondentJoinedAck {
        respondent_id: ConnectionId,
        current_poll: Option<PublicPoll>,
        chat_log: Vec<ChatMessage>,
    },
    /// Roster changed (presenter only)
    #[serde(rename = "roster.updated")]
    RosterUpdated { respondents: Vec<RespondentInfo> },
    /// A poll went live
    #[serde(rename = "poll.opened", rename_all = "camelCase")]
    PollOpened {
        question: String,
        option_texts: Vec<String>,
        time_limit_seconds: u32,
    },
    /// In-progress counts (presenter only)
    #[serde(rename = "poll.liveTally", rename_all = "camelCase")]
    PollLiveTally { option_vote_counts: Vec<u32> },
    /// Final results once the countdown elapsed
    #[serde(rename = "poll.closed")]
    PollClosed {
        question: String,
        options: Vec<OptionResult>,
    },
    /// Full history, newest first (presenter only)
    #[serde(rename = "history.updated")]
    HistoryUpdated { polls: Vec<HistoryEntry> },
    /// The receiving respondent was removed; the server closes the connection next
    #[serde(rename = "respondent.kicked")]
    RespondentKicked,
    /// The presenter disconnected and the session was reset
    #[serde(rename = "presenter.left")]
    PresenterLeft,
    #[serde(rename = "chat.posted")]
    ChatPosted(ChatMessage),
    /// A rejected operation, sent to the originating connection only
    #[serde(rename = "error")]
    Error {
        code: String,
        message: String,
    },
    /// Error response for frames that are not a valid client message
    #[serde(rename = "malformedMessage", rename_all = "camelCase")]
    MalformedMessage { err_msg: String },
}

impl ServerMessage {
    /// Wire name of the message, as found in the `msgType` tag
    pub fn event_name(&self) -> &'static str {
        match self {
            ServerMessage::PresenterJoinedAck { .. } => "presenter.joinedAck",
            ServerMessage::RespondentJoinedAck { .. } => "respondent.joinedAck",
            ServerMessage::RosterUpdated { .. } => "roster.updated",
            ServerMessage::PollOpened { .. } => "poll.opened",
            ServerMessage::PollLiveTally { .. } => "poll.liveTally",
            ServerMessage::PollClosed { .. } => "poll.closed",
            ServerMessage::HistoryUpdated { .. } => "history.updated",
            ServerMessage::RespondentKicked => "respondent.kicked",
            ServerMessage::PresenterLeft => "presenter.left",
            ServerMessage::ChatPosted(_) => "chat.posted",
            ServerMessage::Error { .. } => "error",
            ServerMessage::MalformedMessage { .. } => "malformedMessage",
        }
    }

    /// Payloads meant for the presenter alone: live counts, history and roster
    pub fn is_presenter_only(&self) -> bool {
        matches!(
            self,
            ServerMessage::PollLiveTally { .. }
                | ServerMessage::HistoryUpdated { .. }
                | ServerMessage::PresenterJoinedAck { .. }
                | ServerMessage::RosterUpdated { .. }
        )
    }
}
