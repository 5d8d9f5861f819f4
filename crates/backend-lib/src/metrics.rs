// ==============
// crates/backend-lib/src/metrics.rs

//! Central place for metric keys
pub const WS_CONNECTION: &str = "ws.connection";
pub const WS_DISCONNECTION: &str = "ws.disconnection";
pub const WS_ACTIVE: &str = "ws.active";
pub const RESPONDENT_JOINED: &str = "respondent.joined";
pub const RESPONDENTS_ACTIVE: &str = "respondent.active";
pub const POLL_OPENED: &str = "poll.opened";
pub const POLL_CLOSED: &str = "poll.closed";
pub const VOTE_ACCEPTED: &str = "vote.accepted";
pub const VOTE_IGNORED: &str = "vote.ignored";
pub const CHAT_POSTED: &str = "chat.posted";
pub const OPERATION_REJECTED: &str = "operation.rejected";
pub const SESSION_RESET: &str = "session.reset";
