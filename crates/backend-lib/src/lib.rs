// ============================
// livepoll-backend-lib/src/lib.rs
// ============================
//! Core backend-lib functionality for the live-poll WebSocket server.

pub mod config;
pub mod countdown;
pub mod error;
pub mod history;
pub mod ledger;
pub mod metrics;
pub mod poll;
pub mod registry;
pub mod router;
pub mod session;
pub mod session_actor;
pub mod validation;
pub mod ws_router;

use std::sync::Arc;

use crate::config::Settings;
use crate::session_actor::SessionHandle;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Handle to the single poll session
    pub session: SessionHandle,
    /// Settings the server was started with
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Create a new application state, spawning the session actor.
    /// Must be called from within a Tokio runtime.
    pub fn new(settings: Settings) -> Self {
        let session = SessionHandle::spawn(settings.session.clone());
        Self {
            session,
            settings: Arc::new(settings),
        }
    }
}
