// ============================
// livepoll-backend-lib/src/session_actor.rs
// ============================
//! Actor that owns the [`Session`].
//!
//! Connection tasks and the poll countdown talk to the session only through
//! the actor's command channel, so every mutation, ticks included, runs one
//! at a time in arrival order.
use livepoll_common::{ClientMessage, ConnectionId};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::config::SessionSettings;
use crate::countdown::{Countdown, CountdownScheduler, TICK_PERIOD};
use crate::error::AppError;
use crate::poll::PollId;
use crate::router::{self, ConnectionSink, Outbox, SessionEvent};
use crate::session::{Session, SessionStats};

/// Message sent *into* the actor
#[derive(Debug)]
pub enum SessionCommand {
    /// A connection opened
    Attach {
        conn: ConnectionId,
        sink: ConnectionSink,
    },
    /// A connection closed
    Detach { conn: ConnectionId },
    /// A decoded client message
    Inbound {
        conn: ConnectionId,
        message: ClientMessage,
    },
    /// A frame that did not decode
    Malformed {
        conn: ConnectionId,
        err_msg: String,
    },
    /// One countdown second elapsed for `poll_id`
    Tick { poll_id: PollId },
    Stats {
        resp_tx: oneshot::Sender<SessionStats>,
    },
}

/// Handle that other components keep
#[derive(Clone, Debug)]
pub struct SessionHandle {
    cmd_tx: mpsc::UnboundedSender<SessionCommand>,
}

impl SessionHandle {
    /// Spawn a session actor on the current runtime
    pub fn spawn(settings: SessionSettings) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let scheduler = ActorScheduler {
            commands: cmd_tx.downgrade(),
        };
        let actor = SessionActor::new(Session::new(settings, Box::new(scheduler)));

        tokio::spawn(actor.run(cmd_rx));

        SessionHandle { cmd_tx }
    }

    pub fn attach(&self, conn: ConnectionId, sink: ConnectionSink) -> Result<(), AppError> {
        self.cmd_tx.send(SessionCommand::Attach { conn, sink })?;
        Ok(())
    }

    pub fn detach(&self, conn: ConnectionId) -> Result<(), AppError> {
        self.cmd_tx.send(SessionCommand::Detach { conn })?;
        Ok(())
    }

    pub fn dispatch(&self, conn: ConnectionId, message: ClientMessage) -> Result<(), AppError> {
        self.cmd_tx.send(SessionCommand::Inbound { conn, message })?;
        Ok(())
    }

    pub fn malformed(&self, conn: ConnectionId, err_msg: String) -> Result<(), AppError> {
        self.cmd_tx.send(SessionCommand::Malformed { conn, err_msg })?;
        Ok(())
    }

    pub async fn stats(&self) -> Result<SessionStats, AppError> {
        let (resp_tx, resp_rx) = oneshot::channel();
        self.cmd_tx.send(SessionCommand::Stats { resp_tx })?;
        Ok(resp_rx.await?)
    }
}

/// Feeds countdown ticks back into the actor's own mailbox.
///
/// Holds a weak sender so a running countdown does not keep the actor alive
/// once every [`SessionHandle`] is gone.
struct ActorScheduler {
    commands: mpsc::WeakUnboundedSender<SessionCommand>,
}

impl CountdownScheduler for ActorScheduler {
    fn start(&self, poll_id: PollId) -> Countdown {
        let commands = self.commands.clone();
        let task = tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticks.tick().await;
                let Some(commands) = commands.upgrade() else {
                    break;
                };
                if commands.send(SessionCommand::Tick { poll_id }).is_err() {
                    break;
                }
            }
        });
        Countdown::new(poll_id, task.abort_handle())
    }
}

pub struct SessionActor {
    session: Session,
    outbox: Outbox,
}

impl SessionActor {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            outbox: Outbox::new(),
        }
    }

    pub async fn run(mut self, mut rx: mpsc::UnboundedReceiver<SessionCommand>) {
        while let Some(command) = rx.recv().await {
            self.apply(command);
        }
        info!("session actor stopped");
    }

    fn apply(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Attach { conn, sink } => {
                debug!(%conn, "connection attached");
                self.outbox.attach(conn, sink);
            },
            SessionCommand::Detach { conn } => {
                debug!(%conn, "connection detached");
                self.outbox.detach(conn);
                let event = self.session.disconnect(conn);
                self.publish(event);
            },
            SessionCommand::Inbound { conn, message } => {
                let events = self.session.handle(conn, message);
                self.publish(events);
            },
            SessionCommand::Malformed { conn, err_msg } => {
                debug!(%conn, %err_msg, "malformed frame");
                self.publish(Some(SessionEvent::Malformed { origin: conn, err_msg }));
            },
            SessionCommand::Tick { poll_id } => {
                let events = self.session.tick(poll_id);
                self.publish(events);
            },
            SessionCommand::Stats { resp_tx } => {
                let mut stats = self.session.stats();
                stats.connections = self.outbox.len();
                let _ = resp_tx.send(stats);
            },
        }
    }

    fn publish(&mut self, events: impl IntoIterator<Item = SessionEvent>) {
        for event in events {
            for delivery in router::route(event) {
                self.outbox.deliver(delivery, self.session.presenter());
            }
        }
    }
}
