// ============================
// livepoll-backend-lib/src/ws_router.rs
// ============================
//! WebSocket router and connection handling.
use crate::error::AppError;
use crate::router::Outbound;
use crate::session::SessionStats;
use crate::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use futures_util::{SinkExt, StreamExt};
use livepoll_common::ClientMessage;
use metrics::{counter, gauge};
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Create the HTTP router: the WebSocket endpoint plus a health probe
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Handler for WebSocket connections
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

/// Session counters as JSON
pub async fn health_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SessionStats>, AppError> {
    Ok(Json(state.session.stats().await?))
}

async fn handle_connection(socket: WebSocket, state: Arc<AppState>) {
    let conn = Uuid::new_v4();
    let (mut tx, mut rx) = socket.split();

    // Everything the session sends this connection goes through this channel
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Outbound>();
    if state.session.attach(conn, out_tx).is_err() {
        warn!(%conn, "session unavailable, dropping connection");
        return;
    }

    counter!(crate::metrics::WS_CONNECTION).increment(1);
    gauge!(crate::metrics::WS_ACTIVE).increment(1.0);
    info!(%conn, "connection opened");

    // Task 1: Forward outbound messages to the WebSocket
    let mut send_task = tokio::spawn(async move {
        while let Some(outbound) = out_rx.recv().await {
            match outbound {
                Outbound::Message(message) => {
                    let json = match serde_json::to_string(&message) {
                        Ok(json) => json,
                        Err(e) => {
                            warn!(%conn, error = %e, "failed to serialize outbound message");
                            continue;
                        },
                    };
                    if tx.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                },
                Outbound::Close => {
                    let _ = tx.send(Message::Close(None)).await;
                    break;
                },
            }
        }
    });

    // Main task: decode incoming frames until the peer leaves or the server closes us
    loop {
        tokio::select! {
            incoming = rx.next() => {
                let message = match incoming {
                    Some(Ok(message)) => message,
                    Some(Err(e)) => {
                        debug!(%conn, error = %e, "websocket error");
                        break;
                    },
                    None => break,
                };
                let forwarded = match message {
                    Message::Text(text) => match serde_json::from_str::<ClientMessage>(text.as_str()) {
                        Ok(client_msg) => state.session.dispatch(conn, client_msg),
                        Err(e) => state.session.malformed(conn, e.to_string()),
                    },
                    Message::Close(_) => break,
                    _ => Ok(()), // Ignore other message types
                };
                if forwarded.is_err() {
                    warn!(%conn, "session unavailable, closing connection");
                    break;
                }
            },
            _ = &mut send_task => break,
        }
    }

    // Cleanup: the session treats this as leaving
    let _ = state.session.detach(conn);
    send_task.abort();

    counter!(crate::metrics::WS_DISCONNECTION).increment(1);
    gauge!(crate::metrics::WS_ACTIVE).decrement(1.0);
    info!(%conn, "connection closed");
}
