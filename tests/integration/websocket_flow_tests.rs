// ============================
// tests/integration/websocket_flow_tests.rs
// ============================
//! End-to-end tests over a real WebSocket.

use crate::test_utils::{connect, expect_closed, join, next_message, open_poll, send, setup_server};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures_util::SinkExt;
use livepoll_backend_lib::{config::Settings, ws_router, AppState};
use livepoll_common::{ClientMessage, ServerMessage};
use std::sync::Arc;
use tokio_tungstenite::tungstenite::Message;
use tower::ServiceExt;

#[tokio::test]
async fn test_second_presenter_is_rejected() {
    let (addr, state) = setup_server(Settings::default()).await;
    let mut first = connect(addr).await;
    let mut second = connect(addr).await;

    send(&mut first, &ClientMessage::PresenterJoin).await;
    assert!(matches!(
        next_message(&mut first, "first presenter ack").await,
        ServerMessage::PresenterJoinedAck { .. }
    ));

    send(&mut second, &ClientMessage::PresenterJoin).await;
    match next_message(&mut second, "second presenter").await {
        ServerMessage::Error { code, .. } => assert_eq!(code, "SESSION_001"),
        other => panic!("expected rejection, got {other:?}"),
    }

    // The first binding still holds presenter rights
    send(&mut first, &open_poll("Still mine?", &["yes", "no"], 0, 30)).await;
    assert_eq!(
        next_message(&mut first, "poll opened").await,
        ServerMessage::PollOpened {
            question: "Still mine?".to_string(),
            option_texts: vec!["yes".to_string(), "no".to_string()],
            time_limit_seconds: 30,
        }
    );
    assert!(matches!(
        next_message(&mut second, "poll opened broadcast").await,
        ServerMessage::PollOpened { .. }
    ));

    let stats = state.session.stats().await.unwrap();
    assert!(stats.presenter_connected);
    assert!(stats.live_poll);
}

#[tokio::test]
async fn test_respondent_join_updates_presenter_roster() {
    let (addr, _state) = setup_server(Settings::default()).await;
    let mut presenter = connect(addr).await;
    let mut respondent = connect(addr).await;

    send(&mut presenter, &ClientMessage::PresenterJoin).await;
    next_message(&mut presenter, "presenter ack").await;

    send(&mut respondent, &join("  Ana  ")).await;
    let respondent_id = match next_message(&mut respondent, "respondent ack").await {
        ServerMessage::RespondentJoinedAck {
            respondent_id,
            current_poll,
            chat_log,
        } => {
            assert!(current_poll.is_none());
            assert!(chat_log.is_empty());
            respondent_id
        },
        other => panic!("expected join ack, got {other:?}"),
    };

    match next_message(&mut presenter, "roster").await {
        ServerMessage::RosterUpdated { respondents } => {
            assert_eq!(respondents.len(), 1);
            assert_eq!(respondents[0].id, respondent_id);
            assert_eq!(respondents[0].display_name, "Ana");
        },
        other => panic!("expected roster, got {other:?}"),
    }

    // Leaving is reported too
    respondent.close(None).await.unwrap();
    match next_message(&mut presenter, "roster after leave").await {
        ServerMessage::RosterUpdated { respondents } => assert!(respondents.is_empty()),
        other => panic!("expected roster, got {other:?}"),
    }
}

#[tokio::test]
async fn test_full_poll_round_trip() {
    let (addr, _state) = setup_server(Settings::default()).await;
    let mut presenter = connect(addr).await;
    let mut respondent = connect(addr).await;

    send(&mut presenter, &ClientMessage::PresenterJoin).await;
    next_message(&mut presenter, "presenter ack").await;
    send(&mut respondent, &join("Ana")).await;
    next_message(&mut respondent, "respondent ack").await;
    next_message(&mut presenter, "roster").await;

    send(&mut presenter, &open_poll("2+2?", &["3", "4"], 1, 1)).await;
    next_message(&mut presenter, "opened").await;
    next_message(&mut respondent, "opened").await;

    send(&mut respondent, &ClientMessage::SubmitVote { option_index: 1 }).await;
    assert_eq!(
        next_message(&mut presenter, "tally").await,
        ServerMessage::PollLiveTally {
            option_vote_counts: vec![0, 1]
        }
    );

    // The respondent sees no tally, only the final results
    match next_message(&mut respondent, "closed").await {
        ServerMessage::PollClosed { question, options } => {
            assert_eq!(question, "2+2?");
            assert_eq!(options[1].votes, 1);
            assert!(options[1].is_correct);
        },
        other => panic!("expected poll.closed, got {other:?}"),
    }
    assert!(matches!(
        next_message(&mut presenter, "closed").await,
        ServerMessage::PollClosed { .. }
    ));
    match next_message(&mut presenter, "history").await {
        ServerMessage::HistoryUpdated { polls } => assert_eq!(polls.len(), 1),
        other => panic!("expected history, got {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_frame_is_reported() {
    let (addr, _state) = setup_server(Settings::default()).await;
    let mut ws = connect(addr).await;

    ws.send(Message::Text("{\"msgType\":\"presenter.dance\"}".into()))
        .await
        .unwrap();
    assert!(matches!(
        next_message(&mut ws, "malformed").await,
        ServerMessage::MalformedMessage { .. }
    ));

    // The connection stays usable
    send(&mut ws, &ClientMessage::PresenterJoin).await;
    assert!(matches!(
        next_message(&mut ws, "ack").await,
        ServerMessage::PresenterJoinedAck { .. }
    ));
}

#[tokio::test]
async fn test_kicked_respondent_is_disconnected() {
    let (addr, state) = setup_server(Settings::default()).await;
    let mut presenter = connect(addr).await;
    let mut respondent = connect(addr).await;

    send(&mut presenter, &ClientMessage::PresenterJoin).await;
    next_message(&mut presenter, "presenter ack").await;
    send(&mut respondent, &join("Ana")).await;
    let ServerMessage::RespondentJoinedAck { respondent_id, .. } =
        next_message(&mut respondent, "respondent ack").await
    else {
        panic!("expected join ack");
    };
    next_message(&mut presenter, "roster").await;

    send(&mut presenter, &ClientMessage::RemoveRespondent { respondent_id }).await;
    assert_eq!(
        next_message(&mut respondent, "kick notice").await,
        ServerMessage::RespondentKicked
    );
    expect_closed(&mut respondent, "kicked").await;

    match next_message(&mut presenter, "roster after kick").await {
        ServerMessage::RosterUpdated { respondents } => assert!(respondents.is_empty()),
        other => panic!("expected roster, got {other:?}"),
    }
    assert_eq!(state.session.stats().await.unwrap().respondents, 0);
}

#[tokio::test]
async fn test_presenter_disconnect_notifies_respondents() {
    let (addr, state) = setup_server(Settings::default()).await;
    let mut presenter = connect(addr).await;
    let mut respondent = connect(addr).await;

    send(&mut presenter, &ClientMessage::PresenterJoin).await;
    next_message(&mut presenter, "presenter ack").await;
    send(&mut respondent, &join("Ana")).await;
    next_message(&mut respondent, "respondent ack").await;
    send(&mut presenter, &open_poll("Live?", &["a", "b"], 0, 60)).await;
    next_message(&mut respondent, "opened").await;

    presenter.close(None).await.unwrap();
    assert_eq!(
        next_message(&mut respondent, "presenter left").await,
        ServerMessage::PresenterLeft
    );

    let stats = state.session.stats().await.unwrap();
    assert!(!stats.presenter_connected);
    assert!(!stats.live_poll);
    assert_eq!(stats.respondents, 0);
}

#[tokio::test]
async fn test_health_reports_session_stats() {
    let state = Arc::new(AppState::new(Settings::default()));
    let app = ws_router::create_router(state);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["presenterConnected"], false);
    assert_eq!(json["respondents"], 0);
    assert_eq!(json["livePoll"], false);
    assert_eq!(json["connections"], 0);
}
