// ============================
// tests/integration/session_flow_tests.rs
// ============================
//! Session flows driven through the actor with paused time.

use crate::test_utils::{join, open_poll, settle, Probe};
use livepoll_backend_lib::{config::SessionSettings, router::Outbound, session_actor::SessionHandle};
use livepoll_common::{ClientMessage, OptionResult, ServerMessage};
use std::time::Duration;

fn spawn_session() -> SessionHandle {
    SessionHandle::spawn(SessionSettings::default())
}

/// Receive until a `poll.closed` arrives
async fn wait_for_close(probe: &mut Probe) -> ServerMessage {
    loop {
        if let Outbound::Message(message @ ServerMessage::PollClosed { .. }) = probe.recv().await {
            return message;
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_poll_closes_with_results_for_everyone() {
    let session = spawn_session();
    let mut presenter = Probe::attach(&session);
    let mut r1 = Probe::attach(&session);
    let mut r2 = Probe::attach(&session);

    session.dispatch(presenter.id, ClientMessage::PresenterJoin).unwrap();
    session.dispatch(r1.id, join("Ana")).unwrap();
    session.dispatch(r2.id, join("Ben")).unwrap();
    session
        .dispatch(presenter.id, open_poll("2+2?", &["3", "4"], 1, 5))
        .unwrap();
    settle(&session).await;
    presenter.drain();
    r1.drain();
    r2.drain();

    tokio::time::sleep(Duration::from_secs(1)).await;
    session
        .dispatch(r1.id, ClientMessage::SubmitVote { option_index: 1 })
        .unwrap();

    let expected = ServerMessage::PollClosed {
        question: "2+2?".to_string(),
        options: vec![
            OptionResult { text: "3".to_string(), votes: 0, is_correct: false },
            OptionResult { text: "4".to_string(), votes: 1, is_correct: true },
        ],
    };
    assert_eq!(wait_for_close(&mut r1).await, expected);
    assert_eq!(wait_for_close(&mut r2).await, expected);

    settle(&session).await;
    let presenter_msgs = presenter.messages();
    assert!(presenter_msgs.contains(&expected));
    let history = presenter_msgs.iter().find_map(|m| match m {
        ServerMessage::HistoryUpdated { polls } => Some(polls.clone()),
        _ => None,
    });
    let history = history.expect("presenter receives history");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].question, "2+2?");

    let stats = session.stats().await.unwrap();
    assert!(!stats.live_poll);
    assert_eq!(stats.history_len, 1);
}

#[tokio::test(start_paused = true)]
async fn test_poll_does_not_close_early() {
    let session = spawn_session();
    let mut presenter = Probe::attach(&session);
    session.dispatch(presenter.id, ClientMessage::PresenterJoin).unwrap();
    session
        .dispatch(presenter.id, open_poll("Colour?", &["red", "blue"], 0, 5))
        .unwrap();
    settle(&session).await;

    tokio::time::sleep(Duration::from_millis(4_500)).await;
    settle(&session).await;
    assert!(session.stats().await.unwrap().live_poll);
    assert!(!presenter
        .messages()
        .iter()
        .any(|m| matches!(m, ServerMessage::PollClosed { .. })));

    tokio::time::sleep(Duration::from_secs(1)).await;
    settle(&session).await;
    assert!(!session.stats().await.unwrap().live_poll);
}

#[tokio::test(start_paused = true)]
async fn test_second_vote_is_ignored() {
    let session = spawn_session();
    let mut presenter = Probe::attach(&session);
    let r1 = Probe::attach(&session);

    session.dispatch(presenter.id, ClientMessage::PresenterJoin).unwrap();
    session.dispatch(r1.id, join("Ana")).unwrap();
    // Shorter than RECV_TIMEOUT so the close lands before the wait gives up
    session
        .dispatch(presenter.id, open_poll("2+2?", &["3", "4"], 1, 2))
        .unwrap();
    session
        .dispatch(r1.id, ClientMessage::SubmitVote { option_index: 1 })
        .unwrap();
    session
        .dispatch(r1.id, ClientMessage::SubmitVote { option_index: 0 })
        .unwrap();
    settle(&session).await;

    let tallies: Vec<_> = presenter
        .messages()
        .into_iter()
        .filter_map(|m| match m {
            ServerMessage::PollLiveTally { option_vote_counts } => Some(option_vote_counts),
            _ => None,
        })
        .collect();
    assert_eq!(tallies, vec![vec![0, 1]]);

    let closed = wait_for_close(&mut presenter).await;
    let ServerMessage::PollClosed { options, .. } = closed else {
        unreachable!()
    };
    assert_eq!(options[0].votes, 0);
    assert_eq!(options[1].votes, 1);
}

#[tokio::test(start_paused = true)]
async fn test_live_tally_reaches_presenter_only() {
    let session = spawn_session();
    let mut presenter = Probe::attach(&session);
    let mut r1 = Probe::attach(&session);
    let mut r2 = Probe::attach(&session);

    session.dispatch(presenter.id, ClientMessage::PresenterJoin).unwrap();
    session.dispatch(r1.id, join("Ana")).unwrap();
    session.dispatch(r2.id, join("Ben")).unwrap();
    session
        .dispatch(presenter.id, open_poll("Pick", &["a", "b", "c"], 2, 30))
        .unwrap();
    settle(&session).await;
    presenter.drain();
    r1.drain();
    r2.drain();

    session
        .dispatch(r1.id, ClientMessage::SubmitVote { option_index: 2 })
        .unwrap();
    session
        .dispatch(r2.id, ClientMessage::SubmitVote { option_index: 2 })
        .unwrap();
    settle(&session).await;

    assert_eq!(
        presenter.messages(),
        vec![
            ServerMessage::PollLiveTally { option_vote_counts: vec![0, 0, 1] },
            ServerMessage::PollLiveTally { option_vote_counts: vec![0, 0, 2] },
        ]
    );
    assert!(r1.messages().is_empty());
    assert!(r2.messages().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_presenter_leaving_resets_session() {
    let session = spawn_session();
    let presenter = Probe::attach(&session);
    let mut r1 = Probe::attach(&session);

    // Archive one poll before the reset
    session.dispatch(presenter.id, ClientMessage::PresenterJoin).unwrap();
    session.dispatch(r1.id, join("Ana")).unwrap();
    session
        .dispatch(presenter.id, open_poll("First", &["x", "y"], 0, 1))
        .unwrap();
    wait_for_close(&mut r1).await;

    session
        .dispatch(presenter.id, open_poll("Second", &["x", "y"], 0, 10))
        .unwrap();
    session
        .dispatch(
            r1.id,
            ClientMessage::PostChat {
                sender_name: "Ana".to_string(),
                text: "hello".to_string(),
            },
        )
        .unwrap();
    settle(&session).await;
    r1.drain();

    session.detach(presenter.id).unwrap();
    settle(&session).await;
    assert_eq!(r1.messages(), vec![ServerMessage::PresenterLeft]);

    let stats = session.stats().await.unwrap();
    assert!(!stats.presenter_connected);
    assert!(!stats.live_poll);
    assert_eq!(stats.respondents, 0);
    assert_eq!(stats.chat_len, 0);
    assert_eq!(stats.history_len, 1);

    // The aborted countdown never closes the preempted poll
    tokio::time::sleep(Duration::from_secs(15)).await;
    settle(&session).await;
    assert!(r1.messages().is_empty());

    let mut newcomer = Probe::attach(&session);
    session.dispatch(newcomer.id, join("Cleo")).unwrap();
    settle(&session).await;
    assert_eq!(
        newcomer.messages(),
        vec![ServerMessage::RespondentJoinedAck {
            respondent_id: newcomer.id,
            current_poll: None,
            chat_log: Vec::new(),
        }]
    );

    let mut next_presenter = Probe::attach(&session);
    session
        .dispatch(next_presenter.id, ClientMessage::PresenterJoin)
        .unwrap();
    settle(&session).await;
    match next_presenter.messages().as_slice() {
        [ServerMessage::PresenterJoinedAck { history, roster, chat_log }] => {
            assert_eq!(history.len(), 1);
            assert_eq!(history[0].question, "First");
            assert_eq!(roster.len(), 1);
            assert_eq!(roster[0].display_name, "Cleo");
            assert!(chat_log.is_empty());
        },
        other => panic!("unexpected presenter sync: {other:?}"),
    }
}

#[tokio::test]
async fn test_kick_sends_notice_then_closes() {
    let session = spawn_session();
    let mut presenter = Probe::attach(&session);
    let mut r1 = Probe::attach(&session);
    let mut r2 = Probe::attach(&session);

    session.dispatch(presenter.id, ClientMessage::PresenterJoin).unwrap();
    session.dispatch(r1.id, join("Ana")).unwrap();
    session.dispatch(r2.id, join("Ben")).unwrap();
    settle(&session).await;
    presenter.drain();
    r1.drain();
    r2.drain();

    session
        .dispatch(presenter.id, ClientMessage::RemoveRespondent { respondent_id: r1.id })
        .unwrap();
    settle(&session).await;

    assert_eq!(
        r1.drain(),
        vec![Outbound::Message(ServerMessage::RespondentKicked), Outbound::Close]
    );
    match presenter.messages().as_slice() {
        [ServerMessage::RosterUpdated { respondents }] => {
            assert_eq!(respondents.len(), 1);
            assert_eq!(respondents[0].id, r2.id);
        },
        other => panic!("unexpected presenter messages: {other:?}"),
    }
    assert!(r2.drain().is_empty());

    let stats = session.stats().await.unwrap();
    assert_eq!(stats.respondents, 1);
    assert_eq!(stats.connections, 2);
}

#[tokio::test]
async fn test_respondent_cannot_open_poll() {
    let session = spawn_session();
    let mut r1 = Probe::attach(&session);
    session.dispatch(r1.id, join("Ana")).unwrap();
    session.dispatch(r1.id, open_poll("Q", &["a", "b"], 0, 5)).unwrap();
    settle(&session).await;

    let messages = r1.messages();
    assert!(matches!(
        messages.last(),
        Some(ServerMessage::Error { code, .. }) if code == "SESSION_002"
    ));
    assert!(!session.stats().await.unwrap().live_poll);
}

#[tokio::test]
async fn test_chat_reaches_every_connection() {
    let session = spawn_session();
    let mut presenter = Probe::attach(&session);
    let mut r1 = Probe::attach(&session);
    let mut watcher = Probe::attach(&session);

    session.dispatch(presenter.id, ClientMessage::PresenterJoin).unwrap();
    session.dispatch(r1.id, join("Ana")).unwrap();
    settle(&session).await;
    presenter.drain();
    r1.drain();
    watcher.drain();

    session
        .dispatch(
            r1.id,
            ClientMessage::PostChat {
                sender_name: "Ana".to_string(),
                text: "hi all".to_string(),
            },
        )
        .unwrap();
    settle(&session).await;

    for probe in [&mut presenter, &mut r1, &mut watcher] {
        match probe.messages().as_slice() {
            [ServerMessage::ChatPosted(chat)] => {
                assert_eq!(chat.sender_name, "Ana");
                assert_eq!(chat.text, "hi all");
            },
            other => panic!("unexpected chat delivery: {other:?}"),
        }
    }
}
