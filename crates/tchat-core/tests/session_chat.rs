//! Chat and lifecycle behaviour between two live sessions.

use tchat_core::pump::CloseReason;
use tchat_core::session::Origin;
use tchat_core::{AutoAccept, Error, Session, SessionConfig, SessionEvent, SessionStatus};
use tchat_test_utils::{RawPeer, duplex_pair, next_event, wait_for_event};

fn config(name: &str, dir: &std::path::Path) -> SessionConfig {
    SessionConfig::new(name)
        .with_downloads_dir(dir)
        .with_outbound_queue(512)
}

#[tokio::test]
async fn text_arrives_in_send_order() {
    let dir = tempfile::tempdir().unwrap();
    let (a, b) = duplex_pair();
    let (alice, _alice_events) = Session::start(a, config("alice", dir.path()), AutoAccept).unwrap();
    let (_bob, mut bob_events) = Session::start(b, config("bob", dir.path()), AutoAccept).unwrap();

    for i in 0..200 {
        alice.send_text(format!("message {i}")).unwrap();
    }

    for i in 0..200 {
        match next_event(&mut bob_events).await {
            SessionEvent::TextReceived(line) => {
                assert_eq!(line.sender, "alice");
                assert_eq!(line.content, format!("message {i}"));
                assert_eq!(line.origin, Origin::Remote);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}

#[tokio::test]
async fn history_records_both_directions() {
    let dir = tempfile::tempdir().unwrap();
    let (a, b) = duplex_pair();
    let (alice, mut alice_events) =
        Session::start(a, config("alice", dir.path()), AutoAccept).unwrap();
    let (bob, mut bob_events) = Session::start(b, config("bob", dir.path()), AutoAccept).unwrap();

    alice.send_text("hello bob").unwrap();
    wait_for_event(&mut bob_events, |e| matches!(e, SessionEvent::TextReceived(_))).await;
    bob.send_text("hi alice").unwrap();
    wait_for_event(&mut alice_events, |e| matches!(e, SessionEvent::TextReceived(_))).await;

    let history = alice.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].content, "hello bob");
    assert_eq!(history[0].origin, Origin::Local);
    assert_eq!(history[1].content, "hi alice");
    assert_eq!(history[1].sender, "bob");
    assert_eq!(alice.recent_history(1)[0].content, "hi alice");
}

#[tokio::test]
async fn history_is_bounded() {
    let dir = tempfile::tempdir().unwrap();
    let (a, _b) = duplex_pair();
    let (alice, _events) = Session::start(
        a,
        config("alice", dir.path()).with_history_limit(3),
        AutoAccept,
    )
    .unwrap();

    for i in 0..10 {
        alice.send_text(format!("{i}")).unwrap();
    }
    let contents: Vec<String> = alice.history().into_iter().map(|l| l.content).collect();
    assert_eq!(contents, vec!["7", "8", "9"]);
}

#[tokio::test]
async fn shutdown_notifies_both_sides() {
    let dir = tempfile::tempdir().unwrap();
    let (a, b) = duplex_pair();
    let (alice, mut alice_events) =
        Session::start(a, config("alice", dir.path()), AutoAccept).unwrap();
    let (bob, mut bob_events) = Session::start(b, config("bob", dir.path()), AutoAccept).unwrap();

    alice.shutdown().await;

    match wait_for_event(&mut alice_events, |e| matches!(e, SessionEvent::Disconnected { .. })).await
    {
        SessionEvent::Disconnected { reason } => assert_eq!(reason, CloseReason::LocalShutdown),
        _ => unreachable!(),
    }
    match wait_for_event(&mut bob_events, |e| matches!(e, SessionEvent::Disconnected { .. })).await {
        SessionEvent::Disconnected { reason } => assert_eq!(reason, CloseReason::PeerDisconnected),
        _ => unreachable!(),
    }

    assert_eq!(
        alice.status(),
        SessionStatus::Disconnected(CloseReason::LocalShutdown)
    );
    assert!(!bob.is_connected());
    assert!(matches!(alice.send_text("late"), Err(Error::Disconnected)));
    assert!(matches!(bob.send_text("late"), Err(Error::Disconnected)));
}

#[tokio::test]
async fn shutdown_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let (a, _b) = duplex_pair();
    let (alice, mut events) = Session::start(a, config("alice", dir.path()), AutoAccept).unwrap();

    alice.shutdown().await;
    alice.shutdown().await;

    let mut disconnects = 0;
    while let Ok(event) = events.try_recv() {
        if matches!(event, SessionEvent::Disconnected { .. }) {
            disconnects += 1;
        }
    }
    assert_eq!(disconnects, 1);
}

#[tokio::test]
async fn shutdown_sends_disconnect_frame() {
    let dir = tempfile::tempdir().unwrap();
    let (a, b) = duplex_pair();
    let (alice, _events) = Session::start(a, config("alice", dir.path()), AutoAccept).unwrap();
    let mut peer = RawPeer::new(b);

    alice.send_text("bye").unwrap();
    alice.shutdown().await;

    let frames = peer.recv_until_closed().await.unwrap();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[1], tchat_core::Frame::Disconnect);
}

#[tokio::test]
async fn peer_eof_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let (a, b) = duplex_pair();
    let (alice, mut events) = Session::start(a, config("alice", dir.path()), AutoAccept).unwrap();
    drop(b);

    match wait_for_event(&mut events, |e| matches!(e, SessionEvent::Disconnected { .. })).await {
        SessionEvent::Disconnected { reason } => assert_eq!(reason, CloseReason::PeerClosed),
        _ => unreachable!(),
    }
    assert!(!alice.is_connected());
}

#[tokio::test]
async fn invalid_config_is_refused() {
    let (a, _b) = duplex_pair();
    let err = Session::start(a, SessionConfig::new("x").with_chunk_size(0), AutoAccept).unwrap_err();
    assert!(matches!(err, Error::Config { .. }));
}

#[tokio::test]
async fn shutdown_from_another_task() {
    let dir = tempfile::tempdir().unwrap();
    let (a, _b) = duplex_pair();
    let (alice, mut events) = Session::start(a, config("alice", dir.path()), AutoAccept).unwrap();
    let alice = std::sync::Arc::new(alice);

    let remote = std::sync::Arc::clone(&alice);
    tokio::spawn(async move { remote.shutdown().await })
        .await
        .unwrap();

    wait_for_event(&mut events, |e| matches!(e, SessionEvent::Disconnected { .. })).await;
    assert!(!alice.is_connected());
}
