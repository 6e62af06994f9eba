use crate::integration::{create_test_session, init_tracing};
use crate::utils::AdapterCall;
use std::time::Duration;
use tandem_peer::{AdapterEvent, CloseReason, LinkSignal, LinkState, SessionConfig, SessionEvent};
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn test_disconnect_timeout() {
    init_tracing();

    let config = SessionConfig::default();
    let mut rig = create_test_session("alice", "bob", &config);

    rig.adapter
        .emit(AdapterEvent::ConnectionStateChanged(LinkSignal::Connected))
        .await;
    rig.expect(|e| matches!(e, SessionEvent::LinkChanged { state: LinkState::Connected, .. }))
        .await;

    rig.adapter
        .emit(AdapterEvent::ConnectionStateChanged(LinkSignal::Disconnected))
        .await;
    rig.expect(|e| matches!(e, SessionEvent::LinkChanged { state: LinkState::Disconnected, .. }))
        .await;
    let lost_at = Instant::now();

    let closed = rig.expect(|e| matches!(e, SessionEvent::Closed { .. })).await;
    let SessionEvent::Closed { peer, reason, .. } = closed else {
        unreachable!()
    };
    assert_eq!(peer.as_str(), "bob");
    assert_eq!(reason, CloseReason::ConnectionTimeout);
    assert!(lost_at.elapsed() >= Duration::from_secs(6));
    assert_eq!(rig.adapter.count(|c| *c == AdapterCall::Close).await, 1);

    // Closed is the last event: the feed ends right after it.
    while let Some(event) = rig.events.recv().await {
        assert!(!matches!(event, SessionEvent::Closed { .. }), "second Closed: {:?}", event);
    }
    assert!(rig.handle.is_closed());
}

#[tokio::test(start_paused = true)]
async fn test_recovery_cancels_timeout() {
    init_tracing();

    let config = SessionConfig::default();
    let mut rig = create_test_session("alice", "bob", &config);

    rig.adapter
        .emit(AdapterEvent::ConnectionStateChanged(LinkSignal::Failed))
        .await;
    rig.expect(|e| matches!(e, SessionEvent::LinkChanged { state: LinkState::Disconnected, .. }))
        .await;

    tokio::time::advance(Duration::from_secs(5)).await;
    rig.adapter
        .emit(AdapterEvent::ConnectionStateChanged(LinkSignal::Completed))
        .await;
    rig.expect(|e| matches!(e, SessionEvent::LinkChanged { state: LinkState::Connected, .. }))
        .await;

    tokio::time::advance(Duration::from_secs(10)).await;
    tokio::task::yield_now().await;
    assert!(!rig.handle.is_closed());
    assert!(rig.events.try_recv().is_err());

    rig.handle.close(CloseReason::LocalClose);
    let closed = rig.expect(|e| matches!(e, SessionEvent::Closed { .. })).await;
    assert!(matches!(closed, SessionEvent::Closed { reason: CloseReason::LocalClose, .. }));
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_peer_starts_timer() {
    init_tracing();

    let config = SessionConfig {
        disconnect_timeout: Duration::from_secs(2),
    };
    let mut rig = create_test_session("alice", "bob", &config);

    rig.handle.link_lost().unwrap();
    rig.expect(|e| matches!(e, SessionEvent::LinkChanged { state: LinkState::Disconnected, .. }))
        .await;
    let lost_at = Instant::now();

    let closed = rig.expect(|e| matches!(e, SessionEvent::Closed { .. })).await;
    assert!(matches!(closed, SessionEvent::Closed { reason: CloseReason::ConnectionTimeout, .. }));
    let waited = lost_at.elapsed();
    assert!(waited >= Duration::from_secs(2) && waited < Duration::from_secs(6));
}
