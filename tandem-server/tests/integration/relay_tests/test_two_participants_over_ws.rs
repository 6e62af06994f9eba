use tandem_core::{ErrorCode, ParticipantId, SignalMessage};

use crate::integration::init_tracing;
use crate::utils::{RelayClient, spawn_relay};

#[tokio::test]
async fn test_two_participants_over_ws() {
    init_tracing();

    let addr = spawn_relay().await.expect("Failed to start relay");
    let mut alice = RelayClient::connect(addr, "alice").await.unwrap();
    let mut bob = RelayClient::connect(addr, "bob").await.unwrap();

    assert!(alice.join("r1").await.unwrap().is_empty());
    assert_eq!(
        bob.join("r1").await.unwrap(),
        vec![ParticipantId::from("alice")]
    );

    alice
        .expect(|m| {
            matches!(m, SignalMessage::UserJoined { participant_id } if participant_id.as_str() == "bob")
        })
        .await
        .expect("alice should hear about bob");

    alice
        .send(&SignalMessage::Offer {
            to_participant_id: "bob".into(),
            sdp: "v=0 offer".into(),
            from_participant_id: None,
        })
        .await
        .unwrap();

    let offer = bob
        .expect(|m| matches!(m, SignalMessage::Offer { .. }))
        .await
        .unwrap();
    assert_eq!(offer.sender(), Some(&ParticipantId::from("alice")));

    alice.close().await.unwrap();

    bob.expect(|m| {
        matches!(m, SignalMessage::Leave { participant_id } if participant_id.as_str() == "alice")
    })
    .await
    .expect("bob should be told that alice left");

    bob.send(&SignalMessage::Answer {
        to_participant_id: "alice".into(),
        sdp: "v=0 answer".into(),
        from_participant_id: None,
    })
    .await
    .unwrap();

    let error = bob
        .expect(|m| matches!(m, SignalMessage::Error { .. }))
        .await
        .unwrap();
    assert!(matches!(
        error,
        SignalMessage::Error {
            code: ErrorCode::ParticipantUnreachable,
            to_participant_id: Some(ref to),
            ..
        } if to.as_str() == "alice"
    ));
}

#[tokio::test]
async fn test_join_announces_ice_config() {
    init_tracing();

    let addr = spawn_relay().await.expect("Failed to start relay");
    let mut carol = RelayClient::connect(addr, "carol").await.unwrap();

    carol
        .send(&SignalMessage::JoinRoom {
            room_id: "r2".into(),
            participant_id: "carol".into(),
        })
        .await
        .unwrap();

    let config = carol
        .expect(|m| matches!(m, SignalMessage::IceConfig { .. }))
        .await
        .unwrap();
    let SignalMessage::IceConfig { ice_servers } = config else {
        unreachable!();
    };
    assert!(!ice_servers.is_empty());
}
