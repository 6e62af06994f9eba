use tandem_core::{IceCandidate, ParticipantId, RoomId, SignalMessage};

use crate::integration::{create_test_registry, init_tracing};

#[tokio::test]
async fn test_route_stamps_sender() {
    init_tracing();

    let (rooms, signaling, _signal_rx) = create_test_registry();
    let room = RoomId::from("r1");
    let alice = ParticipantId::from("alice");
    let bob = ParticipantId::from("bob");

    rooms.join(&room, alice.clone()).await;
    rooms.join(&room, bob.clone()).await;

    let offer = SignalMessage::Offer {
        to_participant_id: bob.clone(),
        sdp: "v=0 offer".into(),
        from_participant_id: Some("mallory".into()),
    };
    rooms.route(&room, alice.clone(), offer).await.unwrap();

    let delivered = signaling.delivered_to(&bob).await;
    assert_eq!(
        delivered,
        vec![SignalMessage::Offer {
            to_participant_id: bob.clone(),
            sdp: "v=0 offer".into(),
            from_participant_id: Some(alice.clone()),
        }]
    );
}

#[tokio::test]
async fn test_route_preserves_sender_order() {
    init_tracing();

    let (rooms, signaling, _signal_rx) = create_test_registry();
    let room = RoomId::from("r1");
    let alice = ParticipantId::from("alice");
    let bob = ParticipantId::from("bob");

    rooms.join(&room, alice.clone()).await;
    rooms.join(&room, bob.clone()).await;

    for i in 0..20 {
        let msg = SignalMessage::IceCandidate {
            to_participant_id: alice.clone(),
            candidate: IceCandidate::new(format!("candidate:{}", i)),
            from_participant_id: None,
        };
        rooms.route(&room, bob.clone(), msg).await.unwrap();
    }

    let received: Vec<String> = signaling
        .delivered_to(&alice)
        .await
        .into_iter()
        .filter_map(|m| match m {
            SignalMessage::IceCandidate { candidate, .. } => Some(candidate.candidate),
            _ => None,
        })
        .collect();
    let expected: Vec<String> = (0..20).map(|i| format!("candidate:{}", i)).collect();
    assert_eq!(received, expected);
}
