use tandem_core::{ParticipantId, RoomId, SignalError, SignalMessage};

use crate::integration::{create_test_registry, init_tracing};

fn answer_to(to: &ParticipantId) -> SignalMessage {
    SignalMessage::Answer {
        to_participant_id: to.clone(),
        sdp: "v=0 answer".into(),
        from_participant_id: None,
    }
}

#[tokio::test]
async fn test_route_to_participant_who_left() {
    init_tracing();

    let (rooms, _signaling, _signal_rx) = create_test_registry();
    let room = RoomId::from("r1");
    let alice = ParticipantId::from("alice");
    let bob = ParticipantId::from("bob");

    rooms.join(&room, alice.clone()).await;
    rooms.join(&room, bob.clone()).await;
    rooms.leave(&room, bob.clone()).await;

    let err = rooms
        .route(&room, alice.clone(), answer_to(&bob))
        .await
        .unwrap_err();
    assert_eq!(err, SignalError::ParticipantUnreachable(bob));
}

#[tokio::test]
async fn test_route_to_dead_transport() {
    init_tracing();

    let (rooms, signaling, _signal_rx) = create_test_registry();
    let room = RoomId::from("r1");
    let alice = ParticipantId::from("alice");
    let bob = ParticipantId::from("bob");

    rooms.join(&room, alice.clone()).await;
    rooms.join(&room, bob.clone()).await;
    signaling.set_offline(&bob).await;

    let err = rooms
        .route(&room, alice.clone(), answer_to(&bob))
        .await
        .unwrap_err();
    assert_eq!(err, SignalError::ParticipantUnreachable(bob));
}

#[tokio::test]
async fn test_route_without_room() {
    init_tracing();

    let (rooms, _signaling, _signal_rx) = create_test_registry();

    let err = rooms
        .route(&RoomId::from("ghost"), "alice".into(), answer_to(&"bob".into()))
        .await
        .unwrap_err();
    assert_eq!(err, SignalError::NotInRoom);
}

#[tokio::test]
async fn test_route_rejects_membership_messages() {
    init_tracing();

    let (rooms, _signaling, _signal_rx) = create_test_registry();
    let room = RoomId::from("r1");
    rooms.join(&room, "alice".into()).await;

    let err = rooms
        .route(
            &room,
            "alice".into(),
            SignalMessage::UserJoined {
                participant_id: "bob".into(),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err, SignalError::NotRoutable("user-joined"));
}
