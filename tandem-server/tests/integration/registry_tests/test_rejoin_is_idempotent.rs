use tandem_core::{ParticipantId, RoomId};

use crate::integration::{create_test_registry, init_tracing};

#[tokio::test]
async fn test_rejoin_is_idempotent() {
    init_tracing();

    let (rooms, signaling, _signal_rx) = create_test_registry();
    let room = RoomId::from("r1");
    let alice = ParticipantId::from("alice");
    let bob = ParticipantId::from("bob");

    rooms.join(&room, alice.clone()).await;
    rooms.join(&room, bob.clone()).await;
    let again = rooms.join(&room, bob.clone()).await;

    assert_eq!(again, vec![alice.clone()]);
    assert_eq!(rooms.members(&room).await, vec![alice.clone(), bob]);
    assert_eq!(signaling.delivered_to(&alice).await.len(), 1);
}

#[tokio::test]
async fn test_leave_of_stranger_is_noop() {
    init_tracing();

    let (rooms, signaling, _signal_rx) = create_test_registry();
    let room = RoomId::from("r1");

    rooms.join(&room, "alice".into()).await;
    rooms.leave(&room, "mallory".into()).await;
    rooms.leave(&RoomId::from("nowhere"), "alice".into()).await;

    assert!(rooms.contains_room(&room));
    assert_eq!(signaling.total().await, 0);
}
