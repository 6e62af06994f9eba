use tandem_core::{ParticipantId, RoomId, SignalMessage};

use crate::integration::{create_test_registry, init_tracing};

#[tokio::test]
async fn test_join_broadcasts_user_joined() {
    init_tracing();

    let (rooms, signaling, _signal_rx) = create_test_registry();
    let room = RoomId::from("r1");
    let alice = ParticipantId::from("alice");
    let bob = ParticipantId::from("bob");
    let carol = ParticipantId::from("carol");

    assert!(rooms.join(&room, alice.clone()).await.is_empty());
    assert_eq!(rooms.join(&room, bob.clone()).await, vec![alice.clone()]);

    let existing = rooms.join(&room, carol.clone()).await;
    assert_eq!(existing, vec![alice.clone(), bob.clone()]);

    // Alice hears about both newcomers, Bob only about Carol, Carol about nobody.
    assert_eq!(
        signaling.delivered_to(&alice).await,
        vec![
            SignalMessage::UserJoined {
                participant_id: bob.clone()
            },
            SignalMessage::UserJoined {
                participant_id: carol.clone()
            },
        ]
    );
    assert_eq!(
        signaling.delivered_to(&bob).await,
        vec![SignalMessage::UserJoined {
            participant_id: carol.clone()
        }]
    );
    assert!(signaling.delivered_to(&carol).await.is_empty());
}
