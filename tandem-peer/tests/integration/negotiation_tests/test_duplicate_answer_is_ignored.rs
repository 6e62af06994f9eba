use crate::integration::{create_test_controller, init_tracing};
use crate::utils::AdapterCall;
use tandem_core::SignalMessage;
use tandem_peer::NegotiationState;

fn answer_from_bob() -> SignalMessage {
    SignalMessage::Answer {
        to_participant_id: "alice".into(),
        sdp: "answer:bob:1|".to_string(),
        from_participant_id: Some("bob".into()),
    }
}

#[tokio::test]
async fn test_duplicate_answer_is_ignored() {
    init_tracing();

    let mut alice = create_test_controller("alice", "bob");
    alice.controller.start_negotiation().await.unwrap();
    alice.controller.handle_signal(answer_from_bob()).await.unwrap();
    assert_eq!(alice.controller.state(), NegotiationState::Stable);
    let calls_before = alice.adapter.calls().await.len();

    alice.controller.handle_signal(answer_from_bob()).await.unwrap();

    assert_eq!(alice.controller.state(), NegotiationState::Stable);
    assert_eq!(alice.adapter.calls().await.len(), calls_before);
    assert_eq!(
        alice
            .adapter
            .count(|c| matches!(c, AdapterCall::ApplyRemote(_)))
            .await,
        1
    );
}

#[tokio::test]
async fn test_answer_without_offer_is_ignored() {
    init_tracing();

    let mut alice = create_test_controller("alice", "bob");
    alice.controller.handle_signal(answer_from_bob()).await.unwrap();

    assert_eq!(alice.controller.state(), NegotiationState::Idle);
    assert!(alice.adapter.calls().await.is_empty());
    assert!(alice.sent().is_empty());
}
