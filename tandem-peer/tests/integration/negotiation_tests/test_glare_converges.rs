use crate::integration::{create_test_controller, init_tracing};
use crate::utils::AdapterCall;
use tandem_core::SignalMessage;
use tandem_peer::{NegotiationState, SdpKind, SessionRole};

#[tokio::test]
async fn test_glare_converges() {
    init_tracing();

    // Both delivery orders of the crossing offers must end the same way.
    for impolite_hears_first in [true, false] {
        let mut alice = create_test_controller("alice", "bob");
        let mut bob = create_test_controller("bob", "alice");
        assert!(!alice.controller.is_polite());
        assert!(bob.controller.is_polite());

        alice.controller.start_negotiation().await.unwrap();
        bob.controller.start_negotiation().await.unwrap();
        assert_eq!(alice.controller.state(), NegotiationState::HaveLocalOffer);
        assert_eq!(bob.controller.state(), NegotiationState::HaveLocalOffer);

        let alice_offer = alice.sent().remove(0).with_sender("alice".into());
        let bob_offer = bob.sent().remove(0).with_sender("bob".into());
        assert_eq!(alice_offer.kind(), "call-user");
        assert_eq!(bob_offer.kind(), "call-user");

        if impolite_hears_first {
            alice.controller.handle_signal(bob_offer).await.unwrap();
            bob.controller.handle_signal(alice_offer).await.unwrap();
        } else {
            bob.controller.handle_signal(alice_offer).await.unwrap();
            alice.controller.handle_signal(bob_offer).await.unwrap();
        }

        // Alice (impolite) ignored Bob's offer; Bob rolled back and answered.
        assert_eq!(alice.controller.state(), NegotiationState::HaveLocalOffer);
        assert_eq!(bob.controller.state(), NegotiationState::Stable);
        assert_eq!(bob.controller.role(), Some(SessionRole::Caller));
        assert!(alice.sent().is_empty());

        let mut bob_sent = bob.sent();
        assert_eq!(bob_sent.len(), 1);
        let answer = bob_sent.remove(0);
        let SignalMessage::Answer {
            ref to_participant_id,
            ..
        } = answer
        else {
            panic!("expected an answer, got {:?}", answer);
        };
        assert_eq!(to_participant_id.as_str(), "alice");

        alice
            .controller
            .handle_signal(answer.with_sender("bob".into()))
            .await
            .unwrap();
        assert_eq!(alice.controller.state(), NegotiationState::Stable);

        // Exactly one applied pair: Alice's offer and Bob's answer.
        let alice_remote: Vec<_> = alice
            .adapter
            .calls()
            .await
            .into_iter()
            .filter_map(|c| match c {
                AdapterCall::ApplyRemote(d) => Some(d),
                _ => None,
            })
            .collect();
        assert_eq!(alice_remote.len(), 1);
        assert_eq!(alice_remote[0].kind, SdpKind::Answer);
        assert!(alice_remote[0].sdp.starts_with("answer:bob:"));

        let bob_remote: Vec<_> = bob
            .adapter
            .calls()
            .await
            .into_iter()
            .filter_map(|c| match c {
                AdapterCall::ApplyRemote(d) => Some(d),
                _ => None,
            })
            .collect();
        assert_eq!(bob_remote.len(), 1);
        assert_eq!(bob_remote[0].kind, SdpKind::Offer);
        assert!(bob_remote[0].sdp.starts_with("offer:alice:"));

        assert_eq!(bob.adapter.count(|c| *c == AdapterCall::Rollback).await, 1);
        assert_eq!(alice.adapter.count(|c| *c == AdapterCall::Rollback).await, 0);
    }
}
