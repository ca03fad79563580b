mod common;

use common::{Harness, candidate, next_event, next_signal, start};
use peer_negotiator::testing::FakeCall;
use peer_negotiator::{
    ConnectionState, DataChannel, NegotiationState, NegotiatorOptions, PeerEvent, SdpType,
    SignalMessage,
};

/// Pumps one signal from `from` into `to`, returning what was relayed.
async fn relay(from: &mut Harness, to: &Harness) -> SignalMessage {
    let message = next_signal(&mut from.events).await;
    let wire = message.to_json().unwrap();
    to.negotiator.signal_json(&wire).await.unwrap();
    message
}

#[tokio::test]
async fn offer_answer_and_candidates_between_two_peers() {
    let mut alice = start("alice", NegotiatorOptions::initiator().channel_name("data")).await;
    let mut bob = start("bob", NegotiatorOptions::responder()).await;

    // bob trickles a candidate before alice has offered; alice gets it early
    bob.fake.emit_candidate(Some(candidate(20)));
    let early = next_signal(&mut bob.events).await;
    alice.negotiator.signal(early).await;
    assert_eq!(alice.negotiator.pending_candidates(), 1);

    alice.fake.negotiation_needed();
    let offer = relay(&mut alice, &bob).await;
    assert_eq!(offer.kind(), "offer");

    alice.fake.emit_candidate(Some(candidate(10)));
    alice.fake.emit_candidate(None);
    relay(&mut alice, &bob).await;

    let answer = relay(&mut bob, &alice).await;
    assert_eq!(answer.kind(), "answer");

    assert_eq!(alice.negotiator.state(), NegotiationState::Stable);
    assert_eq!(bob.negotiator.state(), NegotiationState::Stable);
    assert_eq!(alice.fake.applied_candidates(), vec![candidate(20)]);
    assert_eq!(bob.fake.applied_candidates(), vec![candidate(10)]);
    assert_eq!(
        bob.fake.local_description().map(|d| d.sdp_type),
        Some(SdpType::Answer)
    );

    alice.fake.set_connection_state(ConnectionState::Connected);
    bob.fake.set_connection_state(ConnectionState::Connected);
    assert!(matches!(next_event(&mut alice.events).await, PeerEvent::Connect));
    assert!(matches!(next_event(&mut bob.events).await, PeerEvent::Connect));
}

#[tokio::test]
async fn responder_triggered_renegotiation_round() {
    let mut alice = start("alice", NegotiatorOptions::initiator()).await;
    let mut bob = start("bob", NegotiatorOptions::responder()).await;

    alice.fake.negotiation_needed();
    relay(&mut alice, &bob).await;
    relay(&mut bob, &alice).await;
    assert_eq!(alice.negotiator.state(), NegotiationState::Stable);

    // bob adds a track; only alice may offer, so bob asks
    bob.fake.negotiation_needed();
    let request = relay(&mut bob, &alice).await;
    assert_eq!(request, SignalMessage::renegotiate());

    let offer = relay(&mut alice, &bob).await;
    assert_eq!(offer.kind(), "offer");
    assert_eq!(bob.negotiator.state(), NegotiationState::Stable);
    let answer = relay(&mut bob, &alice).await;
    assert_eq!(answer.kind(), "answer");

    assert_eq!(alice.negotiator.state(), NegotiationState::Stable);
    assert_eq!(
        alice
            .fake
            .count(|call| matches!(call, FakeCall::CreateOffer { .. })),
        2
    );
    assert_eq!(
        bob.fake
            .count(|call| matches!(call, FakeCall::CreateOffer { .. })),
        0
    );
}

#[tokio::test]
async fn data_flows_once_the_responder_adopts_the_channel() {
    let mut alice = start("alice", NegotiatorOptions::initiator().channel_name("chat")).await;
    let mut bob = start("bob", NegotiatorOptions::responder()).await;

    let alice_channel = alice.fake.channels()[0].clone();
    let bob_channel = bob.fake.announce_channel(alice.negotiator.channel_name().unwrap());
    let negotiator = bob.negotiator.clone();
    common::eventually(move || negotiator.has_data_channel()).await;

    // the fakes are not wired together, so carry payloads across by hand
    assert!(alice.negotiator.send("ping").await);
    for payload in alice_channel.sent() {
        bob_channel.deliver(payload);
    }
    match next_event(&mut bob.events).await {
        PeerEvent::Data(payload) => assert_eq!(payload.as_text(), Some("ping")),
        other => panic!("expected data, got {other:?}"),
    }

    assert!(bob.negotiator.send("pong").await);
    for payload in bob_channel.sent() {
        alice_channel.deliver(payload);
    }
    match next_event(&mut alice.events).await {
        PeerEvent::Data(payload) => assert_eq!(payload.as_text(), Some("pong")),
        other => panic!("expected data, got {other:?}"),
    }

    alice.negotiator.destroy().await;
    assert!(matches!(next_event(&mut alice.events).await, PeerEvent::Close));
    assert_eq!(alice_channel.state(), peer_negotiator::ChannelState::Closed);
}
