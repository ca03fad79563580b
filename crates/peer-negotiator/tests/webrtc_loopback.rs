//! Two negotiators over the real `webrtc` stack on localhost.
//!
//! Sandboxed CI hosts often cannot gather host candidates; the test logs
//! and returns instead of failing when setup or connectivity stalls.

use std::time::Duration;

use peer_negotiator::{
    ConnectionConfig, Negotiator, NegotiatorOptions, PeerEvent, telemetry,
};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::timeout;

const CONNECT_WAIT: Duration = Duration::from_secs(10);

async fn build(options: NegotiatorOptions) -> Option<(Negotiator, UnboundedReceiver<PeerEvent>)> {
    let options = options.connection_config(ConnectionConfig::localhost());
    match Negotiator::with_webrtc(options).await {
        Ok(negotiator) => {
            let events = negotiator.subscribe();
            Some((negotiator, events))
        }
        Err(err) => {
            tracing::warn!(error = %err, "skipping loopback test: setup failed");
            None
        }
    }
}

/// Forwards signals to `peer`; everything else goes to `rest`.
fn pump(
    mut events: UnboundedReceiver<PeerEvent>,
    peer: Negotiator,
    rest: UnboundedSender<PeerEvent>,
) {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                PeerEvent::Signal(message) => {
                    let wire = match message.to_json() {
                        Ok(wire) => wire,
                        Err(_) => continue,
                    };
                    let _ = peer.signal_json(&wire).await;
                }
                other => {
                    if rest.send(other).is_err() {
                        break;
                    }
                }
            }
        }
    });
}

async fn wait_for<F>(events: &mut UnboundedReceiver<PeerEvent>, mut matches: F) -> bool
where
    F: FnMut(&PeerEvent) -> bool,
{
    timeout(CONNECT_WAIT, async {
        while let Some(event) = events.recv().await {
            if matches(&event) {
                return true;
            }
        }
        false
    })
    .await
    .unwrap_or(false)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn webrtc_pair_connects_and_exchanges_data() {
    telemetry::init_test_tracing();

    let Some((alice, alice_events)) =
        build(NegotiatorOptions::initiator().channel_name("loopback")).await
    else {
        return;
    };
    let Some((bob, bob_events)) = build(NegotiatorOptions::responder()).await else {
        alice.destroy().await;
        return;
    };

    let (alice_tx, mut alice_rest) = mpsc::unbounded_channel();
    let (bob_tx, mut bob_rest) = mpsc::unbounded_channel();
    pump(alice_events, bob.clone(), alice_tx);
    pump(bob_events, alice.clone(), bob_tx);

    bob.start().await;
    // opening the initiator's channel triggers the first offer
    alice.start().await;

    let alice_connected = wait_for(&mut alice_rest, |e| matches!(e, PeerEvent::Connect)).await;
    let bob_connected = wait_for(&mut bob_rest, |e| matches!(e, PeerEvent::Connect)).await;
    if !(alice_connected && bob_connected) {
        tracing::warn!("skipping loopback test: peers did not connect");
        alice.destroy().await;
        bob.destroy().await;
        return;
    }

    let mut delivered = false;
    for _ in 0..50 {
        if alice.send("ping").await {
            delivered = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert!(delivered, "initiator channel never opened");

    let got_ping = wait_for(&mut bob_rest, |e| {
        matches!(e, PeerEvent::Data(payload) if payload.as_text() == Some("ping"))
    })
    .await;
    assert!(got_ping, "responder never received data");
    assert!(bob.has_data_channel());

    assert!(bob.send("pong").await);
    let got_pong = wait_for(&mut alice_rest, |e| {
        matches!(e, PeerEvent::Data(payload) if payload.as_text() == Some("pong"))
    })
    .await;
    assert!(got_pong, "initiator never received the reply");

    alice.destroy().await;
    bob.destroy().await;
    assert!(alice.is_destroyed() && bob.is_destroyed());
}
