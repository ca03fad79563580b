#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use peer_negotiator::testing::FakeConnection;
use peer_negotiator::{
    CandidateInit, Negotiator, NegotiatorOptions, PeerEvent, SignalMessage, telemetry,
};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{sleep, timeout};

pub const WAIT: Duration = Duration::from_secs(2);

pub struct Harness {
    pub negotiator: Negotiator,
    pub fake: Arc<FakeConnection>,
    pub events: UnboundedReceiver<PeerEvent>,
}

pub async fn start(name: &str, options: NegotiatorOptions) -> Harness {
    telemetry::init_test_tracing();
    let fake = FakeConnection::new(name);
    let negotiator = Negotiator::new(fake.clone(), options);
    let events = negotiator.subscribe();
    negotiator.start().await;
    Harness {
        negotiator,
        fake,
        events,
    }
}

pub async fn next_event(events: &mut UnboundedReceiver<PeerEvent>) -> PeerEvent {
    timeout(WAIT, events.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event stream closed")
}

pub async fn next_signal(events: &mut UnboundedReceiver<PeerEvent>) -> SignalMessage {
    loop {
        if let PeerEvent::Signal(message) = next_event(events).await {
            return message;
        }
    }
}

/// Events already emitted, without waiting for more.
pub fn drain(events: &mut UnboundedReceiver<PeerEvent>) -> Vec<PeerEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

pub async fn eventually(mut condition: impl FnMut() -> bool) {
    timeout(WAIT, async {
        while !condition() {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not met in time");
}

/// Gives the event driver time to work through anything already queued.
pub async fn settle() {
    sleep(Duration::from_millis(50)).await;
}

pub fn candidate(n: u32) -> CandidateInit {
    CandidateInit::new(format!(
        "candidate:{n} 1 udp 2122260223 192.168.1.{n} 5000{n} typ host"
    ))
    .with_mline_index(0)
    .with_mid("0")
}
