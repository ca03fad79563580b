//! WebRTC peer negotiation: offer/answer with trickle ICE over an
//! application-owned signaling channel.
//!
//! Exactly one side of a pair is the [`Role::Initiator`]; only it creates
//! offers. The responder asks for renegotiation with a `renegotiate`
//! signal, so the two sides never offer at the same time.
//!
//! ```no_run
//! # async fn run() -> peer_negotiator::Result<()> {
//! use peer_negotiator::{Negotiator, NegotiatorOptions};
//!
//! let negotiator = Negotiator::with_webrtc(NegotiatorOptions::initiator()).await?;
//! negotiator.on_signal(|message| {
//!     // hand `message.to_json()` to the remote peer
//!     let _ = message;
//! });
//! negotiator.start().await;
//! # Ok(())
//! # }
//! ```

pub mod candidates;
pub mod config;
pub mod connection;
pub mod error;
pub mod events;
pub mod media;
pub mod negotiator;
pub mod rtc;
pub mod signal;
pub mod state;
pub mod stats;
pub mod telemetry;
pub mod testing;

pub use candidates::{Admission, CandidateBuffer};
pub use config::{
    AnswerOptions, ChannelConfig, ConnectionConfig, IceServer, IceTransportPolicy,
    NegotiatorOptions, NegotiatorOptionsBuilder, OfferOptions, Role,
};
pub use connection::{
    ChannelState, ConnectionEvent, ConnectionEventHandler, ConnectionState, DataChannel,
    DataPayload, IceConnectionState, PeerConnection, SignalingState,
};
pub use error::{ConnectionError, NegotiatorError, Result};
pub use events::{EventEmitter, ListenerId, PeerEvent, PeerEventKind};
pub use media::{MediaStream, MediaTrack, TrackKind};
pub use negotiator::Negotiator;
pub use rtc::{RtcConnection, RtcDataChannel};
pub use signal::{CandidateInit, SdpType, SessionDescription, SignalMessage};
pub use state::NegotiationState;
pub use stats::{RawStatsReport, StatsReport};
