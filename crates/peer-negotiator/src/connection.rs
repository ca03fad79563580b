//! The peer connection capability a [`Negotiator`](crate::Negotiator) drives.
//!
//! Production code uses [`RtcConnection`](crate::rtc::RtcConnection) over the
//! `webrtc` stack; tests use [`FakeConnection`](crate::testing::FakeConnection).

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::config::{AnswerOptions, ChannelConfig, OfferOptions};
use crate::error::ConnectionError;
use crate::media::{MediaStream, MediaTrack};
use crate::signal::{CandidateInit, SessionDescription};
use crate::stats::RawStatsReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IceConnectionState {
    New,
    Checking,
    Connected,
    Completed,
    Disconnected,
    Failed,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalingState {
    Stable,
    HaveLocalOffer,
    HaveRemoteOffer,
    HaveLocalPranswer,
    HaveRemotePranswer,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelState {
    Connecting,
    Open,
    Closing,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataPayload {
    Text(String),
    Binary(Bytes),
}

impl DataPayload {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            DataPayload::Text(text) => Some(text),
            DataPayload::Binary(_) => None,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            DataPayload::Text(text) => text.as_bytes(),
            DataPayload::Binary(bytes) => bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<&str> for DataPayload {
    fn from(text: &str) -> Self {
        DataPayload::Text(text.to_string())
    }
}

impl From<String> for DataPayload {
    fn from(text: String) -> Self {
        DataPayload::Text(text)
    }
}

impl From<Vec<u8>> for DataPayload {
    fn from(bytes: Vec<u8>) -> Self {
        DataPayload::Binary(Bytes::from(bytes))
    }
}

impl From<Bytes> for DataPayload {
    fn from(bytes: Bytes) -> Self {
        DataPayload::Binary(bytes)
    }
}

pub type ChannelMessageHandler = Box<dyn Fn(DataPayload) + Send + Sync>;
pub type ChannelErrorHandler = Box<dyn Fn(ConnectionError) + Send + Sync>;

#[async_trait]
pub trait DataChannel: Send + Sync {
    fn label(&self) -> String;
    fn state(&self) -> ChannelState;
    async fn send(&self, payload: DataPayload) -> Result<(), ConnectionError>;
    /// Replaces any previously registered message handler.
    fn on_message(&self, handler: ChannelMessageHandler);
    /// Replaces any previously registered error handler.
    fn on_error(&self, handler: ChannelErrorHandler);
    async fn close(&self) -> Result<(), ConnectionError>;
}

/// Notifications raised by a peer connection.
pub enum ConnectionEvent {
    NegotiationNeeded,
    /// `None` marks the end of candidate gathering.
    IceCandidate(Option<CandidateInit>),
    IceCandidateError(String),
    ConnectionStateChange(ConnectionState),
    IceConnectionStateChange(IceConnectionState),
    SignalingStateChange(SignalingState),
    Track(MediaTrack),
    DataChannel(Arc<dyn DataChannel>),
}

impl fmt::Debug for ConnectionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionEvent::NegotiationNeeded => f.write_str("NegotiationNeeded"),
            ConnectionEvent::IceCandidate(candidate) => {
                f.debug_tuple("IceCandidate").field(candidate).finish()
            }
            ConnectionEvent::IceCandidateError(message) => {
                f.debug_tuple("IceCandidateError").field(message).finish()
            }
            ConnectionEvent::ConnectionStateChange(state) => {
                f.debug_tuple("ConnectionStateChange").field(state).finish()
            }
            ConnectionEvent::IceConnectionStateChange(state) => f
                .debug_tuple("IceConnectionStateChange")
                .field(state)
                .finish(),
            ConnectionEvent::SignalingStateChange(state) => {
                f.debug_tuple("SignalingStateChange").field(state).finish()
            }
            ConnectionEvent::Track(track) => f.debug_tuple("Track").field(track).finish(),
            ConnectionEvent::DataChannel(channel) => {
                f.debug_tuple("DataChannel").field(&channel.label()).finish()
            }
        }
    }
}

pub type ConnectionEventHandler = Arc<dyn Fn(ConnectionEvent) + Send + Sync>;

#[async_trait]
pub trait PeerConnection: Send + Sync {
    async fn create_offer(
        &self,
        options: &OfferOptions,
    ) -> Result<SessionDescription, ConnectionError>;

    async fn create_answer(
        &self,
        options: &AnswerOptions,
    ) -> Result<SessionDescription, ConnectionError>;

    async fn set_local_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), ConnectionError>;

    async fn set_remote_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), ConnectionError>;

    async fn remote_description(&self) -> Option<SessionDescription>;

    async fn add_ice_candidate(&self, candidate: CandidateInit) -> Result<(), ConnectionError>;

    async fn add_track(
        &self,
        track: &MediaTrack,
        stream: &MediaStream,
    ) -> Result<(), ConnectionError>;

    async fn create_data_channel(
        &self,
        label: &str,
        config: &ChannelConfig,
    ) -> Result<Arc<dyn DataChannel>, ConnectionError>;

    async fn get_stats(&self) -> Result<Vec<RawStatsReport>, ConnectionError>;

    /// Installs the single event sink. Events must be delivered in the order
    /// the connection observes them.
    fn on_event(&self, handler: ConnectionEventHandler);

    fn connection_state(&self) -> ConnectionState;

    async fn close(&self) -> Result<(), ConnectionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_views() {
        let text = DataPayload::from("hi");
        assert_eq!(text.as_text(), Some("hi"));
        assert_eq!(text.len(), 2);

        let binary = DataPayload::from(vec![1u8, 2, 3]);
        assert_eq!(binary.as_text(), None);
        assert_eq!(binary.as_bytes(), &[1, 2, 3]);
        assert!(!binary.is_empty());
    }
}
