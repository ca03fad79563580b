//! In-memory [`PeerConnection`] for tests.
//!
//! `FakeConnection` records every call, produces deterministic SDP, lets a
//! test raise connection events by hand, and can be scripted to fail or to
//! suspend a given operation until released.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::config::{AnswerOptions, ChannelConfig, OfferOptions};
use crate::connection::{
    ChannelErrorHandler, ChannelMessageHandler, ChannelState, ConnectionEvent,
    ConnectionEventHandler, ConnectionState, DataChannel, DataPayload, PeerConnection,
};
use crate::error::ConnectionError;
use crate::media::{MediaStream, MediaTrack};
use crate::signal::{CandidateInit, SdpType, SessionDescription};
use crate::stats::RawStatsReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FakeOperation {
    CreateOffer,
    CreateAnswer,
    SetLocalDescription,
    SetRemoteDescription,
    AddIceCandidate,
    AddTrack,
    CreateDataChannel,
    GetStats,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeCall {
    CreateOffer { ice_restart: bool },
    CreateAnswer,
    SetLocalDescription(SdpType),
    SetRemoteDescription(SdpType),
    AddIceCandidate(CandidateInit),
    AddTrack { track: String, stream: String },
    CreateDataChannel { label: String, negotiated: bool },
    GetStats,
    Close,
}

pub struct FakeConnection {
    name: String,
    calls: Mutex<Vec<FakeCall>>,
    handler: Mutex<Option<ConnectionEventHandler>>,
    local: Mutex<Option<SessionDescription>>,
    remote: Mutex<Option<SessionDescription>>,
    state: Mutex<ConnectionState>,
    channels: Mutex<Vec<Arc<FakeDataChannel>>>,
    failures: Mutex<HashSet<FakeOperation>>,
    gates: Mutex<HashMap<FakeOperation, Arc<Notify>>>,
    stats: Mutex<Vec<RawStatsReport>>,
    version: AtomicU64,
}

impl FakeConnection {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            calls: Mutex::new(Vec::new()),
            handler: Mutex::new(None),
            local: Mutex::new(None),
            remote: Mutex::new(None),
            state: Mutex::new(ConnectionState::New),
            channels: Mutex::new(Vec::new()),
            failures: Mutex::new(HashSet::new()),
            gates: Mutex::new(HashMap::new()),
            stats: Mutex::new(Vec::new()),
            version: AtomicU64::new(0),
        })
    }

    pub fn calls(&self) -> Vec<FakeCall> {
        self.calls.lock().clone()
    }

    pub fn count(&self, matches: impl Fn(&FakeCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|call| matches(call)).count()
    }

    pub fn applied_candidates(&self) -> Vec<CandidateInit> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                FakeCall::AddIceCandidate(candidate) => Some(candidate.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn local_description(&self) -> Option<SessionDescription> {
        self.local.lock().clone()
    }

    pub fn channels(&self) -> Vec<Arc<FakeDataChannel>> {
        self.channels.lock().clone()
    }

    pub fn has_handler(&self) -> bool {
        self.handler.lock().is_some()
    }

    /// The next call of `operation` fails with [`ConnectionError::Rejected`].
    pub fn fail_next(&self, operation: FakeOperation) {
        self.failures.lock().insert(operation);
    }

    /// The next call of `operation` suspends until [`FakeConnection::resume`].
    pub fn pause(&self, operation: FakeOperation) {
        self.gates
            .lock()
            .insert(operation, Arc::new(Notify::new()));
    }

    pub fn resume(&self, operation: FakeOperation) {
        let gate = self.gates.lock().get(&operation).cloned();
        if let Some(gate) = gate {
            gate.notify_one();
        }
    }

    pub fn set_stats(&self, reports: Vec<RawStatsReport>) {
        *self.stats.lock() = reports;
    }

    /// Raises `event` on the registered handler, as the real stack would.
    pub fn emit(&self, event: ConnectionEvent) {
        let handler = self.handler.lock().clone();
        if let Some(handler) = handler {
            handler(event);
        }
    }

    pub fn emit_candidate(&self, candidate: Option<CandidateInit>) {
        self.emit(ConnectionEvent::IceCandidate(candidate));
    }

    pub fn negotiation_needed(&self) {
        self.emit(ConnectionEvent::NegotiationNeeded);
    }

    pub fn set_connection_state(&self, state: ConnectionState) {
        *self.state.lock() = state;
        self.emit(ConnectionEvent::ConnectionStateChange(state));
    }

    pub fn emit_track(&self, track: MediaTrack) {
        self.emit(ConnectionEvent::Track(track));
    }

    /// Announces a data channel opened by the remote side.
    pub fn announce_channel(&self, label: impl Into<String>) -> Arc<FakeDataChannel> {
        let channel = FakeDataChannel::new(label);
        self.emit(ConnectionEvent::DataChannel(
            Arc::clone(&channel) as Arc<dyn DataChannel>
        ));
        channel
    }

    async fn enter(&self, operation: FakeOperation, call: FakeCall) -> Result<(), ConnectionError> {
        self.calls.lock().push(call);
        let gate = self.gates.lock().get(&operation).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
            self.gates.lock().remove(&operation);
        }
        if self.failures.lock().remove(&operation) {
            return Err(ConnectionError::Rejected(format!(
                "{}: scripted {operation:?} failure",
                self.name
            )));
        }
        if *self.state.lock() == ConnectionState::Closed {
            return Err(ConnectionError::Closed);
        }
        Ok(())
    }

    fn sdp(&self, sdp_type: SdpType) -> String {
        let version = self.version.fetch_add(1, Ordering::Relaxed);
        format!(
            "v=0\r\no=- {} {version} IN IP4 127.0.0.1\r\ns={}\r\nt=0 0\r\na=type:{sdp_type}\r\n",
            self.name, self.name
        )
    }
}

#[async_trait]
impl PeerConnection for FakeConnection {
    async fn create_offer(
        &self,
        options: &OfferOptions,
    ) -> Result<SessionDescription, ConnectionError> {
        self.enter(
            FakeOperation::CreateOffer,
            FakeCall::CreateOffer {
                ice_restart: options.ice_restart,
            },
        )
        .await?;
        Ok(SessionDescription::offer(self.sdp(SdpType::Offer)))
    }

    async fn create_answer(
        &self,
        _options: &AnswerOptions,
    ) -> Result<SessionDescription, ConnectionError> {
        self.enter(FakeOperation::CreateAnswer, FakeCall::CreateAnswer)
            .await?;
        let has_remote_offer = self
            .remote
            .lock()
            .as_ref()
            .is_some_and(|remote| remote.sdp_type == SdpType::Offer);
        if !has_remote_offer {
            return Err(ConnectionError::InvalidState(
                "create_answer without a remote offer".into(),
            ));
        }
        Ok(SessionDescription::answer(self.sdp(SdpType::Answer)))
    }

    async fn set_local_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), ConnectionError> {
        self.enter(
            FakeOperation::SetLocalDescription,
            FakeCall::SetLocalDescription(description.sdp_type),
        )
        .await?;
        *self.local.lock() = Some(description);
        Ok(())
    }

    async fn set_remote_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), ConnectionError> {
        self.enter(
            FakeOperation::SetRemoteDescription,
            FakeCall::SetRemoteDescription(description.sdp_type),
        )
        .await?;
        *self.remote.lock() = Some(description);
        Ok(())
    }

    async fn remote_description(&self) -> Option<SessionDescription> {
        self.remote.lock().clone()
    }

    async fn add_ice_candidate(&self, candidate: CandidateInit) -> Result<(), ConnectionError> {
        self.enter(
            FakeOperation::AddIceCandidate,
            FakeCall::AddIceCandidate(candidate),
        )
        .await
    }

    async fn add_track(
        &self,
        track: &MediaTrack,
        stream: &MediaStream,
    ) -> Result<(), ConnectionError> {
        self.enter(
            FakeOperation::AddTrack,
            FakeCall::AddTrack {
                track: track.id().to_string(),
                stream: stream.id().to_string(),
            },
        )
        .await
    }

    async fn create_data_channel(
        &self,
        label: &str,
        config: &ChannelConfig,
    ) -> Result<Arc<dyn DataChannel>, ConnectionError> {
        self.enter(
            FakeOperation::CreateDataChannel,
            FakeCall::CreateDataChannel {
                label: label.to_string(),
                negotiated: config.negotiated,
            },
        )
        .await?;
        let channel = FakeDataChannel::new(label);
        self.channels.lock().push(Arc::clone(&channel));
        Ok(channel as Arc<dyn DataChannel>)
    }

    async fn get_stats(&self) -> Result<Vec<RawStatsReport>, ConnectionError> {
        self.enter(FakeOperation::GetStats, FakeCall::GetStats).await?;
        Ok(self.stats.lock().clone())
    }

    fn on_event(&self, handler: ConnectionEventHandler) {
        *self.handler.lock() = Some(handler);
    }

    fn connection_state(&self) -> ConnectionState {
        *self.state.lock()
    }

    async fn close(&self) -> Result<(), ConnectionError> {
        self.calls.lock().push(FakeCall::Close);
        *self.state.lock() = ConnectionState::Closed;
        let channels = self.channels.lock().clone();
        for channel in channels {
            channel.set_state(ChannelState::Closed);
        }
        Ok(())
    }
}

/// Data channel half of the fake. Starts open.
pub struct FakeDataChannel {
    label: String,
    state: Mutex<ChannelState>,
    sent: Mutex<Vec<DataPayload>>,
    on_message: Mutex<Option<Arc<dyn Fn(DataPayload) + Send + Sync>>>,
    on_error: Mutex<Option<Arc<dyn Fn(ConnectionError) + Send + Sync>>>,
}

impl FakeDataChannel {
    pub fn new(label: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            label: label.into(),
            state: Mutex::new(ChannelState::Open),
            sent: Mutex::new(Vec::new()),
            on_message: Mutex::new(None),
            on_error: Mutex::new(None),
        })
    }

    pub fn sent(&self) -> Vec<DataPayload> {
        self.sent.lock().clone()
    }

    pub fn set_state(&self, state: ChannelState) {
        *self.state.lock() = state;
    }

    pub fn is_wired(&self) -> bool {
        self.on_message.lock().is_some() && self.on_error.lock().is_some()
    }

    /// Delivers `payload` as if it arrived from the remote side.
    pub fn deliver(&self, payload: impl Into<DataPayload>) {
        let handler = self.on_message.lock().clone();
        if let Some(handler) = handler {
            handler(payload.into());
        }
    }

    pub fn fail(&self, err: ConnectionError) {
        let handler = self.on_error.lock().clone();
        if let Some(handler) = handler {
            handler(err);
        }
    }
}

#[async_trait]
impl DataChannel for FakeDataChannel {
    fn label(&self) -> String {
        self.label.clone()
    }

    fn state(&self) -> ChannelState {
        *self.state.lock()
    }

    async fn send(&self, payload: DataPayload) -> Result<(), ConnectionError> {
        if *self.state.lock() != ChannelState::Open {
            return Err(ConnectionError::Closed);
        }
        self.sent.lock().push(payload);
        Ok(())
    }

    fn on_message(&self, handler: ChannelMessageHandler) {
        *self.on_message.lock() = Some(Arc::from(handler));
    }

    fn on_error(&self, handler: ChannelErrorHandler) {
        *self.on_error.lock() = Some(Arc::from(handler));
    }

    async fn close(&self) -> Result<(), ConnectionError> {
        self.set_state(ChannelState::Closed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn answer_requires_remote_offer() {
        let fake = FakeConnection::new("a");
        let err = fake
            .create_answer(&AnswerOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectionError::InvalidState(_)));

        fake.set_remote_description(SessionDescription::offer("v=0"))
            .await
            .unwrap();
        let answer = fake.create_answer(&AnswerOptions::default()).await.unwrap();
        assert_eq!(answer.sdp_type, SdpType::Answer);
    }

    #[tokio::test]
    async fn scripted_failures_apply_once() {
        let fake = FakeConnection::new("a");
        fake.fail_next(FakeOperation::CreateOffer);
        assert!(fake.create_offer(&OfferOptions::default()).await.is_err());
        assert!(fake.create_offer(&OfferOptions::default()).await.is_ok());
        assert_eq!(
            fake.count(|call| matches!(call, FakeCall::CreateOffer { .. })),
            2
        );
    }

    #[tokio::test]
    async fn close_closes_channels() {
        let fake = FakeConnection::new("a");
        let channel = fake
            .create_data_channel("chat", &ChannelConfig::default())
            .await
            .unwrap();
        assert_eq!(channel.state(), ChannelState::Open);
        fake.close().await.unwrap();
        assert_eq!(channel.state(), ChannelState::Closed);
        assert_eq!(fake.connection_state(), ConnectionState::Closed);
    }
}
