//! [`PeerConnection`] over the `webrtc` crate.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::setting_engine::SettingEngine;
use webrtc::api::{API, APIBuilder};
use webrtc::data_channel::RTCDataChannel;
use webrtc::data_channel::data_channel_init::RTCDataChannelInit;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::data_channel::data_channel_state::RTCDataChannelState;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_connection_state::RTCIceConnectionState;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::offer_answer_options::{RTCAnswerOptions, RTCOfferOptions};
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::policy::ice_transport_policy::RTCIceTransportPolicy;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::signaling_state::RTCSignalingState;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_remote::TrackRemote;

use crate::config::{
    AnswerOptions, ChannelConfig, ConnectionConfig, IceTransportPolicy, NegotiatorOptions,
    OfferOptions,
};
use crate::connection::{
    ChannelErrorHandler, ChannelMessageHandler, ChannelState, ConnectionEvent,
    ConnectionEventHandler, ConnectionState, DataChannel, DataPayload, IceConnectionState,
    PeerConnection, SignalingState,
};
use crate::error::{ConnectionError, NegotiatorError, Result};
use crate::media::{MediaStream, MediaTrack, TrackKind};
use crate::negotiator::Negotiator;
use crate::signal::{CandidateInit, SdpType, SessionDescription};
use crate::stats::RawStatsReport;

impl From<webrtc::Error> for ConnectionError {
    fn from(err: webrtc::Error) -> Self {
        match err {
            webrtc::Error::ErrConnectionClosed => ConnectionError::Closed,
            other => ConnectionError::Rejected(other.to_string()),
        }
    }
}

fn to_setup_error<E: std::fmt::Display>(err: E) -> NegotiatorError {
    NegotiatorError::Setup(err.to_string())
}

fn build_api(setting: SettingEngine) -> Result<API> {
    let mut media_engine = MediaEngine::default();
    media_engine
        .register_default_codecs()
        .map_err(to_setup_error)?;

    let mut registry = Registry::new();
    registry =
        register_default_interceptors(registry, &mut media_engine).map_err(to_setup_error)?;

    Ok(APIBuilder::new()
        .with_setting_engine(setting)
        .with_media_engine(media_engine)
        .with_interceptor_registry(registry)
        .build())
}

fn rtc_configuration(config: &ConnectionConfig) -> RTCConfiguration {
    RTCConfiguration {
        ice_servers: config
            .ice_servers
            .iter()
            .map(|server| RTCIceServer {
                urls: server.urls.clone(),
                username: server.username.clone(),
                credential: server.credential.clone(),
                ..Default::default()
            })
            .collect(),
        ice_transport_policy: match config.ice_transport_policy {
            IceTransportPolicy::All => RTCIceTransportPolicy::All,
            IceTransportPolicy::Relay => RTCIceTransportPolicy::Relay,
        },
        ..Default::default()
    }
}

/// Local track source handed to [`MediaTrack::with_native`].
#[derive(Clone)]
pub struct LocalTrack(pub Arc<dyn TrackLocal + Send + Sync>);

/// Remote track carried by `Stream` events.
#[derive(Clone)]
pub struct RemoteTrack(pub Arc<TrackRemote>);

pub fn local_track(track: Arc<dyn TrackLocal + Send + Sync>) -> MediaTrack {
    let id = track.id().to_string();
    let kind = track_kind(track.kind());
    MediaTrack::new(id, kind).with_native(LocalTrack(track))
}

pub fn remote_track(track: &MediaTrack) -> Option<Arc<TrackRemote>> {
    track.native::<RemoteTrack>().map(|remote| Arc::clone(&remote.0))
}

fn track_kind(kind: RTPCodecType) -> TrackKind {
    match kind {
        RTPCodecType::Audio => TrackKind::Audio,
        _ => TrackKind::Video,
    }
}

pub struct RtcConnection {
    pc: Arc<RTCPeerConnection>,
}

impl RtcConnection {
    pub async fn new(config: &ConnectionConfig) -> Result<Self> {
        Self::with_setting_engine(config, SettingEngine::default()).await
    }

    pub async fn with_setting_engine(
        config: &ConnectionConfig,
        setting: SettingEngine,
    ) -> Result<Self> {
        let api = build_api(setting)?;
        tracing::trace!(
            target = "negotiator::rtc",
            await = "api.new_peer_connection",
            state = "start"
        );
        let pc_result = api.new_peer_connection(rtc_configuration(config)).await;
        tracing::trace!(
            target = "negotiator::rtc",
            await = "api.new_peer_connection",
            state = "end",
            ok = pc_result.is_ok()
        );
        let pc = pc_result.map_err(to_setup_error)?;
        Ok(Self { pc: Arc::new(pc) })
    }

    pub fn from_peer_connection(pc: Arc<RTCPeerConnection>) -> Self {
        Self { pc }
    }

    pub fn peer_connection(&self) -> &Arc<RTCPeerConnection> {
        &self.pc
    }
}

impl Negotiator {
    /// Builds an [`RtcConnection`] from `options.connection_config` and a
    /// negotiator on top of it. The negotiator still has to be started.
    pub async fn with_webrtc(options: NegotiatorOptions) -> Result<Self> {
        let connection = match RtcConnection::new(&options.connection_config).await {
            Ok(connection) => connection,
            Err(err) => {
                tracing::warn!(
                    target = "negotiator::rtc",
                    error = %err,
                    "peer connection setup failed"
                );
                return Err(err);
            }
        };
        Ok(Negotiator::new(Arc::new(connection), options))
    }
}

fn to_rtc_description(
    description: SessionDescription,
) -> std::result::Result<RTCSessionDescription, ConnectionError> {
    let result = match description.sdp_type {
        SdpType::Offer => RTCSessionDescription::offer(description.sdp),
        SdpType::Answer => RTCSessionDescription::answer(description.sdp),
        SdpType::Pranswer => RTCSessionDescription::pranswer(description.sdp),
        SdpType::Rollback => {
            return Err(ConnectionError::Unsupported(
                "rollback descriptions".to_string(),
            ));
        }
    };
    Ok(result?)
}

fn from_rtc_description(
    description: RTCSessionDescription,
) -> std::result::Result<SessionDescription, ConnectionError> {
    let sdp_type = match description.sdp_type {
        RTCSdpType::Offer => SdpType::Offer,
        RTCSdpType::Answer => SdpType::Answer,
        RTCSdpType::Pranswer => SdpType::Pranswer,
        RTCSdpType::Rollback => SdpType::Rollback,
        RTCSdpType::Unspecified => {
            return Err(ConnectionError::InvalidState(
                "description without a type".to_string(),
            ));
        }
    };
    Ok(SessionDescription::new(sdp_type, description.sdp))
}

fn connection_state(state: RTCPeerConnectionState) -> ConnectionState {
    match state {
        RTCPeerConnectionState::Unspecified | RTCPeerConnectionState::New => ConnectionState::New,
        RTCPeerConnectionState::Connecting => ConnectionState::Connecting,
        RTCPeerConnectionState::Connected => ConnectionState::Connected,
        RTCPeerConnectionState::Disconnected => ConnectionState::Disconnected,
        RTCPeerConnectionState::Failed => ConnectionState::Failed,
        RTCPeerConnectionState::Closed => ConnectionState::Closed,
    }
}

fn ice_connection_state(state: RTCIceConnectionState) -> IceConnectionState {
    match state {
        RTCIceConnectionState::Unspecified | RTCIceConnectionState::New => IceConnectionState::New,
        RTCIceConnectionState::Checking => IceConnectionState::Checking,
        RTCIceConnectionState::Connected => IceConnectionState::Connected,
        RTCIceConnectionState::Completed => IceConnectionState::Completed,
        RTCIceConnectionState::Disconnected => IceConnectionState::Disconnected,
        RTCIceConnectionState::Failed => IceConnectionState::Failed,
        RTCIceConnectionState::Closed => IceConnectionState::Closed,
    }
}

fn signaling_state(state: RTCSignalingState) -> SignalingState {
    match state {
        RTCSignalingState::Unspecified | RTCSignalingState::Stable => SignalingState::Stable,
        RTCSignalingState::HaveLocalOffer => SignalingState::HaveLocalOffer,
        RTCSignalingState::HaveRemoteOffer => SignalingState::HaveRemoteOffer,
        RTCSignalingState::HaveLocalPranswer => SignalingState::HaveLocalPranswer,
        RTCSignalingState::HaveRemotePranswer => SignalingState::HaveRemotePranswer,
        RTCSignalingState::Closed => SignalingState::Closed,
    }
}

fn channel_state(state: RTCDataChannelState) -> ChannelState {
    match state {
        RTCDataChannelState::Unspecified | RTCDataChannelState::Connecting => {
            ChannelState::Connecting
        }
        RTCDataChannelState::Open => ChannelState::Open,
        RTCDataChannelState::Closing => ChannelState::Closing,
        RTCDataChannelState::Closed => ChannelState::Closed,
    }
}

fn candidate_event(candidate: Option<RTCIceCandidate>) -> ConnectionEvent {
    let Some(candidate) = candidate else {
        return ConnectionEvent::IceCandidate(None);
    };
    match candidate.to_json() {
        Ok(init) => ConnectionEvent::IceCandidate(Some(CandidateInit {
            candidate: init.candidate,
            sdp_mline_index: init.sdp_mline_index,
            sdp_mid: init.sdp_mid,
        })),
        Err(err) => ConnectionEvent::IceCandidateError(err.to_string()),
    }
}

fn channel_init(config: &ChannelConfig) -> RTCDataChannelInit {
    RTCDataChannelInit {
        ordered: config.ordered,
        max_packet_life_time: config.max_packet_life_time,
        max_retransmits: config.max_retransmits,
        protocol: config.protocol.clone(),
        negotiated: if config.negotiated {
            Some(config.id.unwrap_or(0))
        } else {
            None
        },
    }
}

/// Flattens one stats entry: `id`, `type` and `timestamp` become report
/// metadata and every other field is kept.
fn raw_stats(id: &str, value: Value) -> RawStatsReport {
    let mut fields = match value {
        Value::Object(fields) => fields,
        other => {
            let mut fields = serde_json::Map::new();
            fields.insert("value".to_string(), other);
            fields
        }
    };
    fields.remove("id");
    let kind = match fields.remove("type") {
        Some(Value::String(kind)) => kind,
        _ => "unknown".to_string(),
    };
    let timestamp = fields
        .remove("timestamp")
        .and_then(|ts| ts.as_f64())
        .unwrap_or_default();
    RawStatsReport::Standard {
        id: id.to_string(),
        kind,
        timestamp,
        fields,
    }
}

#[async_trait]
impl PeerConnection for RtcConnection {
    async fn create_offer(
        &self,
        options: &OfferOptions,
    ) -> std::result::Result<SessionDescription, ConnectionError> {
        let offer = self
            .pc
            .create_offer(Some(RTCOfferOptions {
                voice_activity_detection: options.voice_activity_detection,
                ice_restart: options.ice_restart,
            }))
            .await?;
        from_rtc_description(offer)
    }

    async fn create_answer(
        &self,
        options: &AnswerOptions,
    ) -> std::result::Result<SessionDescription, ConnectionError> {
        let answer = self
            .pc
            .create_answer(Some(RTCAnswerOptions {
                voice_activity_detection: options.voice_activity_detection,
            }))
            .await?;
        from_rtc_description(answer)
    }

    async fn set_local_description(
        &self,
        description: SessionDescription,
    ) -> std::result::Result<(), ConnectionError> {
        let description = to_rtc_description(description)?;
        Ok(self.pc.set_local_description(description).await?)
    }

    async fn set_remote_description(
        &self,
        description: SessionDescription,
    ) -> std::result::Result<(), ConnectionError> {
        let description = to_rtc_description(description)?;
        Ok(self.pc.set_remote_description(description).await?)
    }

    async fn remote_description(&self) -> Option<SessionDescription> {
        let description = self.pc.remote_description().await?;
        from_rtc_description(description).ok()
    }

    async fn add_ice_candidate(
        &self,
        candidate: CandidateInit,
    ) -> std::result::Result<(), ConnectionError> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_mline_index,
            username_fragment: None,
        };
        Ok(self.pc.add_ice_candidate(init).await?)
    }

    async fn add_track(
        &self,
        track: &MediaTrack,
        _stream: &MediaStream,
    ) -> std::result::Result<(), ConnectionError> {
        let Some(local) = track.native::<LocalTrack>() else {
            return Err(ConnectionError::Unsupported(format!(
                "track {} has no local webrtc source",
                track.id()
            )));
        };
        self.pc.add_track(Arc::clone(&local.0)).await?;
        Ok(())
    }

    async fn create_data_channel(
        &self,
        label: &str,
        config: &ChannelConfig,
    ) -> std::result::Result<Arc<dyn DataChannel>, ConnectionError> {
        let dc = self
            .pc
            .create_data_channel(label, Some(channel_init(config)))
            .await?;
        Ok(Arc::new(RtcDataChannel::new(dc)) as Arc<dyn DataChannel>)
    }

    async fn get_stats(&self) -> std::result::Result<Vec<RawStatsReport>, ConnectionError> {
        let report = self.pc.get_stats().await;
        let mut reports = Vec::with_capacity(report.reports.len());
        for (id, stat) in report.reports {
            let value = serde_json::to_value(&stat)
                .map_err(|err| ConnectionError::Rejected(err.to_string()))?;
            reports.push(raw_stats(&id, value));
        }
        Ok(reports)
    }

    fn on_event(&self, handler: ConnectionEventHandler) {
        let sink = Arc::clone(&handler);
        self.pc.on_negotiation_needed(Box::new(move || {
            sink(ConnectionEvent::NegotiationNeeded);
            Box::pin(async {})
        }));

        let sink = Arc::clone(&handler);
        self.pc
            .on_ice_candidate(Box::new(move |candidate: Option<RTCIceCandidate>| {
                sink(candidate_event(candidate));
                Box::pin(async {})
            }));

        let sink = Arc::clone(&handler);
        self.pc.on_peer_connection_state_change(Box::new(
            move |state: RTCPeerConnectionState| {
                sink(ConnectionEvent::ConnectionStateChange(connection_state(
                    state,
                )));
                Box::pin(async {})
            },
        ));

        let sink = Arc::clone(&handler);
        self.pc.on_ice_connection_state_change(Box::new(
            move |state: RTCIceConnectionState| {
                sink(ConnectionEvent::IceConnectionStateChange(
                    ice_connection_state(state),
                ));
                Box::pin(async {})
            },
        ));

        let sink = Arc::clone(&handler);
        self.pc
            .on_signaling_state_change(Box::new(move |state: RTCSignalingState| {
                sink(ConnectionEvent::SignalingStateChange(signaling_state(
                    state,
                )));
                Box::pin(async {})
            }));

        let sink = Arc::clone(&handler);
        self.pc
            .on_track(Box::new(move |track: Arc<TrackRemote>, _receiver, _transceiver| {
                let media = MediaTrack::new(track.id().to_string(), track_kind(track.kind()))
                    .with_native(RemoteTrack(Arc::clone(&track)));
                sink(ConnectionEvent::Track(media));
                Box::pin(async {})
            }));

        let sink = handler;
        self.pc
            .on_data_channel(Box::new(move |dc: Arc<RTCDataChannel>| {
                sink(ConnectionEvent::DataChannel(
                    Arc::new(RtcDataChannel::new(dc)) as Arc<dyn DataChannel>
                ));
                Box::pin(async {})
            }));
    }

    fn connection_state(&self) -> ConnectionState {
        connection_state(self.pc.connection_state())
    }

    async fn close(&self) -> std::result::Result<(), ConnectionError> {
        Ok(self.pc.close().await?)
    }
}

pub struct RtcDataChannel {
    dc: Arc<RTCDataChannel>,
}

impl RtcDataChannel {
    pub fn new(dc: Arc<RTCDataChannel>) -> Self {
        Self { dc }
    }

    pub fn inner(&self) -> &Arc<RTCDataChannel> {
        &self.dc
    }
}

#[async_trait]
impl DataChannel for RtcDataChannel {
    fn label(&self) -> String {
        self.dc.label().to_string()
    }

    fn state(&self) -> ChannelState {
        channel_state(self.dc.ready_state())
    }

    async fn send(&self, payload: DataPayload) -> std::result::Result<(), ConnectionError> {
        match payload {
            DataPayload::Text(text) => self.dc.send_text(text).await?,
            DataPayload::Binary(bytes) => self.dc.send(&bytes).await?,
        };
        Ok(())
    }

    fn on_message(&self, handler: ChannelMessageHandler) {
        self.dc.on_message(Box::new(move |message: DataChannelMessage| {
            let payload = if message.is_string {
                match String::from_utf8(message.data.to_vec()) {
                    Ok(text) => DataPayload::Text(text),
                    Err(_) => DataPayload::Binary(message.data),
                }
            } else {
                DataPayload::Binary(message.data)
            };
            handler(payload);
            Box::pin(async {})
        }));
    }

    fn on_error(&self, handler: ChannelErrorHandler) {
        self.dc.on_error(Box::new(move |err: webrtc::Error| {
            handler(ConnectionError::from(err));
            Box::pin(async {})
        }));
    }

    async fn close(&self) -> std::result::Result<(), ConnectionError> {
        Ok(self.dc.close().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn config_maps_servers_and_policy() {
        let config = ConnectionConfig {
            ice_servers: vec![crate::config::IceServer::with_credentials(
                vec!["turn:t.example:3478".into()],
                "user",
                "pass",
            )],
            ice_transport_policy: IceTransportPolicy::Relay,
        };
        let rtc = rtc_configuration(&config);
        assert_eq!(rtc.ice_servers[0].urls, vec!["turn:t.example:3478"]);
        assert_eq!(rtc.ice_servers[0].username, "user");
        assert_eq!(rtc.ice_transport_policy, RTCIceTransportPolicy::Relay);
    }

    #[test]
    fn negotiated_channels_carry_an_id() {
        let init = channel_init(&ChannelConfig {
            negotiated: true,
            id: Some(3),
            ordered: Some(false),
            ..Default::default()
        });
        assert_eq!(init.negotiated, Some(3));
        assert_eq!(init.ordered, Some(false));
        assert_eq!(channel_init(&ChannelConfig::default()).negotiated, None);
    }

    #[test]
    fn descriptions_round_trip_through_webrtc_types() {
        let rtc = to_rtc_description(SessionDescription::offer("v=0\r\n")).unwrap();
        assert_eq!(rtc.sdp_type, RTCSdpType::Offer);
        let back = from_rtc_description(rtc).unwrap();
        assert_eq!(back, SessionDescription::offer("v=0\r\n"));

        let err = to_rtc_description(SessionDescription::new(SdpType::Rollback, "")).unwrap_err();
        assert!(matches!(err, ConnectionError::Unsupported(_)));
    }

    #[test]
    fn states_map_onto_crate_enums() {
        assert_eq!(
            connection_state(RTCPeerConnectionState::Connected),
            ConnectionState::Connected
        );
        assert_eq!(
            ice_connection_state(RTCIceConnectionState::Unspecified),
            IceConnectionState::New
        );
        assert_eq!(
            signaling_state(RTCSignalingState::HaveRemoteOffer),
            SignalingState::HaveRemoteOffer
        );
        assert_eq!(channel_state(RTCDataChannelState::Open), ChannelState::Open);
    }

    #[test]
    fn stats_entries_split_metadata_from_fields() {
        let raw = raw_stats(
            "T01",
            json!({"id": "T01", "type": "transport", "timestamp": 12.5, "bytes_sent": 9}),
        );
        match raw {
            RawStatsReport::Standard {
                id,
                kind,
                timestamp,
                fields,
            } => {
                assert_eq!(id, "T01");
                assert_eq!(kind, "transport");
                assert_eq!(timestamp, 12.5);
                assert_eq!(fields.get("bytes_sent"), Some(&json!(9)));
                assert!(!fields.contains_key("type"));
            }
            other => panic!("unexpected report {other:?}"),
        }
    }

    #[test]
    fn webrtc_errors_map_to_connection_errors() {
        assert_eq!(
            ConnectionError::from(webrtc::Error::ErrConnectionClosed),
            ConnectionError::Closed
        );
    }

    #[tokio::test]
    async fn builds_a_local_peer_connection() {
        let connection = match RtcConnection::new(&ConnectionConfig::localhost()).await {
            Ok(connection) => connection,
            Err(err) => {
                tracing::trace!(target = "negotiator::rtc", error = %err, "skipping rtc setup test");
                return;
            }
        };
        assert_eq!(connection.connection_state(), ConnectionState::New);
        assert!(connection.remote_description().await.is_none());
        connection.close().await.unwrap();
    }
}
