use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::{Notify, mpsc};
use uuid::Uuid;

use crate::candidates::{Admission, CandidateBuffer};
use crate::config::{AnswerOptions, ChannelConfig, NegotiatorOptions, OfferOptions, Role};
use crate::connection::{
    ChannelState, ConnectionEvent, ConnectionState, DataChannel, DataPayload, PeerConnection,
};
use crate::error::{ConnectionError, NegotiatorError, Result};
use crate::events::{EventEmitter, ListenerId, PeerEvent, PeerEventKind};
use crate::media::{MediaStream, MediaTrack};
use crate::signal::{CandidateInit, SdpType, SessionDescription, SignalMessage};
use crate::state::{Lifecycle, NegotiationState, RoundTracker};
use crate::stats::{self, StatsReport};

enum DriverEvent {
    Connection(ConnectionEvent),
    ChannelError(ConnectionError),
}

/// Drives one side of a WebRTC session: offers, answers, trickled candidates
/// and the data channel, reporting progress as [`PeerEvent`]s.
///
/// Construct with [`Negotiator::new`], register listeners, then call
/// [`Negotiator::start`]. Events the connection raises before `start` are
/// queued, so no signal is lost to a listener registered late.
#[derive(Clone)]
pub struct Negotiator {
    inner: Arc<Inner>,
}

struct Inner {
    role: Role,
    channel_name: Option<String>,
    channel_config: ChannelConfig,
    offer_options: OfferOptions,
    answer_options: AnswerOptions,
    connection: Mutex<Option<Arc<dyn PeerConnection>>>,
    channel: Mutex<Option<Arc<dyn DataChannel>>>,
    candidates: Mutex<CandidateBuffer>,
    rounds: Mutex<RoundTracker>,
    remote_stream: Mutex<Option<Arc<MediaStream>>>,
    local_streams: Mutex<Vec<Arc<MediaStream>>>,
    lifecycle: Lifecycle,
    events: EventEmitter,
    driver_tx: mpsc::UnboundedSender<DriverEvent>,
    driver_rx: Mutex<Option<mpsc::UnboundedReceiver<DriverEvent>>>,
    shutdown: Arc<Notify>,
    started: AtomicBool,
}

impl Negotiator {
    pub fn new(connection: Arc<dyn PeerConnection>, options: NegotiatorOptions) -> Self {
        let NegotiatorOptions {
            role,
            streams,
            connection_config: _,
            channel_config,
            offer_options,
            answer_options,
            channel_name,
            max_pending_candidates,
        } = options;

        let channel_name = (role.is_initiator() || channel_config.negotiated)
            .then(|| channel_name.unwrap_or_else(|| Uuid::new_v4().to_string()));

        let (driver_tx, driver_rx) = mpsc::unbounded_channel();
        let sink = driver_tx.clone();
        connection.on_event(Arc::new(move |event| {
            let _ = sink.send(DriverEvent::Connection(event));
        }));

        tracing::debug!(
            target = "negotiator",
            role = %role,
            channel = ?channel_name,
            "negotiator created"
        );

        Self {
            inner: Arc::new(Inner {
                role,
                channel_name,
                channel_config,
                offer_options,
                answer_options,
                connection: Mutex::new(Some(connection)),
                channel: Mutex::new(None),
                candidates: Mutex::new(CandidateBuffer::new(max_pending_candidates)),
                rounds: Mutex::new(RoundTracker::default()),
                remote_stream: Mutex::new(None),
                local_streams: Mutex::new(streams),
                lifecycle: Lifecycle::default(),
                events: EventEmitter::new(),
                driver_tx,
                driver_rx: Mutex::new(Some(driver_rx)),
                shutdown: Arc::new(Notify::new()),
                started: AtomicBool::new(false),
            }),
        }
    }

    /// Opens the local data channel (initiator, or either side when the
    /// channel is pre-negotiated), adds the tracks of the configured streams
    /// and starts processing connection events. Later calls do nothing.
    pub async fn start(&self) {
        let inner = &self.inner;
        if inner.started.swap(true, Ordering::AcqRel) || inner.lifecycle.is_closing() {
            return;
        }

        inner.open_local_channel().await;

        let streams = std::mem::take(&mut *inner.local_streams.lock());
        for stream in streams {
            inner.add_stream(&stream).await;
        }

        let receiver = inner.driver_rx.lock().take();
        if let Some(receiver) = receiver {
            tokio::spawn(drive(
                Arc::downgrade(inner),
                receiver,
                Arc::clone(&inner.shutdown),
            ));
        }
    }

    /// Feeds a message received from the remote peer. Failures are logged,
    /// never returned.
    pub async fn signal(&self, message: SignalMessage) {
        let inner = &self.inner;
        if inner.lifecycle.is_closing() {
            tracing::debug!(
                target = "negotiator",
                kind = message.kind(),
                "ignoring signal after destroy"
            );
            return;
        }

        match message {
            SignalMessage::Renegotiate { renegotiate } => {
                if !renegotiate {
                    return;
                }
                if inner.role.is_initiator() {
                    tracing::debug!(target = "negotiator", "remote requested renegotiation");
                    inner.create_offer().await;
                } else {
                    tracing::debug!(
                        target = "negotiator",
                        role = %inner.role,
                        "ignoring renegotiate request"
                    );
                }
            }
            SignalMessage::Candidate { candidate } => inner.receive_candidate(candidate).await,
            SignalMessage::Offer { sdp } => {
                inner
                    .receive_description(SessionDescription::offer(sdp))
                    .await
            }
            SignalMessage::Answer { sdp } => {
                inner
                    .receive_description(SessionDescription::answer(sdp))
                    .await
            }
        }
    }

    /// Decodes `text` as a [`SignalMessage`] and feeds it. Only decoding
    /// failures are returned.
    pub async fn signal_json(&self, text: &str) -> Result<()> {
        let message = SignalMessage::from_json(text)?;
        self.signal(message).await;
        Ok(())
    }

    /// Sends over the data channel. Returns `false` when there is no open
    /// channel or the channel refused the payload.
    pub async fn send(&self, payload: impl Into<DataPayload>) -> bool {
        let payload = payload.into();
        let channel = self.inner.channel.lock().clone();
        let Some(channel) = channel else {
            tracing::debug!(target = "negotiator", "send without data channel; dropped");
            return false;
        };
        let state = channel.state();
        if state != ChannelState::Open {
            tracing::debug!(
                target = "negotiator",
                state = ?state,
                "data channel not open; dropped"
            );
            return false;
        }
        match channel.send(payload).await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(target = "negotiator", error = %err, "data channel send failed");
                false
            }
        }
    }

    /// Starts a new round: an offer from the initiator, a renegotiate
    /// request from the responder.
    pub async fn negotiate(&self) {
        if self.inner.lifecycle.is_closing() {
            return;
        }
        self.inner.renegotiate().await;
    }

    pub async fn add_stream(&self, stream: Arc<MediaStream>) {
        if self.inner.lifecycle.is_closing() {
            return;
        }
        self.inner.add_stream(&stream).await;
    }

    /// Closes the channel and connection and releases every reference.
    /// Emits `Close` unless it was already emitted. Idempotent.
    pub async fn destroy(&self) {
        let inner = &self.inner;
        if !inner.lifecycle.begin_destroy() {
            return;
        }
        tracing::debug!(target = "negotiator", role = %inner.role, "destroying negotiator");
        inner.shutdown.notify_one();

        let (connection, channel) = inner.take_resources();
        inner.remote_stream.lock().take();
        inner.local_streams.lock().clear();
        inner.close_resources(connection, channel).await;

        inner.lifecycle.finish_destroy();
        inner.emit_close();
    }

    /// Collects statistics in the background and hands them to `callback`.
    /// The result is dropped if the negotiator is destroyed in the meantime.
    pub fn get_stats<F>(&self, callback: F)
    where
        F: FnOnce(Result<Vec<StatsReport>>) + Send + 'static,
    {
        let negotiator = self.clone();
        tokio::spawn(async move {
            let result = negotiator.stats().await;
            if negotiator.inner.lifecycle.is_closing() {
                tracing::debug!(target = "negotiator", "discarding stats after destroy");
                return;
            }
            callback(result);
        });
    }

    pub async fn stats(&self) -> Result<Vec<StatsReport>> {
        let connection = self.inner.require_connection()?;
        let raw = connection.get_stats().await?;
        if self.inner.lifecycle.is_closing() {
            return Err(NegotiatorError::Destroyed);
        }
        Ok(stats::normalize(raw))
    }

    pub fn role(&self) -> Role {
        self.inner.role
    }

    pub fn channel_name(&self) -> Option<&str> {
        self.inner.channel_name.as_deref()
    }

    pub fn state(&self) -> NegotiationState {
        self.inner.rounds.lock().state()
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.lifecycle.is_destroyed()
    }

    pub fn has_connection(&self) -> bool {
        self.inner.connection.lock().is_some()
    }

    pub fn has_data_channel(&self) -> bool {
        self.inner.channel.lock().is_some()
    }

    pub fn pending_candidates(&self) -> usize {
        self.inner.candidates.lock().len()
    }

    pub fn remote_stream(&self) -> Option<Arc<MediaStream>> {
        self.inner.remote_stream.lock().clone()
    }

    pub fn on<F>(&self, kind: PeerEventKind, handler: F) -> ListenerId
    where
        F: Fn(&PeerEvent) + Send + Sync + 'static,
    {
        self.inner.events.on(kind, handler)
    }

    pub fn on_any<F>(&self, handler: F) -> ListenerId
    where
        F: Fn(&PeerEvent) + Send + Sync + 'static,
    {
        self.inner.events.on_any(handler)
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.inner.events.off(id)
    }

    pub fn on_signal<F>(&self, handler: F) -> ListenerId
    where
        F: Fn(&SignalMessage) + Send + Sync + 'static,
    {
        self.on(PeerEventKind::Signal, move |event| {
            if let PeerEvent::Signal(message) = event {
                handler(message);
            }
        })
    }

    pub fn on_connect<F>(&self, handler: F) -> ListenerId
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on(PeerEventKind::Connect, move |_| handler())
    }

    pub fn on_close<F>(&self, handler: F) -> ListenerId
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on(PeerEventKind::Close, move |_| handler())
    }

    pub fn on_stream<F>(&self, handler: F) -> ListenerId
    where
        F: Fn(&Arc<MediaStream>) + Send + Sync + 'static,
    {
        self.on(PeerEventKind::Stream, move |event| {
            if let PeerEvent::Stream(stream) = event {
                handler(stream);
            }
        })
    }

    pub fn on_data<F>(&self, handler: F) -> ListenerId
    where
        F: Fn(&DataPayload) + Send + Sync + 'static,
    {
        self.on(PeerEventKind::Data, move |event| {
            if let PeerEvent::Data(payload) = event {
                handler(payload);
            }
        })
    }

    pub fn on_error<F>(&self, handler: F) -> ListenerId
    where
        F: Fn(&NegotiatorError) + Send + Sync + 'static,
    {
        self.on(PeerEventKind::Error, move |event| {
            if let PeerEvent::Error(err) = event {
                handler(err);
            }
        })
    }

    /// Every event from now on, as a channel.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<PeerEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.on_any(move |event| {
            let _ = tx.send(event.clone());
        });
        rx
    }
}

async fn drive(
    inner: Weak<Inner>,
    mut receiver: mpsc::UnboundedReceiver<DriverEvent>,
    shutdown: Arc<Notify>,
) {
    loop {
        let event = tokio::select! {
            event = receiver.recv() => match event {
                Some(event) => event,
                None => break,
            },
            _ = shutdown.notified() => break,
        };
        let Some(inner) = inner.upgrade() else { break };
        if inner.lifecycle.is_closing() {
            break;
        }
        inner.handle(event).await;
    }
    tracing::trace!(target = "negotiator", "event driver stopped");
}

impl Inner {
    fn connection(&self) -> Option<Arc<dyn PeerConnection>> {
        self.connection.lock().clone()
    }

    fn require_connection(&self) -> Result<Arc<dyn PeerConnection>> {
        if self.lifecycle.is_destroyed() {
            return Err(NegotiatorError::Destroyed);
        }
        self.connection().ok_or(NegotiatorError::NoConnection)
    }

    fn is_released(&self) -> bool {
        self.connection.lock().is_none()
    }

    fn emit(&self, event: PeerEvent) {
        self.events.emit(event);
    }

    fn emit_close(&self) {
        if self.lifecycle.claim_close() {
            self.emit(PeerEvent::Close);
        }
    }

    async fn handle(self: &Arc<Self>, event: DriverEvent) {
        match event {
            DriverEvent::Connection(event) => self.handle_connection_event(event).await,
            DriverEvent::ChannelError(err) => self.fail_channel(err).await,
        }
    }

    async fn handle_connection_event(self: &Arc<Self>, event: ConnectionEvent) {
        match event {
            ConnectionEvent::NegotiationNeeded => {
                if self.is_released() {
                    return;
                }
                tracing::debug!(target = "negotiator", role = %self.role, "negotiation needed");
                self.renegotiate().await;
            }
            ConnectionEvent::IceCandidate(None) => {
                tracing::trace!(target = "negotiator", "local candidate gathering complete");
            }
            ConnectionEvent::IceCandidate(Some(candidate)) => {
                if self.is_released() {
                    return;
                }
                tracing::trace!(
                    target = "negotiator",
                    candidate = %candidate.candidate,
                    "local candidate"
                );
                self.emit(PeerEvent::Signal(SignalMessage::candidate(candidate)));
            }
            ConnectionEvent::IceCandidateError(message) => {
                tracing::debug!(target = "negotiator", error = %message, "ice candidate error");
            }
            ConnectionEvent::ConnectionStateChange(state) => {
                self.on_connection_state(state).await;
            }
            ConnectionEvent::IceConnectionStateChange(state) => {
                tracing::debug!(target = "negotiator", state = ?state, "ice connection state");
            }
            ConnectionEvent::SignalingStateChange(state) => {
                tracing::debug!(target = "negotiator", state = ?state, "signaling state");
            }
            ConnectionEvent::Track(track) => self.on_track(track),
            ConnectionEvent::DataChannel(channel) => self.adopt_channel(channel),
        }
    }

    async fn on_connection_state(&self, state: ConnectionState) {
        tracing::debug!(target = "negotiator", state = ?state, "connection state");
        match state {
            ConnectionState::Connected => {
                if !self.is_released() {
                    self.emit(PeerEvent::Connect);
                }
            }
            ConnectionState::Closed => {
                let (connection, channel) = self.take_resources();
                if connection.is_none() {
                    return;
                }
                self.close_resources(connection, channel).await;
                self.emit_close();
            }
            _ => {}
        }
    }

    fn on_track(&self, track: MediaTrack) {
        if self.is_released() {
            return;
        }
        let stream = Arc::clone(
            self.remote_stream
                .lock()
                .get_or_insert_with(|| Arc::new(MediaStream::new())),
        );
        tracing::debug!(
            target = "negotiator",
            track = track.id(),
            kind = ?track.kind(),
            stream = stream.id(),
            "remote track"
        );
        stream.add_track(track);
        self.emit(PeerEvent::Stream(stream));
    }

    fn adopt_channel(self: &Arc<Self>, channel: Arc<dyn DataChannel>) {
        if self.role.is_initiator() || self.channel_config.negotiated {
            tracing::debug!(
                target = "negotiator",
                label = %channel.label(),
                "ignoring inbound data channel"
            );
            return;
        }
        if self.is_released() {
            return;
        }
        let mut slot = self.channel.lock();
        if slot.is_some() {
            tracing::warn!(
                target = "negotiator",
                label = %channel.label(),
                "data channel already adopted; ignoring"
            );
            return;
        }
        tracing::debug!(target = "negotiator", label = %channel.label(), "adopted data channel");
        self.wire_channel(&channel);
        *slot = Some(channel);
    }

    fn wire_channel(self: &Arc<Self>, channel: &Arc<dyn DataChannel>) {
        let weak = Arc::downgrade(self);
        channel.on_message(Box::new(move |payload| {
            if let Some(inner) = weak.upgrade() {
                tracing::trace!(target = "negotiator", bytes = payload.len(), "data received");
                inner.emit(PeerEvent::Data(payload));
            }
        }));
        let sink = self.driver_tx.clone();
        channel.on_error(Box::new(move |err| {
            let _ = sink.send(DriverEvent::ChannelError(err));
        }));
    }

    async fn open_local_channel(self: &Arc<Self>) {
        let Some(label) = self.channel_name.clone() else {
            return;
        };
        let Some(connection) = self.connection() else {
            return;
        };
        tracing::trace!(
            target = "negotiator",
            await = "pc.create_data_channel",
            state = "start",
            label = %label
        );
        let result = connection
            .create_data_channel(&label, &self.channel_config)
            .await;
        tracing::trace!(
            target = "negotiator",
            await = "pc.create_data_channel",
            state = "end",
            ok = result.is_ok()
        );
        match result {
            Ok(channel) => {
                if self.is_released() {
                    return;
                }
                self.wire_channel(&channel);
                *self.channel.lock() = Some(channel);
            }
            Err(err) => {
                tracing::warn!(
                    target = "negotiator",
                    error = %NegotiatorError::Setup(err.to_string()),
                    label = %label,
                    "data channel creation failed"
                );
            }
        }
    }

    async fn add_stream(&self, stream: &MediaStream) {
        let Some(connection) = self.connection() else {
            return;
        };
        for track in stream.tracks() {
            if let Err(err) = connection.add_track(&track, stream).await {
                tracing::warn!(
                    target = "negotiator",
                    error = %err,
                    track = track.id(),
                    stream = stream.id(),
                    "add track failed"
                );
            }
            if self.is_released() {
                return;
            }
        }
    }

    async fn renegotiate(&self) {
        if self.role.is_initiator() {
            self.create_offer().await;
        } else {
            tracing::debug!(target = "negotiator", "requesting renegotiation from initiator");
            self.emit(PeerEvent::Signal(SignalMessage::renegotiate()));
        }
    }

    async fn create_offer(&self) {
        if let Err(err) = self.try_create_offer().await {
            tracing::warn!(
                target = "negotiator",
                role = %self.role,
                error = %err,
                "create offer failed"
            );
        }
    }

    async fn try_create_offer(&self) -> Result<()> {
        let connection = self.require_connection()?;
        self.rounds.lock().offer_started();

        tracing::trace!(target = "negotiator", await = "pc.create_offer", state = "start");
        let offer = connection.create_offer(&self.offer_options).await?;
        tracing::trace!(target = "negotiator", await = "pc.create_offer", state = "end");
        if self.is_released() {
            return Ok(());
        }

        tracing::trace!(target = "negotiator", await = "pc.set_local_description", state = "start");
        connection.set_local_description(offer.clone()).await?;
        tracing::trace!(target = "negotiator", await = "pc.set_local_description", state = "end");
        if self.is_released() {
            return Ok(());
        }

        self.rounds.lock().offer_sent();
        self.emit_description(&offer);
        Ok(())
    }

    async fn create_answer(&self) {
        if let Err(err) = self.try_create_answer().await {
            tracing::warn!(
                target = "negotiator",
                role = %self.role,
                error = %err,
                "create answer failed"
            );
        }
    }

    async fn try_create_answer(&self) -> Result<()> {
        let connection = self.require_connection()?;

        tracing::trace!(target = "negotiator", await = "pc.create_answer", state = "start");
        let answer = connection.create_answer(&self.answer_options).await?;
        tracing::trace!(target = "negotiator", await = "pc.create_answer", state = "end");
        if self.is_released() {
            return Ok(());
        }

        tracing::trace!(target = "negotiator", await = "pc.set_local_description", state = "start");
        connection.set_local_description(answer.clone()).await?;
        tracing::trace!(target = "negotiator", await = "pc.set_local_description", state = "end");
        if self.is_released() {
            return Ok(());
        }

        self.rounds.lock().answer_sent();
        self.emit_description(&answer);
        Ok(())
    }

    fn emit_description(&self, description: &SessionDescription) {
        match SignalMessage::from_description(description) {
            Some(message) => self.emit(PeerEvent::Signal(message)),
            None => tracing::warn!(
                target = "negotiator",
                sdp_type = %description.sdp_type,
                "local description is not signalable"
            ),
        }
    }

    async fn receive_description(&self, description: SessionDescription) {
        if let Err(err) = self.try_receive_description(description).await {
            tracing::warn!(
                target = "negotiator",
                role = %self.role,
                error = %err,
                "remote description failed"
            );
        }
    }

    async fn try_receive_description(&self, description: SessionDescription) -> Result<()> {
        let connection = self.require_connection()?;
        let sdp_type = description.sdp_type;

        if sdp_type == SdpType::Offer {
            let mut rounds = self.rounds.lock();
            if self.role.is_initiator() && rounds.local_offer_pending() {
                tracing::warn!(
                    target = "negotiator",
                    state = %rounds.state(),
                    "rejecting remote offer while local offer is outstanding"
                );
                return Ok(());
            }
            rounds.offer_received();
        }

        tracing::trace!(
            target = "negotiator",
            await = "pc.set_remote_description",
            state = "start",
            sdp_type = %sdp_type
        );
        connection.set_remote_description(description).await?;
        tracing::trace!(target = "negotiator", await = "pc.set_remote_description", state = "end");
        if self.is_released() {
            return Ok(());
        }

        let applied = connection
            .remote_description()
            .await
            .map(|remote| remote.sdp_type)
            .unwrap_or(sdp_type);
        match applied {
            SdpType::Offer => self.create_answer().await,
            SdpType::Answer => {
                self.rounds.lock().answer_applied();
            }
            SdpType::Pranswer | SdpType::Rollback => {}
        }

        self.flush_candidates().await;
        Ok(())
    }

    async fn receive_candidate(&self, candidate: CandidateInit) {
        if self.is_released() {
            tracing::debug!(target = "negotiator", "ignoring candidate after close");
            return;
        }
        let admission = self.candidates.lock().admit(candidate);
        match admission {
            Admission::Apply(candidate) => self.apply_candidate(candidate).await,
            Admission::Buffered { pending } => {
                tracing::trace!(target = "negotiator", pending, "buffered remote candidate");
            }
            Admission::Rejected(candidate) => {
                tracing::warn!(
                    target = "negotiator",
                    candidate = %candidate.candidate,
                    "remote candidate buffer full; dropping candidate"
                );
            }
        }
    }

    async fn apply_candidate(&self, candidate: CandidateInit) {
        let Some(connection) = self.connection() else {
            return;
        };
        if let Err(err) = connection.add_ice_candidate(candidate).await {
            tracing::warn!(target = "negotiator", error = %err, "add remote candidate failed");
        }
    }

    /// Applies buffered candidates oldest first. Candidates signaled while
    /// this runs queue up behind them instead of jumping ahead.
    async fn flush_candidates(&self) {
        if self.is_released() {
            return;
        }
        let started = self.candidates.lock().begin_drain();
        if !started {
            return;
        }
        let mut applied = 0usize;
        loop {
            if self.is_released() {
                return;
            }
            let next = self.candidates.lock().next_drained();
            let Some(candidate) = next else { break };
            self.apply_candidate(candidate).await;
            applied += 1;
        }
        if applied > 0 {
            tracing::debug!(
                target = "negotiator",
                count = applied,
                "applied buffered remote candidates"
            );
        }
    }

    async fn fail_channel(&self, err: ConnectionError) {
        if self.is_released() {
            tracing::debug!(target = "negotiator", error = %err, "data channel error after close");
            return;
        }
        tracing::warn!(target = "negotiator", error = %err, "data channel error");
        let (connection, channel) = self.take_resources();
        self.close_resources(connection, channel).await;
        self.emit(PeerEvent::Error(NegotiatorError::Channel(err.to_string())));
        self.emit_close();
    }

    /// Empties the connection and channel slots and drops negotiation
    /// bookkeeping; everything after this observes a released connection.
    fn take_resources(&self) -> (Option<Arc<dyn PeerConnection>>, Option<Arc<dyn DataChannel>>) {
        let connection = self.connection.lock().take();
        let channel = self.channel.lock().take();
        let discarded = self.candidates.lock().clear();
        if discarded > 0 {
            tracing::debug!(target = "negotiator", discarded, "discarding buffered candidates");
        }
        self.rounds.lock().close();
        (connection, channel)
    }

    async fn close_resources(
        &self,
        connection: Option<Arc<dyn PeerConnection>>,
        channel: Option<Arc<dyn DataChannel>>,
    ) {
        if let Some(channel) = channel {
            if let Err(err) = channel.close().await {
                tracing::debug!(target = "negotiator", error = %err, "data channel close failed");
            }
        }
        if let Some(connection) = connection {
            if let Err(err) = connection.close().await {
                tracing::debug!(target = "negotiator", error = %err, "peer connection close failed");
            }
        }
    }
}
