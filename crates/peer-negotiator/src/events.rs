use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::connection::DataPayload;
use crate::error::NegotiatorError;
use crate::media::MediaStream;
use crate::signal::SignalMessage;

/// Everything a negotiator reports to the application.
#[derive(Debug, Clone)]
pub enum PeerEvent {
    /// Forward this message to the remote peer.
    Signal(SignalMessage),
    Connect,
    Close,
    /// The remote stream gained a track. Always the same `Arc`.
    Stream(Arc<MediaStream>),
    Data(DataPayload),
    Error(NegotiatorError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeerEventKind {
    Signal,
    Connect,
    Close,
    Stream,
    Data,
    Error,
}

impl PeerEvent {
    pub fn kind(&self) -> PeerEventKind {
        match self {
            PeerEvent::Signal(_) => PeerEventKind::Signal,
            PeerEvent::Connect => PeerEventKind::Connect,
            PeerEvent::Close => PeerEventKind::Close,
            PeerEvent::Stream(_) => PeerEventKind::Stream,
            PeerEvent::Data(_) => PeerEventKind::Data,
            PeerEvent::Error(_) => PeerEventKind::Error,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Handler = Arc<dyn Fn(&PeerEvent) + Send + Sync>;

struct Listener {
    id: ListenerId,
    kind: Option<PeerEventKind>,
    handler: Handler,
}

/// Listener registry. Handlers run synchronously on the emitting task, in
/// registration order; the registry lock is not held while they run, so a
/// handler may register or remove listeners.
#[derive(Default)]
pub struct EventEmitter {
    listeners: RwLock<Vec<Listener>>,
    next_id: AtomicU64,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&self, kind: PeerEventKind, handler: F) -> ListenerId
    where
        F: Fn(&PeerEvent) + Send + Sync + 'static,
    {
        self.register(Some(kind), Arc::new(handler))
    }

    pub fn on_any<F>(&self, handler: F) -> ListenerId
    where
        F: Fn(&PeerEvent) + Send + Sync + 'static,
    {
        self.register(None, Arc::new(handler))
    }

    fn register(&self, kind: Option<PeerEventKind>, handler: Handler) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push(Listener { id, kind, handler });
        id
    }

    pub fn off(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|listener| listener.id != id);
        listeners.len() != before
    }

    pub fn emit(&self, event: PeerEvent) {
        let kind = event.kind();
        let handlers: Vec<Handler> = self
            .listeners
            .read()
            .iter()
            .filter(|listener| listener.kind.is_none_or(|k| k == kind))
            .map(|listener| Arc::clone(&listener.handler))
            .collect();
        tracing::trace!(
            target = "negotiator",
            event = ?kind,
            listeners = handlers.len(),
            "emit"
        );
        for handler in handlers {
            handler(&event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn clear(&self) {
        self.listeners.write().clear();
    }
}
