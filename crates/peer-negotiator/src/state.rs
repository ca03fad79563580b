use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// Where the offer/answer exchange stands.
///
/// `Fresh -> Negotiating -> Stable -> (Renegotiating -> Stable)* -> Closed`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum NegotiationState {
    #[default]
    Fresh,
    Negotiating,
    Stable,
    Renegotiating,
    Closed,
}

impl NegotiationState {
    pub fn begin_round(self) -> Self {
        match self {
            NegotiationState::Fresh => NegotiationState::Negotiating,
            NegotiationState::Stable => NegotiationState::Renegotiating,
            other => other,
        }
    }

    pub fn complete_round(self) -> Self {
        match self {
            NegotiationState::Negotiating | NegotiationState::Renegotiating => {
                NegotiationState::Stable
            }
            other => other,
        }
    }

    pub fn is_negotiating(self) -> bool {
        matches!(
            self,
            NegotiationState::Negotiating | NegotiationState::Renegotiating
        )
    }

    pub fn is_closed(self) -> bool {
        matches!(self, NegotiationState::Closed)
    }
}

impl fmt::Display for NegotiationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            NegotiationState::Fresh => "fresh",
            NegotiationState::Negotiating => "negotiating",
            NegotiationState::Stable => "stable",
            NegotiationState::Renegotiating => "renegotiating",
            NegotiationState::Closed => "closed",
        };
        f.write_str(label)
    }
}

/// Negotiation state plus whether our own offer is still awaiting an answer.
#[derive(Debug, Default)]
pub(crate) struct RoundTracker {
    state: NegotiationState,
    local_offer_pending: bool,
}

impl RoundTracker {
    pub(crate) fn state(&self) -> NegotiationState {
        self.state
    }

    pub(crate) fn local_offer_pending(&self) -> bool {
        self.local_offer_pending
    }

    pub(crate) fn offer_started(&mut self) {
        self.state = self.state.begin_round();
    }

    pub(crate) fn offer_sent(&mut self) {
        if !self.state.is_closed() {
            self.local_offer_pending = true;
        }
    }

    pub(crate) fn offer_received(&mut self) {
        self.state = self.state.begin_round();
    }

    pub(crate) fn answer_applied(&mut self) {
        self.local_offer_pending = false;
        self.state = self.state.complete_round();
    }

    pub(crate) fn answer_sent(&mut self) {
        self.state = self.state.complete_round();
    }

    pub(crate) fn close(&mut self) {
        self.local_offer_pending = false;
        self.state = NegotiationState::Closed;
    }
}

/// Teardown flags. `destroying` is set on entry to `destroy`, `destroyed`
/// once teardown finished; `close_emitted` guards the single `Close` event.
#[derive(Debug, Default)]
pub(crate) struct Lifecycle {
    destroying: AtomicBool,
    destroyed: AtomicBool,
    close_emitted: AtomicBool,
}

impl Lifecycle {
    /// Returns `false` if teardown already started.
    pub(crate) fn begin_destroy(&self) -> bool {
        !self.destroying.swap(true, Ordering::AcqRel)
    }

    pub(crate) fn finish_destroy(&self) {
        self.destroyed.store(true, Ordering::Release);
    }

    pub(crate) fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    pub(crate) fn is_closing(&self) -> bool {
        self.destroying.load(Ordering::Acquire) || self.is_destroyed()
    }

    /// Returns `true` exactly once.
    pub(crate) fn claim_close(&self) -> bool {
        !self.close_emitted.swap(true, Ordering::AcqRel)
    }
}
