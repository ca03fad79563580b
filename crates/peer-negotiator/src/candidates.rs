use std::collections::VecDeque;

use crate::signal::CandidateInit;

/// What to do with an inbound remote candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// A remote description is in place; apply the candidate now.
    Apply(CandidateInit),
    Buffered { pending: usize },
    /// The buffer is full; the candidate is dropped.
    Rejected(CandidateInit),
}

/// Remote candidates that arrived before any remote description.
///
/// Draining is incremental: between [`CandidateBuffer::begin_drain`] and the
/// [`CandidateBuffer::next_drained`] call that returns `None`, new arrivals
/// still queue behind the ones being applied. Only then does the buffer
/// switch to handing candidates straight back for application.
#[derive(Debug)]
pub struct CandidateBuffer {
    pending: VecDeque<CandidateInit>,
    capacity: usize,
    remote_ready: bool,
    draining: bool,
}

impl CandidateBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            pending: VecDeque::new(),
            capacity: capacity.max(1),
            remote_ready: false,
            draining: false,
        }
    }

    pub fn admit(&mut self, candidate: CandidateInit) -> Admission {
        if self.remote_ready && !self.draining {
            return Admission::Apply(candidate);
        }
        if self.pending.len() >= self.capacity {
            return Admission::Rejected(candidate);
        }
        self.pending.push_back(candidate);
        Admission::Buffered {
            pending: self.pending.len(),
        }
    }

    /// Starts draining after a remote description was applied. Returns
    /// `false` when candidates already go straight through or another drain
    /// is running; that drain will pick up anything queued meanwhile.
    pub fn begin_drain(&mut self) -> bool {
        if self.draining || (self.remote_ready && self.pending.is_empty()) {
            return false;
        }
        self.remote_ready = true;
        self.draining = true;
        true
    }

    /// Oldest queued candidate. `None` ends the drain.
    pub fn next_drained(&mut self) -> Option<CandidateInit> {
        let next = self.pending.pop_front();
        if next.is_none() {
            self.draining = false;
        }
        next
    }

    pub fn is_draining(&self) -> bool {
        self.draining
    }

    /// Drops buffered candidates, returning how many were discarded.
    pub fn clear(&mut self) -> usize {
        let discarded = self.pending.len();
        self.pending.clear();
        discarded
    }

    pub fn is_remote_ready(&self) -> bool {
        self.remote_ready
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
