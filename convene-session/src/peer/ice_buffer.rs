use convene_core::{IceCandidate, NegotiationId};
use std::collections::VecDeque;
use tracing::warn;

/// Remote candidates waiting for the remote description of their round.
pub struct IceBuffer {
    pending: VecDeque<(NegotiationId, IceCandidate)>,
    limit: usize,
}

impl IceBuffer {
    pub fn new(limit: usize) -> Self {
        Self {
            pending: VecDeque::new(),
            limit,
        }
    }

    /// Queues a candidate. The oldest entries are dropped beyond the limit.
    pub fn push(&mut self, negotiation: NegotiationId, candidate: IceCandidate) {
        self.pending.push_back((negotiation, candidate));
        while self.pending.len() > self.limit {
            if self.pending.pop_front().is_some() {
                warn!("ICE buffer full, dropping oldest candidate");
            }
        }
    }

    /// Takes the candidates of `current` in arrival order.
    ///
    /// Later rounds of the same epoch stay queued, everything else is discarded.
    pub fn take_for(&mut self, current: &NegotiationId) -> Vec<IceCandidate> {
        let mut ready = Vec::new();
        let mut keep = VecDeque::new();

        for (negotiation, candidate) in self.pending.drain(..) {
            if negotiation == *current {
                ready.push(candidate);
            } else if current.precedes(&negotiation) {
                keep.push_back((negotiation, candidate));
            }
        }

        self.pending = keep;
        ready
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
