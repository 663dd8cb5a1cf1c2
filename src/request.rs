//! In-flight request bookkeeping for the external sources
//!
//! Each target keeps a generation counter. Starting a request supersedes
//! whatever was in flight for the same target, so only the response to the
//! newest ticket is ever merged.

use serde::{Deserialize, Serialize};

/// Which external call a request belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestTarget {
    Suggestions,
    Chat,
    Cascade,
}

impl RequestTarget {
    const ALL: [RequestTarget; 3] = [RequestTarget::Suggestions, RequestTarget::Chat, RequestTarget::Cascade];

    fn slot(self) -> usize {
        match self {
            RequestTarget::Suggestions => 0,
            RequestTarget::Chat => 1,
            RequestTarget::Cascade => 2,
        }
    }
}

/// Handle for one outgoing request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestTicket {
    pub target: RequestTarget,
    pub generation: u64,
}

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    generation: u64,
    in_flight: bool,
}

/// Latest-request-wins tracker
#[derive(Debug, Clone, Default)]
pub struct RequestTracker {
    slots: [Slot; 3],
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a request, superseding any in flight for the same target
    pub fn begin(&mut self, target: RequestTarget) -> RequestTicket {
        let slot = &mut self.slots[target.slot()];
        if slot.in_flight {
            tracing::debug!(?target, superseded = slot.generation, "superseding request");
        }
        slot.generation += 1;
        slot.in_flight = true;
        RequestTicket {
            target,
            generation: slot.generation,
        }
    }

    /// Cancel whatever is in flight for `target`
    pub fn cancel(&mut self, target: RequestTarget) -> bool {
        let slot = &mut self.slots[target.slot()];
        if !slot.in_flight {
            return false;
        }
        slot.generation += 1;
        slot.in_flight = false;
        tracing::debug!(?target, "cancelled request");
        true
    }

    pub fn cancel_all(&mut self) {
        for target in RequestTarget::ALL {
            self.cancel(target);
        }
    }

    /// Whether a response for `ticket` may still be merged
    pub fn is_current(&self, ticket: &RequestTicket) -> bool {
        let slot = &self.slots[ticket.target.slot()];
        slot.in_flight && slot.generation == ticket.generation
    }

    /// Mark the ticket's request as answered; false if it was stale
    pub fn complete(&mut self, ticket: &RequestTicket) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.slots[ticket.target.slot()].in_flight = false;
        true
    }

    pub fn in_flight(&self, target: RequestTarget) -> bool {
        self.slots[target.slot()].in_flight
    }
}
