//! At-most-one-in-flight request tracking
//!
//! Each caller owns a [`RequestSlot`]. Beginning a new request cancels the
//! token of the previous one, and only the ticket that is still current may
//! publish its result.

use std::sync::{Mutex, PoisonError};

use tokio_util::sync::CancellationToken;

/// Ticket for one in-flight request.
#[derive(Debug, Clone)]
pub struct InFlight {
    id: u64,
    token: CancellationToken,
}

impl InFlight {
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Token cancelled when this request is superseded or aborted.
    #[must_use]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

#[derive(Debug, Default)]
struct SlotState {
    next_id: u64,
    current: Option<InFlight>,
}

/// Slot holding the caller's current request, if any.
#[derive(Debug, Default)]
pub struct RequestSlot {
    state: Mutex<SlotState>,
}

impl RequestSlot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new request, cancelling whichever one was in flight.
    pub fn begin(&self) -> InFlight {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = state.current.take() {
            previous.token.cancel();
        }
        state.next_id += 1;
        let ticket = InFlight {
            id: state.next_id,
            token: CancellationToken::new(),
        };
        state.current = Some(ticket.clone());
        ticket
    }

    /// Whether `id` is still the request allowed to publish results.
    #[must_use]
    pub fn is_current(&self, id: u64) -> bool {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.current.as_ref().is_some_and(|t| t.id == id)
    }

    /// Release the slot if `id` still holds it. Returns whether it did.
    pub fn finish(&self, id: u64) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.current.as_ref().is_some_and(|t| t.id == id) {
            state.current = None;
            true
        } else {
            false
        }
    }

    /// Cancel the in-flight request, if any. Returns whether one was cancelled.
    pub fn cancel(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match state.current.take() {
            Some(ticket) => {
                ticket.token.cancel();
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.current.is_some()
    }
}
