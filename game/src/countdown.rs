use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A deferred action in simulation time. The countdown owns the payload it fires, so dropping
/// it (pause, reset, a modal choice) cancels the action with nothing left to clean up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Countdown<T> {
    #[serde(with = "crate::serde_duration")]
    remaining: Duration,
    payload: T,
}

/// Result of advancing a [`Countdown`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick<T> {
    Pending(Countdown<T>),
    Fired(T),
}

impl<T> Countdown<T> {
    pub fn new(delay: Duration, payload: T) -> Self {
        Self {
            remaining: delay,
            payload,
        }
    }

    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    pub fn payload(&self) -> &T {
        &self.payload
    }

    /// Consumes `dt`; hands the payload back once nothing remains.
    pub fn advance(mut self, dt: Duration) -> Tick<T> {
        self.remaining = self.remaining.saturating_sub(dt);
        if self.remaining.is_zero() {
            Tick::Fired(self.payload)
        } else {
            Tick::Pending(self)
        }
    }
}

/// Advances an optional countdown in place, emptying the slot when it fires.
pub fn advance_slot<T>(slot: &mut Option<Countdown<T>>, dt: Duration) -> Option<T> {
    match slot.take()?.advance(dt) {
        Tick::Pending(countdown) => {
            *slot = Some(countdown);
            None
        }
        Tick::Fired(payload) => Some(payload),
    }
}
