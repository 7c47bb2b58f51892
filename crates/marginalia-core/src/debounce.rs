//! Trailing-edge debouncing driven by an external clock.
//!
//! The debouncer never owns a timer. Callers either poll it with the current
//! time or arm a host timer for [`deadline`](Debouncer::deadline) and hand the
//! returned generation back to [`fire`](Debouncer::fire). A generation that
//! has been superseded or cancelled never fires, so a stale timer callback is
//! always harmless.

use std::time::Duration;

use web_time::Instant;

#[derive(Clone, Debug)]
struct Scheduled<T> {
    value: T,
    deadline: Instant,
    generation: u64,
}

#[derive(Clone, Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<Scheduled<T>>,
    generation: u64,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
            generation: 0,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule `value`, replacing anything already pending.
    ///
    /// Returns the generation to pass to [`fire`](Self::fire).
    pub fn schedule(&mut self, value: T, now: Instant) -> u64 {
        self.generation += 1;
        self.pending = Some(Scheduled {
            value,
            deadline: now + self.delay,
            generation: self.generation,
        });
        self.generation
    }

    /// Drop the pending value. Outstanding generations become stale.
    pub fn cancel(&mut self) {
        self.generation += 1;
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    /// Current generation. Changes on every schedule and cancel.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Take the pending value if its quiet period has elapsed by `now`.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some(p) if now >= p.deadline => self.pending.take().map(|p| p.value),
            _ => None,
        }
    }

    /// Take the pending value if `generation` is still the live one.
    ///
    /// Used from host timer callbacks, which only run after the delay.
    pub fn fire(&mut self, generation: u64) -> Option<T> {
        match &self.pending {
            Some(p) if p.generation == generation => self.pending.take().map(|p| p.value),
            _ => None,
        }
    }
}
