//! Lamport clock
//!
//! A `(id, time)` logical timestamp. `tick` advances the local component,
//! `merge` folds in an observed clock, and the total order compares
//! `(time, id)` with the author key as the final arbiter.

use crate::types::PubKey;
use std::cmp::Ordering;

/// Lamport logical clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LamportClock {
    /// The author this clock belongs to (public key bytes).
    pub id: PubKey,
    /// Logical time; advances by local ticks and observed merges.
    pub time: u64,
}

impl LamportClock {
    /// Create a clock with the given owner and time.
    pub fn new(id: PubKey, time: u64) -> Self {
        Self { id, time }
    }

    /// Advance the clock for a new local event.
    pub fn tick(&mut self) -> LamportClock {
        self.time += 1;
        *self
    }

    /// Fold in an observed clock: `time ← max(time, other.time)`.
    pub fn merge(&mut self, other: &LamportClock) {
        self.time = self.time.max(other.time);
    }
}

impl Ord for LamportClock {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.time.cmp(&other.time) {
            Ordering::Equal => self.id.cmp(&other.id),
            other => other,
        }
    }
}

impl PartialOrd for LamportClock {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for LamportClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.time, self.id)
    }
}

// Tuple conversions
impl From<(PubKey, u64)> for LamportClock {
    fn from((id, time): (PubKey, u64)) -> Self {
        LamportClock::new(id, time)
    }
}

impl From<LamportClock> for (PubKey, u64) {
    fn from(clock: LamportClock) -> Self {
        (clock.id, clock.time)
    }
}
