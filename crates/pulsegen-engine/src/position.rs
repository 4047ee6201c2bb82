//! Position feed bridge: lossy, last-value-wins handoff from an
//! asynchronous position source to the waiting engine.
//!
//! A single synchronized slot holds the latest reading plus a "fresh"
//! flag; a condvar lets the engine block for the next arrival with a
//! bounded timeout. No queue: the engine only needs to know whether the
//! axis has crossed a threshold since it last looked, not every
//! intermediate sample.

use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;

#[derive(Debug, Default)]
struct Slot {
    latest: Option<f64>,
    fresh: bool,
}

/// Single-slot cell holding the latest axis position.
///
/// Shared via `Arc`; `on_position_update` may be called from any thread.
#[derive(Debug, Default)]
pub struct PositionFeed {
    slot: Mutex<Slot>,
    arrival: Condvar,
}

impl PositionFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a position reading and signal the engine. Later updates
    /// overwrite earlier unconsumed ones.
    pub fn on_position_update(&self, value: f64) {
        let mut slot = self.lock();
        slot.latest = Some(value);
        slot.fresh = true;
        self.arrival.notify_all();
    }

    /// The latest reading if one arrived since the last consume; clears
    /// the fresh flag. The value itself stays readable via `latest`.
    pub fn consume_fresh(&self) -> Option<f64> {
        let mut slot = self.lock();
        if slot.fresh {
            slot.fresh = false;
            slot.latest
        } else {
            None
        }
    }

    /// The latest reading seen so far, consumed or not.
    pub fn latest(&self) -> Option<f64> {
        self.lock().latest
    }

    /// Block until a fresh reading arrives or the timeout elapses.
    /// Returns whether a fresh reading is now available.
    pub fn wait_fresh(&self, timeout: Duration) -> bool {
        let slot = self.lock();
        if slot.fresh {
            return true;
        }
        let (slot, _) = self
            .arrival
            .wait_timeout(slot, timeout)
            .unwrap_or_else(PoisonError::into_inner);
        slot.fresh
    }

    /// Forget the stored reading and its signal; called on `start`.
    pub fn reset(&self) {
        let mut slot = self.lock();
        slot.latest = None;
        slot.fresh = false;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
