//! Overlay Timer Subsystem
//!
//! Bookkeeping for timed overlays. Each (output, overlay) pair has at most one
//! live timer. A timer is a tokio task that sleeps for the overlay's display
//! duration and then hands a [`TimerTicket`] to its expiry callback.
//!
//! # Stale firings
//!
//! Every started timer gets a fresh generation number. A callback that lost a
//! race with [`OverlayTimers::clear`] or a restart still runs, but
//! [`OverlayTimers::finish`] rejects its ticket, so it never touches state
//! that belongs to a newer timer.

use std::collections::HashMap;
use std::time::Duration;

use tokio::task::AbortHandle;
use tokio::time::Instant;

use crate::ids::{OutputId, OverlayId};

/// Key of a timer: one per (output, overlay) pair
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerKey {
    /// Output showing the overlay
    pub output_id: OutputId,
    /// Timed overlay
    pub overlay_id: OverlayId,
}

impl TimerKey {
    /// Create a key
    #[must_use]
    pub fn new(output_id: OutputId, overlay_id: OverlayId) -> Self {
        Self {
            output_id,
            overlay_id,
        }
    }
}

/// Handed to the expiry callback when a timer fires
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimerTicket {
    /// Timer key
    pub key: TimerKey,
    /// Generation of the timer that fired
    pub generation: u64,
}

struct TimerEntry {
    generation: u64,
    abort: AbortHandle,
    deadline: Instant,
}

/// Live overlay timers
#[derive(Default)]
pub struct OverlayTimers {
    entries: HashMap<TimerKey, TimerEntry>,
    next_generation: u64,
}

impl OverlayTimers {
    /// Create an empty timer set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or restart) the timer for a pair
    ///
    /// Any pending timer for the same pair is cancelled first. Returns the
    /// new generation, or `None` when no tokio runtime is available to run
    /// the timer.
    pub fn start<F>(
        &mut self,
        output_id: OutputId,
        overlay_id: OverlayId,
        duration: Duration,
        on_expire: F,
    ) -> Option<u64>
    where
        F: FnOnce(TimerTicket) + Send + 'static,
    {
        let key = TimerKey::new(output_id, overlay_id);
        self.cancel(&key);

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(
                output_id = %key.output_id,
                overlay_id = %key.overlay_id,
                "No async runtime, overlay timer not scheduled"
            );
            return None;
        };

        self.next_generation += 1;
        let generation = self.next_generation;
        let ticket = TimerTicket {
            key: key.clone(),
            generation,
        };

        let task = runtime.spawn(async move {
            tokio::time::sleep(duration).await;
            on_expire(ticket);
        });

        tracing::debug!(
            output_id = %key.output_id,
            overlay_id = %key.overlay_id,
            duration_ms = duration.as_millis() as u64,
            "Overlay timer started"
        );

        self.entries.insert(
            key,
            TimerEntry {
                generation,
                abort: task.abort_handle(),
                deadline: Instant::now() + duration,
            },
        );
        Some(generation)
    }

    /// Accept a fired ticket, removing its entry
    ///
    /// Returns false for stale tickets (cancelled or superseded timers).
    pub fn finish(&mut self, ticket: &TimerTicket) -> bool {
        match self.entries.get(&ticket.key) {
            Some(entry) if entry.generation == ticket.generation => {
                self.entries.remove(&ticket.key);
                true
            }
            _ => false,
        }
    }

    /// Cancel the timer for a pair; idempotent
    pub fn clear(&mut self, output_id: &OutputId, overlay_id: &OverlayId) -> bool {
        self.cancel(&TimerKey::new(output_id.clone(), overlay_id.clone()))
    }

    /// Cancel every timer of an output, returning how many were cancelled
    pub fn clear_all(&mut self, output_id: &OutputId) -> usize {
        let keys: Vec<TimerKey> = self
            .entries
            .keys()
            .filter(|key| &key.output_id == output_id)
            .cloned()
            .collect();

        keys.iter().filter(|key| self.cancel(key)).count()
    }

    /// Whether a pair has a live timer
    #[must_use]
    pub fn contains(&self, output_id: &OutputId, overlay_id: &OverlayId) -> bool {
        self.entries
            .contains_key(&TimerKey::new(output_id.clone(), overlay_id.clone()))
    }

    /// Whether an output has any live timer
    #[must_use]
    pub fn has_timers_for(&self, output_id: &OutputId) -> bool {
        self.entries.keys().any(|key| &key.output_id == output_id)
    }

    /// Time left before a pair's timer fires
    #[must_use]
    pub fn remaining(&self, output_id: &OutputId, overlay_id: &OverlayId) -> Option<Duration> {
        self.entries
            .get(&TimerKey::new(output_id.clone(), overlay_id.clone()))
            .map(|entry| entry.deadline.saturating_duration_since(Instant::now()))
    }

    /// Live timer keys, sorted
    #[must_use]
    pub fn active(&self) -> Vec<TimerKey> {
        let mut keys: Vec<_> = self.entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Number of live timers
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no timer is live
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn cancel(&mut self, key: &TimerKey) -> bool {
        let Some(entry) = self.entries.remove(key) else {
            return false;
        };
        entry.abort.abort();
        tracing::debug!(
            output_id = %key.output_id,
            overlay_id = %key.overlay_id,
            "Overlay timer cleared"
        );
        true
    }
}

impl Drop for OverlayTimers {
    fn drop(&mut self) {
        for entry in self.entries.values() {
            entry.abort.abort();
        }
    }
}

impl std::fmt::Debug for OverlayTimers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayTimers")
            .field("active", &self.active())
            .finish()
    }
}
