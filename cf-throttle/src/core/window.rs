//! Sliding call window of a single limiter

use std::time::{Duration, Instant};

#[cfg(feature = "ahash")]
use ahash::AHashMap as HashMap;
#[cfg(not(feature = "ahash"))]
use std::collections::HashMap;

/// Calls currently counted against one limiter
///
/// Each entry is a permit id with its activation time. Permits that were
/// granted but not activated yet have no start time and never expire.
#[derive(Debug, Default)]
pub(crate) struct Window {
    slots: HashMap<u64, Option<Instant>>,
}

impl Window {
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub(crate) fn insert(&mut self, id: u64) {
        self.slots.insert(id, None);
    }

    /// Starts the window of a granted permit; returns false for unknown ids
    pub(crate) fn activate(&mut self, id: u64, now: Instant) -> bool {
        match self.slots.get_mut(&id) {
            Some(start) => {
                start.get_or_insert(now);
                true
            }
            None => false,
        }
    }

    pub(crate) fn remove(&mut self, id: u64) -> bool {
        self.slots.remove(&id).is_some()
    }

    /// Drops permits whose window has fully passed and returns how many went
    pub(crate) fn prune(&mut self, window: Duration, now: Instant) -> usize {
        let before = self.slots.len();
        self.slots.retain(|_, start| match start {
            Some(start) => now.saturating_duration_since(*start) < window,
            None => true,
        });
        before - self.slots.len()
    }

    /// Time until the oldest activated permit leaves the window
    pub(crate) fn next_expiry(&self, window: Duration, now: Instant) -> Option<Duration> {
        self.slots
            .values()
            .flatten()
            .map(|start| (*start + window).saturating_duration_since(now))
            .min()
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
    }
}
