//! Sliding-window throttler over named limiter mappings
//!
//! This module provides the [`Throttler`] struct which decides, for an
//! outbound request path, whether the call may proceed now or has to wait
//! until the governing limiter's window frees a slot.

use super::window::Window;
use super::{LimiterMapping, Quota, ThrottleError};
use std::time::{Duration, Instant};

/// A granted slot in a limiter window
///
/// The permit must be [activated](Throttler::activate) when the call is
/// dispatched, or [released](Throttler::release) if it never is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permit {
    id: u64,
    limiter: usize,
    generation: u64,
}

/// Why a call has to wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delay {
    /// Name of the limiter whose quota is exhausted
    pub limiter: String,
    /// Hint for when a slot frees up. Falls back to the limiter window when
    /// every counted call is still in flight.
    pub retry_after: Duration,
}

/// Outcome of [`Throttler::try_acquire`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// No limiter governs the path, or its quota is unlimited
    Unthrottled,
    /// The call may proceed and holds a slot
    Granted(Permit),
    /// The quota is exhausted
    Delayed(Delay),
}

/// Outcome of [`Throttler::check_delay_needed_and_resume`]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DelayCheck {
    /// Whether the call would exceed the governing limiter's quota
    pub delay_needed: bool,
    /// Name of the governing limiter, if any
    pub limiter: Option<String>,
    /// Present when a delay is needed
    pub retry_after: Option<Duration>,
}

/// Snapshot of one limiter for logging and diagnostics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimiterStatus {
    pub name: String,
    pub limit: i64,
    pub time_base: u32,
    pub in_window: usize,
}

struct Limiter {
    mapping: LimiterMapping,
    window: Window,
}

/// Throttler for outbound request paths
///
/// Exactly one registered mapping governs a path: the one with the most
/// specific matching selector (see [`Specificity`](crate::core::selector::Specificity)).
/// Ties go to the mapping registered first. Paths without a governing
/// mapping are never delayed.
///
/// Like the stores it resembles, the throttler is not thread-safe; wrap it in
/// a mutex for shared use.
///
/// # Example
///
/// ```
/// use cf_throttle::{Admission, LimiterMapping, PathSelector, Throttler};
/// use std::time::Instant;
///
/// let mut throttler = Throttler::new();
/// throttler
///     .add_limiter_mapping(
///         LimiterMapping::builder()
///             .name("groups")
///             .time_base(1)
///             .limit(1)
///             .path_selector(PathSelector::starts_with("/Groups"))
///             .build()
///             .unwrap(),
///     )
///     .unwrap();
///
/// let now = Instant::now();
/// let Admission::Granted(permit) = throttler.try_acquire("/Groups/a", now) else {
///     panic!("first call is admitted");
/// };
/// throttler.activate(permit, now);
///
/// assert!(matches!(
///     throttler.try_acquire("/Groups/b", now),
///     Admission::Delayed(_)
/// ));
/// ```
#[derive(Default)]
pub struct Throttler {
    limiters: Vec<Limiter>,
    next_permit: u64,
    generation: u64,
    resumable: usize,
}

impl Throttler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a limiter mapping
    ///
    /// # Errors
    ///
    /// [`ThrottleError::DuplicateLimiter`] if a mapping with the same name is
    /// already registered.
    pub fn add_limiter_mapping(&mut self, mapping: LimiterMapping) -> Result<(), ThrottleError> {
        if self
            .limiters
            .iter()
            .any(|limiter| limiter.mapping.name() == mapping.name())
        {
            return Err(ThrottleError::DuplicateLimiter(mapping.name().to_string()));
        }

        self.limiters.push(Limiter {
            mapping,
            window: Window::default(),
        });
        Ok(())
    }

    pub fn has_mappings(&self) -> bool {
        !self.limiters.is_empty()
    }

    pub fn mappings(&self) -> impl Iterator<Item = &LimiterMapping> {
        self.limiters.iter().map(|limiter| &limiter.mapping)
    }

    /// The mapping that governs `path`, if any
    pub fn governing_mapping(&self, path: &str) -> Option<&LimiterMapping> {
        self.governing(path).map(|idx| &self.limiters[idx].mapping)
    }

    /// Smallest window of all registered mappings
    pub fn min_time_base(&self) -> Option<Duration> {
        self.limiters
            .iter()
            .map(|limiter| limiter.mapping.window())
            .min()
    }

    /// Checks whether a call to `path` would exceed its quota right now
    ///
    /// As a side effect, every window is pruned and the number of freed
    /// slots is added to the resumable count (see [`take_resumable`](Self::take_resumable)).
    pub fn check_delay_needed_and_resume(&mut self, path: &str, now: Instant) -> DelayCheck {
        self.prune_all(now);

        let Some(idx) = self.governing(path) else {
            return DelayCheck::default();
        };

        let limiter = &self.limiters[idx];
        let name = Some(limiter.mapping.name().to_string());
        match limiter.mapping.quota() {
            Quota::Unlimited => DelayCheck {
                delay_needed: false,
                limiter: name,
                retry_after: None,
            },
            Quota::Max(max) if limiter.window.len() >= max as usize => {
                let window = limiter.mapping.window();
                DelayCheck {
                    delay_needed: true,
                    limiter: name,
                    retry_after: Some(limiter.window.next_expiry(window, now).unwrap_or(window)),
                }
            }
            Quota::Max(_) => DelayCheck {
                delay_needed: false,
                limiter: name,
                retry_after: None,
            },
        }
    }

    /// Tries to take a slot for a call to `path`
    pub fn try_acquire(&mut self, path: &str, now: Instant) -> Admission {
        let check = self.check_delay_needed_and_resume(path, now);

        if check.delay_needed {
            return Admission::Delayed(Delay {
                limiter: check.limiter.unwrap_or_default(),
                retry_after: check.retry_after.unwrap_or_default(),
            });
        }

        let Some(idx) = self.governing(path) else {
            return Admission::Unthrottled;
        };
        if self.limiters[idx].mapping.quota() == Quota::Unlimited {
            return Admission::Unthrottled;
        }

        let id = self.next_permit;
        self.next_permit += 1;
        self.limiters[idx].window.insert(id);

        Admission::Granted(Permit {
            id,
            limiter: idx,
            generation: self.generation,
        })
    }

    /// Marks the call holding `permit` as dispatched; its window starts now
    pub fn activate(&mut self, permit: Permit, now: Instant) -> bool {
        match self.limiter_mut(permit) {
            Some(limiter) => limiter.window.activate(permit.id, now),
            None => false,
        }
    }

    /// Frees the slot of a permit that was never dispatched
    pub fn release(&mut self, permit: Permit) -> bool {
        let released = match self.limiter_mut(permit) {
            Some(limiter) => limiter.window.remove(permit.id),
            None => false,
        };
        if released {
            self.resumable += 1;
        }
        released
    }

    /// Number of slots freed since the last call
    pub fn take_resumable(&mut self) -> usize {
        std::mem::take(&mut self.resumable)
    }

    /// Removes every mapping and counter
    ///
    /// Permits handed out before the reset become inert.
    pub fn reset(&mut self) {
        self.limiters.clear();
        self.generation += 1;
        self.resumable = 0;
    }

    /// True when no limiter counts any call after pruning at `now`
    pub fn is_idle(&mut self, now: Instant) -> bool {
        self.prune_all(now);
        self.limiters.iter().all(|limiter| limiter.window.is_empty())
    }

    pub fn status(&self) -> Vec<LimiterStatus> {
        self.limiters
            .iter()
            .map(|limiter| LimiterStatus {
                name: limiter.mapping.name().to_string(),
                limit: limiter.mapping.limit(),
                time_base: limiter.mapping.time_base(),
                in_window: limiter.window.len(),
            })
            .collect()
    }

    /// Drops every counted call, keeping the mappings
    pub fn clear_windows(&mut self) {
        for limiter in &mut self.limiters {
            limiter.window.clear();
        }
        self.generation += 1;
    }

    fn governing(&self, path: &str) -> Option<usize> {
        let mut best = None;
        for (idx, limiter) in self.limiters.iter().enumerate() {
            if let Some(specificity) = limiter.mapping.specificity(path) {
                match best {
                    Some((_, current)) if current >= specificity => {}
                    _ => best = Some((idx, specificity)),
                }
            }
        }
        best.map(|(idx, _)| idx)
    }

    fn prune_all(&mut self, now: Instant) {
        for limiter in &mut self.limiters {
            self.resumable += limiter.window.prune(limiter.mapping.window(), now);
        }
    }

    fn limiter_mut(&mut self, permit: Permit) -> Option<&mut Limiter> {
        if permit.generation != self.generation {
            return None;
        }
        self.limiters.get_mut(permit.limiter)
    }
}
