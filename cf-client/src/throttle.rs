//! Async gate in front of the UAA throttler
//!
//! [`UaaThrottle`] wraps a [`cf_throttle::Throttler`] behind a mutex and lets
//! callers wait for a free slot. Every UAA operation acquires a
//! [`ThrottleToken`] before it is sent and activates it at dispatch.
//!
//! Delayed callers sit in a waiting queue. Whenever the core reports freed
//! slots, that many waiters are signalled from the head of the queue. A
//! caller that is never signalled re-checks once the core's `retry_after`
//! hint has elapsed and keeps its place if it has to wait again. A signalled
//! caller competes again with new arrivals, so admission itself is not FIFO;
//! if it loses, it goes back to the head of the queue.

use cf_throttle::{Admission, LimiterMapping, LimiterStatus, Permit, ThrottleError, Throttler};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

const MIN_DELAY: Duration = Duration::from_millis(1);

struct Waiter {
    ticket: u64,
    signal: oneshot::Sender<()>,
}

#[derive(Default)]
struct Inner {
    throttler: Throttler,
    waiters: VecDeque<Waiter>,
    next_ticket: u64,
}

impl Inner {
    /// Queues a delayed caller, keeping the place of a returning `ticket`
    fn enqueue(&mut self, ticket: Option<u64>, signal: oneshot::Sender<()>) -> u64 {
        let Some(ticket) = ticket else {
            let ticket = self.next_ticket;
            self.next_ticket += 1;
            self.waiters.push_back(Waiter { ticket, signal });
            return ticket;
        };

        match self.waiters.iter_mut().find(|waiter| waiter.ticket == ticket) {
            Some(waiter) => waiter.signal = signal,
            // Signalled earlier but lost the slot to a new arrival
            None => self.waiters.push_front(Waiter { ticket, signal }),
        }
        ticket
    }

    fn dequeue(&mut self, ticket: Option<u64>) {
        if let Some(ticket) = ticket {
            self.waiters.retain(|waiter| waiter.ticket != ticket);
        }
    }

    /// Signals as many waiters as the core freed slots
    fn resume(&mut self) {
        let mut freed = self.throttler.take_resumable();
        while freed > 0 {
            match self.waiters.pop_front() {
                // A closed receiver gave up waiting; its signal goes to the next one
                Some(waiter) => {
                    if waiter.signal.send(()).is_ok() {
                        freed -= 1;
                    }
                }
                None => break,
            }
        }
    }

    fn resume_all(&mut self) {
        for waiter in self.waiters.drain(..) {
            let _ = waiter.signal.send(());
        }
    }
}

/// Client-side throttle for UAA requests
///
/// Owned by a [`ConnectionContext`](crate::ConnectionContext); clients built
/// from different contexts throttle independently.
#[derive(Default)]
pub struct UaaThrottle {
    inner: Mutex<Inner>,
    delays: AtomicUsize,
}

impl UaaThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one limiter mapping as configured on the UAA server
    pub fn add_limiter_mapping(&self, mapping: LimiterMapping) -> Result<(), ThrottleError> {
        tracing::debug!(
            "Adding UAA limiter {}: {} calls per {}s",
            mapping.name(),
            mapping.limit(),
            mapping.time_base()
        );
        self.inner.lock().throttler.add_limiter_mapping(mapping)
    }

    pub fn has_mappings(&self) -> bool {
        self.inner.lock().throttler.has_mappings()
    }

    /// Removes every mapping and lets all waiting callers through
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.throttler.reset();
        inner.resume_all();
        self.delays.store(0, Ordering::Relaxed);
    }

    /// Whether a call to `path` would have to wait right now
    ///
    /// Also prunes expired windows and signals waiters for the freed slots.
    pub fn check_delay_needed_and_resume(&self, path: &str) -> bool {
        let mut inner = self.inner.lock();
        let check = inner
            .throttler
            .check_delay_needed_and_resume(path, Instant::now());
        inner.resume();
        check.delay_needed
    }

    /// Waits until a call to `path` may be sent
    pub async fn acquire(self: &Arc<Self>, path: &str) -> ThrottleToken {
        let mut ticket = None;
        loop {
            let (signal, retry_after) = {
                let mut inner = self.inner.lock();
                let admission = inner.throttler.try_acquire(path, Instant::now());
                if !matches!(admission, Admission::Delayed(_)) {
                    inner.dequeue(ticket);
                }
                inner.resume();

                match admission {
                    Admission::Unthrottled => return ThrottleToken::unthrottled(),
                    Admission::Granted(permit) => {
                        tracing::trace!("UAA throttle granted {path}: {:?}", inner.throttler.status());
                        return ThrottleToken {
                            throttle: Some(Arc::clone(self)),
                            permit: Some(permit),
                            activated: false,
                        };
                    }
                    Admission::Delayed(delay) => {
                        let (tx, rx) = oneshot::channel();
                        ticket = Some(inner.enqueue(ticket, tx));
                        tracing::trace!(
                            "UAA throttle delays {path} on limiter {} for up to {:?}",
                            delay.limiter,
                            delay.retry_after
                        );
                        (rx, delay.retry_after.max(MIN_DELAY))
                    }
                }
            };

            self.do_delay(signal, retry_after).await;
        }
    }

    /// Suspends until resumed or until `retry_after` has elapsed
    async fn do_delay(&self, signal: oneshot::Receiver<()>, retry_after: Duration) {
        self.delays.fetch_add(1, Ordering::Relaxed);
        let _ = tokio::time::timeout(retry_after, signal).await;
    }

    /// Number of suspensions since creation or the last reset
    ///
    /// A caller that re-checks after `retry_after` and has to wait again is
    /// suspended again, so this can exceed the number of delayed calls.
    pub fn delay_count(&self) -> usize {
        self.delays.load(Ordering::Relaxed)
    }

    /// True once every window is empty and nobody is waiting
    pub fn verify_all_queues_empty(&self) -> bool {
        let mut inner = self.inner.lock();
        let idle = inner.throttler.is_idle(Instant::now());
        inner.resume();
        inner.waiters.retain(|waiter| !waiter.signal.is_closed());
        idle && inner.waiters.is_empty()
    }

    pub fn status(&self) -> Vec<LimiterStatus> {
        self.inner.lock().throttler.status()
    }

    fn activate(&self, permit: Permit) {
        self.inner.lock().throttler.activate(permit, Instant::now());
    }

    fn release(&self, permit: Permit) {
        let mut inner = self.inner.lock();
        inner.throttler.release(permit);
        inner.resume();
    }
}

/// A slot in a UAA limiter window
///
/// Call [`activate`](Self::activate) right before the request is sent.
/// Dropping a token that was never activated frees its slot.
#[derive(Default)]
pub struct ThrottleToken {
    throttle: Option<Arc<UaaThrottle>>,
    permit: Option<Permit>,
    activated: bool,
}

impl ThrottleToken {
    /// A token for a path no limiter governs
    pub fn unthrottled() -> Self {
        Self::default()
    }

    pub fn is_throttled(&self) -> bool {
        self.permit.is_some()
    }

    /// Starts the window of this call
    pub fn activate(&mut self) {
        if self.activated {
            return;
        }
        if let (Some(throttle), Some(permit)) = (&self.throttle, self.permit) {
            throttle.activate(permit);
        }
        self.activated = true;
    }
}

impl Drop for ThrottleToken {
    fn drop(&mut self) {
        if self.activated {
            return;
        }
        if let (Some(throttle), Some(permit)) = (self.throttle.take(), self.permit.take()) {
            throttle.release(permit);
        }
    }
}

impl std::fmt::Debug for ThrottleToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThrottleToken")
            .field("permit", &self.permit)
            .field("activated", &self.activated)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cf_throttle::PathSelector;

    fn throttle(limit: i64) -> Arc<UaaThrottle> {
        let throttle = Arc::new(UaaThrottle::new());
        throttle
            .add_limiter_mapping(
                LimiterMapping::builder()
                    .name("test")
                    .time_base(1)
                    .limit(limit)
                    .path_selector(PathSelector::starts_with("/Groups"))
                    .build()
                    .unwrap(),
            )
            .unwrap();
        throttle
    }

    #[tokio::test]
    async fn test_without_mappings_nothing_waits() {
        let throttle = Arc::new(UaaThrottle::new());
        for _ in 0..10 {
            let mut token = throttle.acquire("/Groups").await;
            assert!(!token.is_throttled());
            token.activate();
        }
        assert_eq!(throttle.delay_count(), 0);
        assert!(!throttle.check_delay_needed_and_resume("/Groups"));
    }

    #[tokio::test]
    async fn test_unmatched_path_passes_through() {
        let throttle = throttle(1);
        let mut first = throttle.acquire("/Groups/a").await;
        first.activate();

        let token = throttle.acquire("/Users").await;
        assert!(!token.is_throttled());
        assert_eq!(throttle.delay_count(), 0);
    }

    #[tokio::test]
    async fn test_caller_waits_for_window_rollover() {
        let throttle = throttle(1);
        let start = Instant::now();

        let mut first = throttle.acquire("/Groups/a").await;
        first.activate();
        assert!(throttle.check_delay_needed_and_resume("/Groups/b"));

        let mut second = throttle.acquire("/Groups/b").await;
        second.activate();

        assert!(start.elapsed() >= Duration::from_secs(1));
        assert!(throttle.delay_count() >= 1);
    }

    #[tokio::test]
    async fn test_dropped_token_wakes_waiter() {
        let throttle = throttle(1);
        let pending = throttle.acquire("/Groups/a").await;

        let waiter = {
            let throttle = Arc::clone(&throttle);
            tokio::spawn(async move {
                let start = Instant::now();
                let mut token = throttle.acquire("/Groups/b").await;
                token.activate();
                start.elapsed()
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(pending);

        let waited = waiter.await.unwrap();
        assert!(waited < Duration::from_millis(500), "waited {waited:?}");
        assert_eq!(throttle.delay_count(), 1);
    }

    #[tokio::test]
    async fn test_release_signals_the_waiting_task() {
        let throttle = throttle(1);
        let pending = throttle.acquire("/Groups/a").await;

        let mut waiter = tokio_test::task::spawn(throttle.acquire("/Groups/b"));
        tokio_test::assert_pending!(waiter.poll());

        drop(pending);
        assert!(waiter.is_woken());
        let mut token = tokio_test::assert_ready!(waiter.poll());
        assert!(token.is_throttled());
        token.activate();
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiter_keeps_its_place_after_timing_out() {
        let throttle = throttle(1);
        let pending = throttle.acquire("/Groups/a").await;

        let mut early = tokio_test::task::spawn(throttle.acquire("/Groups/b"));
        let mut late = tokio_test::task::spawn(throttle.acquire("/Groups/c"));
        tokio_test::assert_pending!(early.poll());
        tokio_test::assert_pending!(late.poll());

        // Both time out; the late caller re-checks first
        tokio::time::advance(Duration::from_millis(1500)).await;
        assert!(early.is_woken() && late.is_woken());
        tokio_test::assert_pending!(late.poll());
        tokio_test::assert_pending!(early.poll());
        assert_eq!(throttle.delay_count(), 4);

        drop(pending);
        assert!(early.is_woken());
        assert!(!late.is_woken());
        let mut token = tokio_test::assert_ready!(early.poll());
        token.activate();
        tokio_test::assert_pending!(late.poll());
    }

    #[tokio::test]
    async fn test_reset_releases_waiters() {
        let throttle = throttle(1);
        let mut first = throttle.acquire("/Groups/a").await;
        first.activate();

        let waiter = {
            let throttle = Arc::clone(&throttle);
            tokio::spawn(async move { throttle.acquire("/Groups/b").await.is_throttled() })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        throttle.reset();

        assert!(!waiter.await.unwrap());
        assert!(!throttle.has_mappings());
        assert_eq!(throttle.delay_count(), 0);
    }

    #[tokio::test]
    async fn test_queues_empty_after_window() {
        let throttle = throttle(2);
        for path in ["/Groups/a", "/Groups/b"] {
            let mut token = throttle.acquire(path).await;
            token.activate();
        }
        assert!(!throttle.verify_all_queues_empty());
        assert_eq!(throttle.status()[0].in_window, 2);

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(throttle.verify_all_queues_empty());
    }

    #[tokio::test]
    async fn test_unlimited_mapping_never_delays() {
        let throttle = throttle(-1);
        for _ in 0..5 {
            let mut token = throttle.acquire("/Groups").await;
            assert!(!token.is_throttled());
            token.activate();
        }
        assert_eq!(throttle.delay_count(), 0);
    }
}
