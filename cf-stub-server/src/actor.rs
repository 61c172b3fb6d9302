//! Server-side UAA rate limiting
//!
//! The throttler lives in a single task that owns it exclusively; request
//! handlers talk to it over a channel through a cloneable [`ThrottleHandle`].
//! Unlike the client, the server never queues callers: a request over quota
//! is rejected right away.

use anyhow::Result;
use cf_throttle::{Admission, LimiterMapping, LimiterStatus, Throttler};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};

/// Outcome of admitting one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Rejected { limiter: String, retry_after: Duration },
}

/// Message types for the throttle actor
pub enum ThrottleMessage {
    Admit {
        path: String,
        response_tx: oneshot::Sender<Decision>,
    },
    Status {
        response_tx: oneshot::Sender<Vec<LimiterStatus>>,
    },
}

/// Handle to communicate with the throttle actor
#[derive(Clone)]
pub struct ThrottleHandle {
    tx: mpsc::Sender<ThrottleMessage>,
}

impl ThrottleHandle {
    /// Counts a request against its limiter, or rejects it
    pub async fn admit(&self, path: impl Into<String>) -> Result<Decision> {
        let (response_tx, response_rx) = oneshot::channel();

        self.tx
            .send(ThrottleMessage::Admit {
                path: path.into(),
                response_tx,
            })
            .await
            .map_err(|_| anyhow::anyhow!("Throttle actor has shut down"))?;

        response_rx
            .await
            .map_err(|_| anyhow::anyhow!("Throttle actor dropped response channel"))
    }

    /// Snapshot of every limiter
    pub async fn status(&self) -> Result<Vec<LimiterStatus>> {
        let (response_tx, response_rx) = oneshot::channel();

        self.tx
            .send(ThrottleMessage::Status { response_tx })
            .await
            .map_err(|_| anyhow::anyhow!("Throttle actor has shut down"))?;

        response_rx
            .await
            .map_err(|_| anyhow::anyhow!("Throttle actor dropped response channel"))
    }
}

/// The throttle actor
pub struct ThrottleActor;

impl ThrottleActor {
    /// Spawn a new throttle actor enforcing `mappings`
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(
        buffer_size: usize,
        mappings: impl IntoIterator<Item = LimiterMapping>,
    ) -> Result<ThrottleHandle> {
        let mut throttler = Throttler::new();
        for mapping in mappings {
            throttler.add_limiter_mapping(mapping)?;
        }

        let (tx, rx) = mpsc::channel(buffer_size);
        tokio::spawn(run_actor(rx, throttler));

        Ok(ThrottleHandle { tx })
    }
}

async fn run_actor(mut rx: mpsc::Receiver<ThrottleMessage>, mut throttler: Throttler) {
    while let Some(msg) = rx.recv().await {
        match msg {
            ThrottleMessage::Admit { path, response_tx } => {
                let decision = admit(&mut throttler, &path, Instant::now());
                // Ignore send errors - the handler may have gone away
                let _ = response_tx.send(decision);
            }
            ThrottleMessage::Status { response_tx } => {
                let _ = response_tx.send(throttler.status());
            }
        }
    }

    tracing::info!("Throttle actor shutting down");
}

fn admit(throttler: &mut Throttler, path: &str, now: Instant) -> Decision {
    match throttler.try_acquire(path, now) {
        Admission::Unthrottled => Decision::Allowed,
        Admission::Granted(permit) => {
            // The server counts a request from the moment it arrives
            throttler.activate(permit, now);
            Decision::Allowed
        }
        Admission::Delayed(delay) => {
            tracing::debug!(
                "Rejecting {} over limiter {} (retry after {:?})",
                path,
                delay.limiter,
                delay.retry_after
            );
            Decision::Rejected {
                limiter: delay.limiter,
                retry_after: delay.retry_after,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cf_throttle::PathSelector;

    fn groups_limit(limit: i64) -> LimiterMapping {
        LimiterMapping::builder()
            .name("groups")
            .time_base(1)
            .limit(limit)
            .path_selector(PathSelector::starts_with("/Groups"))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_rejects_over_quota() {
        let handle = ThrottleActor::spawn(16, [groups_limit(2)]).unwrap();

        assert_eq!(handle.admit("/Groups").await.unwrap(), Decision::Allowed);
        assert_eq!(handle.admit("/Groups/a").await.unwrap(), Decision::Allowed);
        match handle.admit("/Groups/b").await.unwrap() {
            Decision::Rejected {
                limiter,
                retry_after,
            } => {
                assert_eq!(limiter, "groups");
                assert!(retry_after <= Duration::from_secs(1));
            }
            other => panic!("expected rejection, got {other:?}"),
        }

        // Unmatched paths are never limited
        for _ in 0..10 {
            assert_eq!(handle.admit("/Users").await.unwrap(), Decision::Allowed);
        }
    }

    #[tokio::test]
    async fn test_status_reports_window() {
        let handle = ThrottleActor::spawn(16, [groups_limit(5)]).unwrap();
        handle.admit("/Groups").await.unwrap();

        let status = handle.status().await.unwrap();
        assert_eq!(status.len(), 1);
        assert_eq!(status[0].name, "groups");
        assert_eq!(status[0].in_window, 1);
    }

    #[tokio::test]
    async fn test_concurrent_admissions_respect_limit() {
        let handle = ThrottleActor::spawn(64, [groups_limit(3)]).unwrap();

        let mut tasks = vec![];
        for i in 0..10 {
            let h = handle.clone();
            tasks.push(tokio::spawn(async move { h.admit(format!("/Groups/{i}")).await }));
        }

        let mut allowed = 0;
        for task in tasks {
            if task.await.unwrap().unwrap() == Decision::Allowed {
                allowed += 1;
            }
        }
        assert_eq!(allowed, 3);
    }

    #[tokio::test]
    async fn test_duplicate_mappings_fail_to_spawn() {
        assert!(ThrottleActor::spawn(16, [groups_limit(1), groups_limit(2)]).is_err());
    }
}
