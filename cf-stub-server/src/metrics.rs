//! Request counters for the stub server
//!
//! Plain atomic counters, exported in Prometheus text format on `/metrics`.

use cf_throttle::LimiterStatus;
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// What happened to a received request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// An interaction answered the request
    Matched,
    /// No interaction matched
    Unmatched,
    /// The UAA rate limit rejected the request
    Rejected,
}

pub struct Metrics {
    start_time: Instant,
    pub total_requests: AtomicU64,
    pub matched_requests: AtomicU64,
    pub unmatched_requests: AtomicU64,
    pub rejected_requests: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            total_requests: AtomicU64::new(0),
            matched_requests: AtomicU64::new(0),
            unmatched_requests: AtomicU64::new(0),
            rejected_requests: AtomicU64::new(0),
        }
    }

    pub fn record(&self, outcome: Outcome) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        match outcome {
            Outcome::Matched => self.matched_requests.fetch_add(1, Ordering::Relaxed),
            Outcome::Unmatched => self.unmatched_requests.fetch_add(1, Ordering::Relaxed),
            Outcome::Rejected => self.rejected_requests.fetch_add(1, Ordering::Relaxed),
        };
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Export metrics in Prometheus text format
    pub fn export_prometheus(&self, limiters: &[LimiterStatus]) -> String {
        let mut output = String::with_capacity(1024);

        counter(
            &mut output,
            "cf_stub_uptime_seconds",
            "Time since server start in seconds",
            "gauge",
            self.uptime_seconds(),
        );
        counter(
            &mut output,
            "cf_stub_requests_total",
            "Total number of requests received",
            "counter",
            self.total_requests.load(Ordering::Relaxed),
        );
        counter(
            &mut output,
            "cf_stub_requests_matched",
            "Requests answered by an interaction",
            "counter",
            self.matched_requests.load(Ordering::Relaxed),
        );
        counter(
            &mut output,
            "cf_stub_requests_unmatched",
            "Requests without a matching interaction",
            "counter",
            self.unmatched_requests.load(Ordering::Relaxed),
        );
        counter(
            &mut output,
            "cf_stub_requests_rejected",
            "Requests rejected by the UAA rate limit",
            "counter",
            self.rejected_requests.load(Ordering::Relaxed),
        );

        if !limiters.is_empty() {
            output.push_str("# HELP cf_stub_limiter_in_window Requests counted in the current window\n");
            output.push_str("# TYPE cf_stub_limiter_in_window gauge\n");
            for status in limiters {
                let _ = writeln!(
                    output,
                    "cf_stub_limiter_in_window{{limiter=\"{}\",limit=\"{}\"}} {}",
                    status.name, status.limit, status.in_window
                );
            }
        }

        output
    }
}

fn counter(output: &mut String, name: &str, help: &str, kind: &str, value: u64) {
    let _ = writeln!(output, "# HELP {name} {help}");
    let _ = writeln!(output, "# TYPE {name} {kind}");
    let _ = writeln!(output, "{name} {value}\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcomes_are_counted() {
        let metrics = Metrics::new();
        metrics.record(Outcome::Matched);
        metrics.record(Outcome::Matched);
        metrics.record(Outcome::Rejected);
        metrics.record(Outcome::Unmatched);

        assert_eq!(metrics.total_requests.load(Ordering::Relaxed), 4);
        assert_eq!(metrics.matched_requests.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.rejected_requests.load(Ordering::Relaxed), 1);

        let text = metrics.export_prometheus(&[]);
        assert!(text.contains("cf_stub_requests_total 4"));
        assert!(text.contains("cf_stub_requests_rejected 1"));
        assert!(!text.contains("cf_stub_limiter_in_window"));
    }

    #[test]
    fn test_limiter_gauges_exported() {
        let metrics = Metrics::new();
        let status = [LimiterStatus {
            name: "groups".to_string(),
            limit: 2,
            time_base: 1,
            in_window: 1,
        }];

        let text = metrics.export_prometheus(&status);
        assert!(text.contains("cf_stub_limiter_in_window{limiter=\"groups\",limit=\"2\"} 1"));
    }
}
