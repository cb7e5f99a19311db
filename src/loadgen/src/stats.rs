//! Per-action request statistics
//!
//! Error status codes are counted as outcomes, not failures. A failure here is
//! a request that never produced a response.

use std::fmt;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::Serialize;

use crate::session::ActionOutcome;

#[derive(Debug, Default, Clone)]
struct ActionStats {
    requests: u64,
    failures: u64,
    successes: u64,
    client_errors: u64,
    server_errors: u64,
    total_latency: Duration,
    min_latency: Option<Duration>,
    max_latency: Duration,
    bytes: u64,
}

impl ActionStats {
    fn record(&mut self, outcome: &ActionOutcome) {
        self.requests += 1;
        if outcome.is_server_error() {
            self.server_errors += 1;
        } else if outcome.is_client_error() {
            self.client_errors += 1;
        } else {
            self.successes += 1;
        }

        self.total_latency += outcome.latency;
        self.min_latency = Some(
            self.min_latency
                .map_or(outcome.latency, |min| min.min(outcome.latency)),
        );
        self.max_latency = self.max_latency.max(outcome.latency);
        self.bytes += outcome.bytes as u64;
    }

    fn record_failure(&mut self) {
        self.requests += 1;
        self.failures += 1;
    }

    fn merge(&mut self, other: &ActionStats) {
        self.requests += other.requests;
        self.failures += other.failures;
        self.successes += other.successes;
        self.client_errors += other.client_errors;
        self.server_errors += other.server_errors;
        self.total_latency += other.total_latency;
        self.min_latency = match (self.min_latency, other.min_latency) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.max_latency = self.max_latency.max(other.max_latency);
        self.bytes += other.bytes;
    }

    fn summarize(&self, action: &str, elapsed: Duration) -> ActionSummary {
        let responses = self.requests - self.failures;
        let avg_latency_ms = if responses == 0 {
            0.0
        } else {
            self.total_latency.as_secs_f64() * 1000.0 / responses as f64
        };
        let secs = elapsed.as_secs_f64();

        ActionSummary {
            action: action.to_string(),
            requests: self.requests,
            failures: self.failures,
            successes: self.successes,
            client_errors: self.client_errors,
            server_errors: self.server_errors,
            avg_latency_ms,
            min_latency_ms: self
                .min_latency
                .map_or(0.0, |d| d.as_secs_f64() * 1000.0),
            max_latency_ms: self.max_latency.as_secs_f64() * 1000.0,
            bytes: self.bytes,
            requests_per_sec: if secs > 0.0 {
                self.requests as f64 / secs
            } else {
                0.0
            },
        }
    }
}

/// Concurrent statistics sink shared by all sessions of a run
#[derive(Debug)]
pub struct RequestStats {
    actions: DashMap<String, ActionStats>,
    started: Instant,
}

impl RequestStats {
    pub fn new() -> Self {
        Self {
            actions: DashMap::new(),
            started: Instant::now(),
        }
    }

    pub fn record(&self, outcome: &ActionOutcome) {
        self.actions
            .entry(outcome.action.clone())
            .or_default()
            .record(outcome);
    }

    pub fn record_failure(&self, action: &str) {
        self.actions
            .entry(action.to_string())
            .or_default()
            .record_failure();
    }

    /// Total requests recorded so far, failures included
    pub fn total_requests(&self) -> u64 {
        self.actions.iter().map(|entry| entry.requests).sum()
    }

    pub fn requests_for(&self, action: &str) -> u64 {
        self.actions.get(action).map_or(0, |entry| entry.requests)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let elapsed = self.started.elapsed();

        let mut per_action: Vec<(String, ActionStats)> = self
            .actions
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        per_action.sort_by(|a, b| a.0.cmp(&b.0));

        let mut total = ActionStats::default();
        for (_, stats) in &per_action {
            total.merge(stats);
        }

        StatsSnapshot {
            elapsed_secs: elapsed.as_secs_f64(),
            actions: per_action
                .iter()
                .map(|(name, stats)| stats.summarize(name, elapsed))
                .collect(),
            total: total.summarize("Aggregated", elapsed),
        }
    }
}

impl Default for RequestStats {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionSummary {
    pub action: String,
    pub requests: u64,
    pub failures: u64,
    pub successes: u64,
    pub client_errors: u64,
    pub server_errors: u64,
    pub avg_latency_ms: f64,
    pub min_latency_ms: f64,
    pub max_latency_ms: f64,
    pub bytes: u64,
    pub requests_per_sec: f64,
}

/// Point-in-time view of a run, sorted by action name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub elapsed_secs: f64,
    pub actions: Vec<ActionSummary>,
    pub total: ActionSummary,
}

impl StatsSnapshot {
    pub fn action(&self, name: &str) -> Option<&ActionSummary> {
        self.actions.iter().find(|a| a.action == name)
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<16} {:>8} {:>8} {:>8} {:>8} {:>8} {:>10} {:>10} {:>10} {:>8}",
            "Action",
            "Reqs",
            "Fails",
            "2xx/3xx",
            "4xx",
            "5xx",
            "Avg(ms)",
            "Min(ms)",
            "Max(ms)",
            "req/s"
        )?;
        for row in self.actions.iter().chain(std::iter::once(&self.total)) {
            writeln!(
                f,
                "{:<16} {:>8} {:>8} {:>8} {:>8} {:>8} {:>10.1} {:>10.1} {:>10.1} {:>8.2}",
                row.action,
                row.requests,
                row.failures,
                row.successes,
                row.client_errors,
                row.server_errors,
                row.avg_latency_ms,
                row.min_latency_ms,
                row.max_latency_ms,
                row.requests_per_sec
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mga_profile::HttpMethod;

    fn outcome(action: &str, status: u16, latency_ms: u64) -> ActionOutcome {
        ActionOutcome {
            action: action.to_string(),
            method: HttpMethod::Get,
            path: "/".to_string(),
            status,
            latency: Duration::from_millis(latency_ms),
            bytes: 10,
        }
    }

    #[test]
    fn test_status_classification() {
        let stats = RequestStats::new();
        stats.record(&outcome("index", 200, 5));
        stats.record(&outcome("clientErrors", 404, 5));
        stats.record(&outcome("serverErrors", 503, 5));
        stats.record(&outcome("index", 302, 5));

        let snapshot = stats.snapshot();
        let index = snapshot.action("index").unwrap();
        assert_eq!(index.successes, 2);
        assert_eq!(index.failures, 0);
        assert_eq!(snapshot.action("clientErrors").unwrap().client_errors, 1);
        assert_eq!(snapshot.action("serverErrors").unwrap().server_errors, 1);
        assert_eq!(snapshot.total.requests, 4);
        assert_eq!(snapshot.total.failures, 0);
    }

    #[test]
    fn test_failures_do_not_skew_latency() {
        let stats = RequestStats::new();
        stats.record(&outcome("index", 200, 10));
        stats.record(&outcome("index", 200, 30));
        stats.record_failure("index");

        let snapshot = stats.snapshot();
        let index = snapshot.action("index").unwrap();
        assert_eq!(index.requests, 3);
        assert_eq!(index.failures, 1);
        assert!((index.avg_latency_ms - 20.0).abs() < 1e-9);
        assert!((index.min_latency_ms - 10.0).abs() < 1e-9);
        assert!((index.max_latency_ms - 30.0).abs() < 1e-9);
        assert_eq!(stats.total_requests(), 3);
        assert_eq!(stats.requests_for("index"), 3);
    }

    #[test]
    fn test_snapshot_sorted_and_rendered() {
        let stats = RequestStats::new();
        stats.record(&outcome("sayHello", 200, 1));
        stats.record(&outcome("helloWorld", 200, 1));

        let snapshot = stats.snapshot();
        let names: Vec<_> = snapshot.actions.iter().map(|a| a.action.as_str()).collect();
        assert_eq!(names, vec!["helloWorld", "sayHello"]);

        let table = snapshot.to_string();
        assert!(table.contains("helloWorld"));
        assert!(table.contains("Aggregated"));
    }
}
