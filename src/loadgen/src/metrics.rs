//! Prometheus metrics for generated traffic

use std::net::SocketAddr;
use std::sync::Arc;

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use warp::Filter;

use crate::session::ActionOutcome;

const NAMESPACE: &str = "mga_loadgen";

pub struct LoadgenMetrics {
    /// Responses by action and status code
    pub requests: IntCounterVec,

    /// Requests that produced no response
    pub failures: IntCounterVec,

    /// Response latency in seconds
    pub latency: HistogramVec,

    /// Sessions currently looping
    pub active_sessions: IntGauge,

    registry: Registry,
}

impl LoadgenMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests = IntCounterVec::new(
            Opts::new("requests_total", "Responses received by action and status")
                .namespace(NAMESPACE),
            &["action", "status"],
        )?;
        registry.register(Box::new(requests.clone()))?;

        let failures = IntCounterVec::new(
            Opts::new("request_failures_total", "Requests that never got a response")
                .namespace(NAMESPACE),
            &["action"],
        )?;
        registry.register(Box::new(failures.clone()))?;

        let latency = HistogramVec::new(
            HistogramOpts::new("request_duration_seconds", "Response latency")
                .namespace(NAMESPACE)
                .buckets(vec![
                    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
                ]),
            &["action"],
        )?;
        registry.register(Box::new(latency.clone()))?;

        let active_sessions = IntGauge::with_opts(
            Opts::new("active_sessions", "Sessions currently running").namespace(NAMESPACE),
        )?;
        registry.register(Box::new(active_sessions.clone()))?;

        Ok(Self {
            requests,
            failures,
            latency,
            active_sessions,
            registry,
        })
    }

    pub fn observe(&self, outcome: &ActionOutcome) {
        self.requests
            .with_label_values(&[&outcome.action, &outcome.status.to_string()])
            .inc();
        self.latency
            .with_label_values(&[&outcome.action])
            .observe(outcome.latency.as_secs_f64());
    }

    pub fn observe_failure(&self, action: &str) {
        self.failures.with_label_values(&[action]).inc();
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Text exposition format
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Serve `/metrics` until `shutdown` is cancelled
pub async fn serve_metrics(
    metrics: Arc<LoadgenMetrics>,
    addr: SocketAddr,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let route = warp::path("metrics")
        .and(warp::path::end())
        .map(move || match metrics.encode() {
            Ok(text) => warp::reply::with_status(text, warp::http::StatusCode::OK),
            Err(e) => {
                warn!("Failed to encode metrics: {}", e);
                warp::reply::with_status(
                    String::new(),
                    warp::http::StatusCode::INTERNAL_SERVER_ERROR,
                )
            }
        });

    let (bound, server) = warp::serve(route)
        .try_bind_with_graceful_shutdown(addr, async move { shutdown.cancelled().await })?;

    info!("Metrics server listening on http://{}/metrics", bound);
    server.await;
    Ok(())
}
