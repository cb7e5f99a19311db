//! Harness that runs many sessions concurrently
//!
//! Each simulated user gets its own tokio task, HTTP client and RNG. The only
//! state shared between users is the statistics sink and the metrics.

use std::sync::Arc;
use std::time::Duration;

use mga_profile::Catalog;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{Result, SessionError};
use crate::metrics::LoadgenMetrics;
use crate::session::{ActionOutcome, Session, SessionConfig};
use crate::stats::{RequestStats, StatsSnapshot};
use crate::transport::HttpTransport;

/// Swarm parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SwarmConfig {
    /// Base URL of the target service
    pub host: String,

    /// Number of concurrent simulated users
    pub users: usize,

    /// Users started per second
    pub spawn_rate: f64,

    /// Stop after this long; run until cancelled when unset
    pub run_time: Option<Duration>,

    /// Per-request timeout; client default when unset
    pub timeout: Option<Duration>,

    /// Base seed; user `i` is seeded with `seed + i`
    pub seed: Option<u64>,

    pub session: SessionConfig,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:8000".to_string(),
            users: 1,
            spawn_rate: 1.0,
            run_time: None,
            timeout: None,
            seed: None,
            session: SessionConfig::default(),
        }
    }
}

impl SwarmConfig {
    /// Delay between two user starts
    pub fn spawn_interval(&self) -> Result<Duration> {
        if !self.spawn_rate.is_finite() || self.spawn_rate <= 0.0 {
            return Err(SessionError::InvalidHarness(format!(
                "spawn rate must be positive, got {}",
                self.spawn_rate
            )));
        }
        Duration::try_from_secs_f64(1.0 / self.spawn_rate).map_err(|_| {
            SessionError::InvalidHarness(format!(
                "spawn rate {} is too small to schedule users",
                self.spawn_rate
            ))
        })
    }
}

type HttpSession = Session<HttpTransport, StdRng>;

pub struct Swarm {
    config: SwarmConfig,
    spawn_interval: Duration,
    catalog: Arc<Catalog>,
    stats: Arc<RequestStats>,
    metrics: Option<Arc<LoadgenMetrics>>,
}

impl Swarm {
    pub fn new(config: SwarmConfig, catalog: Catalog) -> Result<Self> {
        config.session.validate()?;
        if config.users == 0 {
            return Err(SessionError::InvalidHarness(
                "at least one user is required".to_string(),
            ));
        }
        let spawn_interval = config.spawn_interval()?;
        HttpTransport::new(&config.host, config.timeout)?;

        Ok(Self {
            config,
            spawn_interval,
            catalog: Arc::new(catalog),
            stats: Arc::new(RequestStats::new()),
            metrics: None,
        })
    }

    pub fn with_metrics(mut self, metrics: Arc<LoadgenMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn stats(&self) -> Arc<RequestStats> {
        self.stats.clone()
    }

    /// Spawn users and drive them until the run time elapses or `shutdown`
    /// is cancelled. Returns the final statistics.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<StatsSnapshot> {
        let stop = shutdown.child_token();

        let timer = self.config.run_time.map(|run_time| {
            let stop = stop.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = tokio::time::sleep(run_time) => {
                        info!("Run time of {:?} elapsed, stopping sessions", run_time);
                        stop.cancel();
                    }
                    _ = stop.cancelled() => {}
                }
            })
        });

        if !self.config.session.verify_tls {
            warn!("TLS certificate verification is disabled for {}", self.config.host);
        }

        info!(
            "Starting {} users at {:.2}/s against {} (catalog '{}')",
            self.config.users,
            self.config.spawn_rate,
            self.config.host,
            self.catalog.name()
        );

        let mut sessions = JoinSet::new();

        for user in 0..self.config.users {
            if stop.is_cancelled() {
                break;
            }

            let session = match self.build_session(user) {
                Ok(session) => session,
                Err(e) => {
                    stop.cancel();
                    return Err(e);
                }
            };
            sessions.spawn(run_session(
                session,
                self.stats.clone(),
                self.metrics.clone(),
                stop.clone(),
            ));

            if user + 1 < self.config.users {
                tokio::select! {
                    _ = tokio::time::sleep(self.spawn_interval) => {}
                    _ = stop.cancelled() => break,
                }
            }
        }
        info!("{} sessions spawned", sessions.len());

        while let Some(result) = sessions.join_next().await {
            if let Err(e) = result {
                error!("Session task failed: {}", e);
            }
        }

        stop.cancel();
        if let Some(timer) = timer {
            if let Err(e) = timer.await {
                error!("Run time timer failed: {}", e);
            }
        }

        let snapshot = self.stats.snapshot();
        info!(
            "Swarm stopped after {:.1}s: {} requests, {} failures",
            snapshot.elapsed_secs, snapshot.total.requests, snapshot.total.failures
        );
        Ok(snapshot)
    }

    fn build_session(&self, user: usize) -> Result<HttpSession> {
        let rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(user as u64)),
            None => StdRng::from_entropy(),
        };
        let transport = HttpTransport::new(&self.config.host, self.config.timeout)?;

        Session::configure(
            self.catalog.clone(),
            self.config.session.clone(),
            transport,
            rng,
        )
    }
}

async fn run_session(
    mut session: HttpSession,
    stats: Arc<RequestStats>,
    metrics: Option<Arc<LoadgenMetrics>>,
    stop: CancellationToken,
) {
    let id = session.id();
    if let Some(metrics) = &metrics {
        metrics.active_sessions.inc();
    }

    let started = session.on_session_start().await;
    let fatal = matches!(&started, Err(e) if e.action().is_none());
    record(&stats, metrics.as_deref(), started, id);

    if !fatal {
        loop {
            if stop.is_cancelled() {
                break;
            }

            let outcome = session.select_and_run_action().await;
            record(&stats, metrics.as_deref(), outcome, id);

            tokio::select! {
                _ = stop.cancelled() => break,
                _ = session.wait_interval() => {}
            }
        }
    }

    if let Some(metrics) = &metrics {
        metrics.active_sessions.dec();
    }
    debug!(session = %id, "Session stopped");
}

fn record(
    stats: &RequestStats,
    metrics: Option<&LoadgenMetrics>,
    outcome: std::result::Result<ActionOutcome, SessionError>,
    session: uuid::Uuid,
) {
    match outcome {
        Ok(outcome) => {
            stats.record(&outcome);
            if let Some(metrics) = metrics {
                metrics.observe(&outcome);
            }
        }
        Err(e) => match e.action() {
            Some(action) => {
                warn!(session = %session, "{}", e);
                stats.record_failure(action);
                if let Some(metrics) = metrics {
                    metrics.observe_failure(action);
                }
            }
            None => error!(session = %session, "Session cannot run: {}", e),
        },
    }
}
