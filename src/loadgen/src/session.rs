//! One simulated user
//!
//! A [`Session`] visits its catalog's baseline action once, then loops over
//! weighted draws separated by randomized waits. The loop itself belongs to
//! the harness; the session exposes each step.

use std::sync::Arc;
use std::time::{Duration, Instant};

use mga_profile::{Catalog, HttpMethod, RenderedRequest};
use rand::Rng;
use tracing::debug;
use uuid::Uuid;

use crate::error::{Result, SessionError};
use crate::transport::Transport;

/// Per-session behavior profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Lower bound of the pause between actions
    pub wait_min: Duration,

    /// Upper bound of the pause between actions, inclusive
    pub wait_max: Duration,

    /// Verify the target's TLS certificate
    pub verify_tls: bool,
}

impl SessionConfig {
    pub fn new(wait_min: Duration, wait_max: Duration, verify_tls: bool) -> Self {
        Self {
            wait_min,
            wait_max,
            verify_tls,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.wait_min > self.wait_max {
            return Err(SessionError::InvalidWaitBounds {
                min: self.wait_min,
                max: self.wait_max,
            });
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            wait_min: Duration::from_millis(1000),
            wait_max: Duration::from_millis(10000),
            verify_tls: false,
        }
    }
}

/// Observable result of one executed action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    pub action: String,
    pub method: HttpMethod,
    pub path: String,
    pub status: u16,
    pub latency: Duration,
    pub bytes: usize,
}

impl ActionOutcome {
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    pub fn is_server_error(&self) -> bool {
        self.status >= 500
    }
}

pub struct Session<T, R> {
    id: Uuid,
    catalog: Arc<Catalog>,
    config: SessionConfig,
    transport: T,
    rng: R,
    started: bool,
}

impl<T, R> Session<T, R>
where
    T: Transport,
    R: Rng + Send,
{
    /// Establish the session's profile.
    ///
    /// Fails before any request is issued if the wait bounds are inverted. A
    /// catalog always holds at least one positively weighted action, since
    /// `WeightedActionSet` refuses to build otherwise.
    pub fn configure(
        catalog: Arc<Catalog>,
        config: SessionConfig,
        transport: T,
        rng: R,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            id: Uuid::new_v4(),
            catalog,
            config,
            transport,
            rng,
            started: false,
        })
    }

    /// Prepare the client and visit the baseline action once.
    ///
    /// TLS verification is turned off here when the profile asks for it.
    pub async fn on_session_start(&mut self) -> Result<ActionOutcome> {
        if self.started {
            return Err(SessionError::AlreadyStarted);
        }

        self.transport.start(self.config.verify_tls).await?;
        self.started = true;
        debug!(session = %self.id, catalog = self.catalog.name(), "Session started");

        let request = self.catalog.baseline().render(&mut self.rng)?;
        self.execute(request).await
    }

    /// Draw one action by weight and execute it once.
    pub async fn select_and_run_action(&mut self) -> Result<ActionOutcome> {
        if !self.started {
            return Err(SessionError::NotStarted);
        }

        let request = self
            .catalog
            .actions()
            .choose(&mut self.rng)
            .action
            .render(&mut self.rng)?;
        self.execute(request).await
    }

    /// Draw the next pause, uniform over `[wait_min, wait_max]` in milliseconds
    pub fn next_wait(&mut self) -> Duration {
        let min = self.config.wait_min.as_millis() as u64;
        let max = self.config.wait_max.as_millis() as u64;
        Duration::from_millis(self.rng.gen_range(min..=max))
    }

    /// Sleep for [`Session::next_wait`]
    pub async fn wait_interval(&mut self) {
        let wait = self.next_wait();
        tokio::time::sleep(wait).await;
    }

    async fn execute(&self, request: RenderedRequest) -> Result<ActionOutcome> {
        let started = Instant::now();
        let response = self
            .transport
            .execute(&request)
            .await
            .map_err(|source| SessionError::Request {
                action: request.action.clone(),
                source,
            })?;
        let latency = started.elapsed();

        debug!(
            session = %self.id,
            action = %request.action,
            status = response.status,
            latency_ms = latency.as_millis() as u64,
            "{} {}",
            request.method,
            request.path
        );

        Ok(ActionOutcome {
            action: request.action,
            method: request.method,
            path: request.path,
            status: response.status,
            latency,
            bytes: response.bytes,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn is_started(&self) -> bool {
        self.started
    }
}
