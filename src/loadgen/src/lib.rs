//! MGA Load Generator
//!
//! Simulates users of the demo application. Every session visits the index
//! page once, then repeatedly draws a weighted random action from its catalog,
//! executes it, and pauses for a random interval. Error responses are part of
//! the intended traffic and are recorded like any other outcome.

pub mod config;
pub mod error;
pub mod metrics;
pub mod session;
pub mod stats;
pub mod swarm;
pub mod transport;

pub use config::LoadgenConfig;
pub use error::{Result, SessionError, TransportError};
pub use metrics::LoadgenMetrics;
pub use session::{ActionOutcome, Session, SessionConfig};
pub use stats::{ActionSummary, RequestStats, StatsSnapshot};
pub use swarm::{Swarm, SwarmConfig};
pub use transport::{HttpTransport, Transport, TransportResponse};
