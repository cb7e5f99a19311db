//! Load generator configuration loading and validation

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use mga_profile::{Catalog, WeightedAction};
use serde::{Deserialize, Serialize};

use crate::session::SessionConfig;
use crate::swarm::SwarmConfig;
use crate::transport::HttpTransport;

/// Complete load generator configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct LoadgenConfig {
    #[serde(default)]
    pub target: TargetSection,

    #[serde(default)]
    pub session: SessionSection,

    #[serde(default)]
    pub profile: ProfileSection,

    #[serde(default)]
    pub harness: HarnessSection,

    #[serde(default)]
    pub metrics: MetricsSection,

    #[serde(default)]
    pub log: LogSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TargetSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default)]
    pub verify_tls: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SessionSection {
    #[serde(default = "default_wait_min")]
    pub wait_min_ms: u64,
    #[serde(default = "default_wait_max")]
    pub wait_max_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProfileSection {
    /// Built-in catalog name, or the name of the inline catalog in `actions`
    #[serde(default = "default_catalog")]
    pub catalog: String,
    #[serde(default)]
    pub weights: BTreeMap<String, u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<WeightedAction>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HarnessSection {
    #[serde(default = "default_users")]
    pub users: usize,
    #[serde(default = "default_spawn_rate")]
    pub spawn_rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_time_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MetricsSection {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_metrics_addr")]
    pub listen_addr: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LogSection {
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions
fn default_host() -> String { "http://localhost:8000".to_string() }
fn default_wait_min() -> u64 { 1000 }
fn default_wait_max() -> u64 { 10000 }
fn default_catalog() -> String { "demo".to_string() }
fn default_users() -> usize { 1 }
fn default_spawn_rate() -> f64 { 1.0 }
fn default_metrics_addr() -> String { "127.0.0.1:9646".to_string() }
fn default_log_level() -> String { "info".to_string() }

impl Default for TargetSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            verify_tls: false,
            timeout_ms: None,
        }
    }
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            wait_min_ms: default_wait_min(),
            wait_max_ms: default_wait_max(),
            seed: None,
        }
    }
}

impl Default for ProfileSection {
    fn default() -> Self {
        Self {
            catalog: default_catalog(),
            weights: BTreeMap::new(),
            actions: Vec::new(),
        }
    }
}

impl Default for HarnessSection {
    fn default() -> Self {
        Self {
            users: default_users(),
            spawn_rate: default_spawn_rate(),
            run_time_secs: None,
        }
    }
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: default_metrics_addr(),
        }
    }
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl LoadgenConfig {
    /// Load configuration from TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read configuration file {:?}", path.as_ref()))?;

        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Failed to parse configuration file")
    }

    /// Validate configuration. Builds the catalog so weight errors surface here.
    pub fn validate(&self) -> Result<()> {
        HttpTransport::new(&self.target.host, None).context("Invalid target host")?;

        self.session_config()
            .validate()
            .context("Invalid session wait bounds")?;

        if self.harness.users == 0 {
            anyhow::bail!("Harness must run at least one user");
        }

        self.swarm_config()
            .spawn_interval()
            .context("Invalid spawn rate")?;

        if self.metrics.enabled {
            self.metrics_addr()?;
        }

        self.log
            .level
            .parse::<tracing::Level>()
            .map_err(|_| anyhow::anyhow!("Unknown log level '{}'", self.log.level))?;

        self.build_catalog()?;
        Ok(())
    }

    /// Resolve the traffic catalog, applying weight overrides
    pub fn build_catalog(&self) -> Result<Catalog> {
        let catalog = if self.profile.actions.is_empty() {
            Catalog::builtin(&self.profile.catalog)?
        } else {
            Catalog::custom(&self.profile.catalog, self.profile.actions.clone())
                .with_context(|| format!("Invalid inline catalog '{}'", self.profile.catalog))?
        };

        if self.profile.weights.is_empty() {
            return Ok(catalog);
        }

        catalog
            .with_weights(&self.profile.weights)
            .context("Invalid weight overrides")
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::new(
            Duration::from_millis(self.session.wait_min_ms),
            Duration::from_millis(self.session.wait_max_ms),
            self.target.verify_tls,
        )
    }

    pub fn swarm_config(&self) -> SwarmConfig {
        SwarmConfig {
            host: self.target.host.clone(),
            users: self.harness.users,
            spawn_rate: self.harness.spawn_rate,
            run_time: self.harness.run_time_secs.map(Duration::from_secs),
            timeout: self.target.timeout_ms.map(Duration::from_millis),
            seed: self.session.seed,
            session: self.session_config(),
        }
    }

    pub fn metrics_addr(&self) -> Result<SocketAddr> {
        self.metrics
            .listen_addr
            .parse()
            .with_context(|| {
                format!("Invalid metrics listen address '{}'", self.metrics.listen_addr)
            })
    }
}
