//! Error types for sessions and transports

use std::time::Duration;

use mga_profile::ProfileError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SessionError>;

/// Failures below the HTTP layer. Error status codes are not transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Target unreachable: {0}")]
    Unreachable(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Transport has not been started")]
    NotStarted,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Profile error: {0}")]
    Profile(#[from] ProfileError),

    #[error("Invalid wait bounds: min {min:?} exceeds max {max:?}")]
    InvalidWaitBounds { min: Duration, max: Duration },

    #[error("Invalid target '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error("Invalid harness settings: {0}")]
    InvalidHarness(String),

    #[error("Session has not been started")]
    NotStarted,

    #[error("Session already started")]
    AlreadyStarted,

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Request '{action}' failed: {source}")]
    Request {
        action: String,
        #[source]
        source: TransportError,
    },
}

impl SessionError {
    /// Name of the action whose request failed, if this is a request failure
    pub fn action(&self) -> Option<&str> {
        match self {
            SessionError::Request { action, .. } => Some(action),
            _ => None,
        }
    }
}
