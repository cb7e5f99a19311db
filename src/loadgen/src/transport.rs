//! HTTP transport used by sessions
//!
//! [`Transport`] is the seam between a session and the network. Sessions only
//! see status codes and body sizes; every status code, 4xx and 5xx included,
//! is a successful transport call.

use std::time::Duration;

use async_trait::async_trait;
use mga_profile::{HttpMethod, RenderedRequest};
use reqwest::{Client, Method, Url};
use tracing::debug;

use crate::error::{Result, SessionError, TransportError};

/// What a transport observed for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub bytes: usize,
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Prepare the underlying client. Called once per session.
    async fn start(&mut self, verify_tls: bool) -> std::result::Result<(), TransportError>;

    /// Issue a single request. No retries.
    async fn execute(
        &self,
        request: &RenderedRequest,
    ) -> std::result::Result<TransportResponse, TransportError>;
}

/// `reqwest`-backed transport, one client per session
pub struct HttpTransport {
    base_url: String,
    timeout: Option<Duration>,
    client: Option<Client>,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let parsed = Url::parse(base_url).map_err(|e| SessionError::InvalidTarget {
            target: base_url.to_string(),
            reason: e.to_string(),
        })?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(SessionError::InvalidTarget {
                target: base_url.to_string(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            client: None,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> std::result::Result<Url, TransportError> {
        Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|e| TransportError::InvalidRequest(format!("{}: {}", path, e)))
    }
}

fn to_reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
        HttpMethod::Head => Method::HEAD,
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn start(&mut self, verify_tls: bool) -> std::result::Result<(), TransportError> {
        let mut builder = Client::builder().danger_accept_invalid_certs(!verify_tls);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        if !verify_tls {
            debug!("TLS certificate verification disabled for {}", self.base_url);
        }

        self.client = Some(builder.build()?);
        Ok(())
    }

    async fn execute(
        &self,
        request: &RenderedRequest,
    ) -> std::result::Result<TransportResponse, TransportError> {
        let client = self.client.as_ref().ok_or(TransportError::NotStarted)?;
        let url = self.url_for(&request.path)?;

        let mut builder = client.request(to_reqwest_method(request.method), url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_connect() {
                TransportError::Unreachable(e.to_string())
            } else {
                TransportError::Http(e)
            }
        })?;

        let status = response.status().as_u16();
        let bytes = response.bytes().await?.len();

        Ok(TransportResponse { status, bytes })
    }
}
