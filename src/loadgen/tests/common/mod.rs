//! Shared test fixtures: an in-memory transport and a local HTTP target

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use mga_loadgen::{Transport, TransportError, TransportResponse};
use mga_profile::RenderedRequest;
use parking_lot::Mutex;

/// Records every request and answers with the status encoded in the path
#[derive(Default)]
pub struct RecordingTransport {
    pub requests: Arc<Mutex<Vec<RenderedRequest>>>,
    pub verify_tls: Arc<Mutex<Option<bool>>>,
    pub unreachable: bool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn start(&mut self, verify_tls: bool) -> Result<(), TransportError> {
        *self.verify_tls.lock() = Some(verify_tls);
        Ok(())
    }

    async fn execute(
        &self,
        request: &RenderedRequest,
    ) -> Result<TransportResponse, TransportError> {
        self.requests.lock().push(request.clone());
        if self.unreachable {
            return Err(TransportError::Unreachable("connection refused".to_string()));
        }

        let number = request.trailing_number();
        let response = if request.path.starts_with("/httpbin/status/")
            || request.path.starts_with("/errors/")
        {
            TransportResponse {
                status: number.unwrap_or(400) as u16,
                bytes: 0,
            }
        } else if request.path.starts_with("/httpbin/bytes/") {
            TransportResponse {
                status: 200,
                bytes: number.unwrap_or(0) as usize,
            }
        } else {
            TransportResponse {
                status: 200,
                bytes: 2,
            }
        };
        Ok(response)
    }
}

/// A request seen by the test server
#[derive(Debug, Clone)]
pub struct Hit {
    pub method: Method,
    pub path: String,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub hits: Arc<Mutex<Vec<Hit>>>,
}

impl TestServer {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn hits(&self) -> Vec<Hit> {
        self.hits.lock().clone()
    }
}

/// Start a stand-in for the demo application on an ephemeral port
pub async fn spawn_server() -> TestServer {
    let hits = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new().fallback(handle).with_state(hits.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer { addr, hits }
}

/// Address of a port with nothing listening on it
pub async fn closed_port() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

async fn handle(
    State(hits): State<Arc<Mutex<Vec<Hit>>>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    hits.lock().push(Hit {
        method: method.clone(),
        path: path.clone(),
        content_type: content_type.clone(),
        body: body.to_vec(),
    });

    let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
    match (method, segments.as_slice()) {
        (Method::GET, [""]) => (StatusCode::OK, "index").into_response(),
        (Method::GET, ["hello"]) => (StatusCode::OK, "Hello, World!").into_response(),
        (Method::POST, ["hello"]) => say_hello(content_type.as_deref(), &body),
        (Method::GET, ["httpbin", "status", code]) | (Method::GET, ["errors", code]) => {
            let status = code
                .parse::<u16>()
                .ok()
                .and_then(|c| StatusCode::from_u16(c).ok())
                .unwrap_or(StatusCode::BAD_REQUEST);
            status.into_response()
        }
        (Method::GET, ["httpbin", "bytes", n]) => match n.parse::<usize>() {
            Ok(n) => (StatusCode::OK, vec![0u8; n]).into_response(),
            Err(_) => StatusCode::BAD_REQUEST.into_response(),
        },
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

fn say_hello(content_type: Option<&str>, body: &[u8]) -> Response {
    if content_type != Some("application/json") {
        return StatusCode::UNSUPPORTED_MEDIA_TYPE.into_response();
    }

    let who = serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("who").and_then(|w| w.as_str()).map(str::to_string));

    match who {
        Some(who) => (StatusCode::OK, format!("Hello, {}!", who)).into_response(),
        None => StatusCode::BAD_REQUEST.into_response(),
    }
}
