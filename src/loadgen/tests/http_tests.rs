//! Sessions against a real HTTP listener

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::http::Method;
use common::{closed_port, spawn_server};
use mga_loadgen::{HttpTransport, Session, SessionConfig, SessionError, TransportError};
use mga_profile::Catalog;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio_test::{assert_err, assert_ok};

fn http_session(host: &str, catalog: Catalog, seed: u64) -> Session<HttpTransport, StdRng> {
    Session::configure(
        Arc::new(catalog),
        SessionConfig::new(Duration::from_millis(1), Duration::from_millis(2), false),
        HttpTransport::new(host, Some(Duration::from_secs(5))).unwrap(),
        StdRng::seed_from_u64(seed),
    )
    .unwrap()
}

#[tokio::test]
async fn test_hello_catalog_round_trip() {
    let server = spawn_server().await;
    let mut session = http_session(&server.url(), Catalog::hello().unwrap(), 17);

    let first = assert_ok!(session.on_session_start().await);
    assert_eq!(first.action, "index");
    assert_eq!(first.status, 200);

    let mut said_hello = 0;
    for _ in 0..150 {
        let outcome = assert_ok!(session.select_and_run_action().await);
        match outcome.action.as_str() {
            "index" | "helloWorld" => assert_eq!(outcome.status, 200),
            "sayHello" => {
                assert_eq!(outcome.status, 200);
                said_hello += 1;
            }
            "clientErrors" => assert!([400, 403, 404].contains(&outcome.status)),
            "serverErrors" => assert!([500, 503].contains(&outcome.status)),
            other => panic!("unexpected action {}", other),
        }
    }
    assert!(said_hello > 0);

    let hits = server.hits();
    assert_eq!(hits.len(), 151);
    assert_eq!(hits[0].method, Method::GET);
    assert_eq!(hits[0].path, "/");

    for hit in hits.iter().filter(|h| h.method == Method::POST) {
        assert_eq!(hit.path, "/hello");
        assert_eq!(hit.content_type.as_deref(), Some("application/json"));
        assert_eq!(hit.body, br#"{"who":"John"}"#.to_vec());
    }
}

#[tokio::test]
async fn test_demo_catalog_error_statuses_are_outcomes() {
    let server = spawn_server().await;
    let mut session = http_session(&server.url(), Catalog::demo().unwrap(), 99);
    assert_ok!(session.on_session_start().await);

    let mut saw_server_error = false;
    let mut saw_client_error = false;
    for _ in 0..100 {
        let outcome = assert_ok!(session.select_and_run_action().await);
        saw_client_error |= outcome.is_client_error();
        saw_server_error |= outcome.is_server_error();

        if outcome.action == "responseSize" {
            let n: usize = outcome.path.rsplit('/').next().unwrap().parse().unwrap();
            assert_eq!(outcome.status, 200);
            assert_eq!(outcome.bytes, n);
        }
    }

    assert!(saw_client_error);
    assert!(saw_server_error);
}

#[tokio::test]
async fn test_unreachable_target_is_reported() {
    let addr = closed_port().await;
    let mut session = http_session(&format!("http://{}", addr), Catalog::demo().unwrap(), 1);

    let err = assert_err!(session.on_session_start().await);
    assert_eq!(err.action(), Some("index"));
    assert!(matches!(
        err,
        SessionError::Request {
            source: TransportError::Unreachable(_) | TransportError::Http(_),
            ..
        }
    ));
}
