//! Selection, retry and health-check behaviour against raw TCP backends.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::Method;
use serde::Deserialize;

use multiclient::config::HealthCheckConfig;
use multiclient::request::{Discard, HookError, Payload, SharedImmediateHook};
use multiclient::{CheckPolicy, MultiClient, MultiClientError};

mod common;
use common::{dead_address, start_mock_backend, MockResponse};

fn counting_hook(counter: Arc<AtomicUsize>) -> SharedImmediateHook {
    Arc::new(move |_: &mut reqwest::Request| -> Result<(), HookError> {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })
}

#[tokio::test]
async fn test_retry_limit_bounds_attempts() {
    let client = MultiClient::new([dead_address().await]);
    client.set_retry_limit(3);
    let attempts = Arc::new(AtomicUsize::new(0));
    client.add_immediate_hook(counting_hook(attempts.clone()));

    let err = client
        .request(Method::GET, "/", Payload::Empty, &mut Discard, &mut Discard, &[])
        .await
        .unwrap_err();

    assert!(matches!(err, MultiClientError::Transport(_)));
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_selection_error_makes_no_attempt() {
    let backend = start_mock_backend(MockResponse::ok("application/json", "{}")).await;
    let client = MultiClient::new([backend.address()]);
    client.set_health_checks(true);
    client.set_retry_limit(5);
    let attempts = Arc::new(AtomicUsize::new(0));
    client.add_immediate_hook(counting_hook(attempts.clone()));

    let err = client
        .request(Method::GET, "/", Payload::Empty, &mut Discard, &mut Discard, &[])
        .await
        .unwrap_err();

    assert!(matches!(err, MultiClientError::NoHealthyAddresses));
    assert_eq!(attempts.load(Ordering::SeqCst), 0);
    assert_eq!(backend.hits(), 0);
}

#[tokio::test]
async fn test_retry_reaches_live_endpoint() {
    let backend = start_mock_backend(MockResponse::ok("application/json", r#"{"ok":true}"#)).await;
    let client = MultiClient::new([dead_address().await, backend.address()]);
    client.set_retry_limit(30);

    #[derive(Debug, Deserialize, PartialEq)]
    struct Reply {
        ok: bool,
    }

    let mut reply: Option<Reply> = None;
    let response = client
        .request(Method::GET, "/status", Payload::Empty, &mut reply, &mut Discard, &[])
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(reply, Some(Reply { ok: true }));
    assert_eq!(backend.hits(), 1);
}

#[tokio::test]
async fn test_quorum_minimums() {
    for (pool_size, expected) in [(4usize, 3usize), (5, 3)] {
        let mut addresses = Vec::new();
        let mut backends = Vec::new();
        for _ in 0..pool_size {
            let backend = start_mock_backend(MockResponse::ok("text/plain", "ok")).await;
            addresses.push(backend.address());
            backends.push(backend);
        }

        let client = MultiClient::new(addresses);
        client.check_quorum().await.unwrap();
        assert_eq!(client.healthy_addresses().await.len(), expected);
    }
}

#[tokio::test]
async fn test_check_policies_report_shortfall() {
    let up = start_mock_backend(MockResponse::ok("text/plain", "ok")).await;
    let client = MultiClient::new([dead_address().await, up.address(), dead_address().await]);
    client
        .set_health_check_timeout(Duration::from_millis(500))
        .unwrap();

    client.check_one().await.unwrap();
    assert_eq!(client.healthy_addresses().await, vec![up.address()]);

    let err = client.check(CheckPolicy::AtLeast(2)).await.unwrap_err();
    assert!(matches!(
        err,
        MultiClientError::InsufficientHealthy { want: 2, have: 1 }
    ));

    let err = client.check_all().await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Not enough healthy addresses configured to meet requested minimum: want 3, have 1"
    );
    assert_eq!(client.healthy_addresses().await, vec![up.address()]);
}

#[tokio::test]
async fn test_suspend_clears_and_resume_restores() {
    let up = start_mock_backend(MockResponse::ok("text/plain", "ok")).await;
    let client = MultiClient::new([up.address()]);
    client.check_all().await.unwrap();
    assert_eq!(client.healthy_addresses().await.len(), 1);

    client.suspend().await;
    assert!(!client.is_active());
    assert!(client.healthy_addresses().await.is_empty());
    assert!(matches!(
        client.check_one().await,
        Err(MultiClientError::Inactive)
    ));

    client.resume();
    assert!(client.healthy_addresses().await.is_empty());
    client.check_one().await.unwrap();
    assert_eq!(client.healthy_addresses().await, vec![up.address()]);
}

#[tokio::test]
async fn test_health_checks_route_to_healthy_only() {
    let up = start_mock_backend(MockResponse::ok("text/plain", "ok")).await;
    let down = start_mock_backend(MockResponse::status(503, "busy")).await;
    let client = MultiClient::new([down.address(), up.address()]);

    client
        .set_health_check(HealthCheckConfig {
            enabled: true,
            path: "/health".into(),
            match_pattern: "^ok$".into(),
            timeout_ms: 1000,
            ..Default::default()
        })
        .unwrap();
    client.check_one().await.unwrap();
    let probes_on_down = down.hits();
    assert_eq!(probes_on_down, 1);

    for _ in 0..10 {
        client
            .request(Method::GET, "/work", Payload::Empty, &mut Discard, &mut Discard, &[])
            .await
            .unwrap();
    }
    assert_eq!(down.hits(), probes_on_down);
    assert_eq!(up.hits(), 11);
}

#[tokio::test]
async fn test_http_probe_requires_body_match() {
    let up = start_mock_backend(MockResponse::ok("text/plain", "status: degraded")).await;
    let client = MultiClient::new([up.address()]);
    client
        .set_health_check(HealthCheckConfig {
            path: "/health".into(),
            match_pattern: "healthy".into(),
            ..Default::default()
        })
        .unwrap();

    assert!(client.check_one().await.is_err());
    assert!(client.healthy_addresses().await.is_empty());
}

#[tokio::test]
async fn test_stale_snapshot_after_pool_shrink() {
    let a = start_mock_backend(MockResponse::ok("text/plain", "ok")).await;
    let b = start_mock_backend(MockResponse::ok("text/plain", "ok")).await;
    let client = MultiClient::new([dead_address().await, b.address()]);
    client.set_health_checks(true);
    client.check_one().await.unwrap();

    client.set_addresses([a.address()]);

    assert!(matches!(
        client.select_address().await,
        Err(MultiClientError::NoHealthyAddresses)
    ));
    assert!(client.healthy_addresses().await.is_empty());
}

#[tokio::test]
async fn test_selection_is_spread_over_pool() {
    let client = MultiClient::new(["h1:80", "h2:80", "h3:80"]);
    let mut seen = HashSet::new();
    for _ in 0..300 {
        seen.insert(client.select_address().await.unwrap());
    }
    assert_eq!(seen.len(), 3);
}

#[tokio::test]
async fn test_concurrent_checks_serialize() {
    let up = start_mock_backend(MockResponse::ok("text/plain", "ok")).await;
    let client = Arc::new(MultiClient::new([up.address(), up.address()]));
    let results = Arc::new(Mutex::new(Vec::new()));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let client = client.clone();
        let results = results.clone();
        handles.push(tokio::spawn(async move {
            let ok = client.check_all().await.is_ok();
            let healthy = client.healthy_addresses().await.len();
            results.lock().unwrap().push(healthy);
            ok
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap());
    }

    assert!(results.lock().unwrap().iter().all(|&n| n == 2));
}
