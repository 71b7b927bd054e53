#![allow(clippy::unwrap_used, clippy::expect_used)]

//! The gate as an axum middleware in front of API, page and bypassed routes.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode, header};
use axum::routing::get;
use axum::{Router, middleware};
use chrono::Duration;
use ip_allowlist::domain::AddEntry;
use ip_allowlist::infra::storage;
use ip_allowlist::{IpAllowListConfig, IpAllowListModule, StoreConfig, ip_allowlist_middleware};
use ip_allowlist_sdk::{AllowListStore, NewAllowListEntry};
use portal_security::ManualClock;
use serde_json::{Value, json};
use tower::ServiceExt;

struct Harness {
    module: IpAllowListModule,
    store: Arc<dyn AllowListStore>,
    clock: ManualClock,
}

impl Harness {
    async fn new(entries: &[&str], trust_forwarded_for: bool) -> Self {
        let config = IpAllowListConfig {
            trust_forwarded_for,
            store: StoreConfig::with_dsn("sqlite::memory:"),
            ..IpAllowListConfig::default()
        };
        let store = storage::connect(&config.store).await.unwrap();
        let clock = ManualClock::starting_now();
        let module = IpAllowListModule::with_store(config, store.clone(), Arc::new(clock.clone()));

        for ip in entries {
            module
                .service()
                .add(
                    AddEntry {
                        ip_address: (*ip).to_owned(),
                        description: None,
                        is_active: true,
                    },
                    None,
                )
                .await
                .unwrap();
        }
        Self {
            module,
            store,
            clock,
        }
    }

    fn router(&self) -> Router {
        Router::new()
            .route("/api/ping", get(|| async { "pong" }))
            .route("/dashboard", get(|| async { "dashboard" }))
            .route("/health", get(|| async { "ok" }))
            .route("/login/callback/sso", get(|| async { "callback" }))
            .layer(middleware::from_fn_with_state(
                self.module.gate_state(),
                ip_allowlist_middleware,
            ))
    }

    async fn call(
        &self,
        path: &str,
        peer: &str,
        headers: &[(&str, &str)],
    ) -> (StatusCode, Option<String>, String) {
        let mut builder = Request::builder().uri(path);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let mut req = builder.body(Body::empty()).unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(peer.parse::<SocketAddr>().unwrap()));

        let response = self.router().oneshot(req).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_owned());
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, content_type, String::from_utf8(body.to_vec()).unwrap())
    }
}

#[tokio::test]
async fn listed_network_reaches_the_handler() {
    let harness = Harness::new(&["10.0.0.0/8"], false).await;

    let (status, _, body) = harness.call("/api/ping", "10.20.30.40:5000", &[]).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "pong");
}

#[tokio::test]
async fn denied_api_request_gets_json() {
    let harness = Harness::new(&["10.0.0.0/8"], false).await;

    let (status, content_type, body) = harness.call("/api/ping", "192.168.1.9:5000", &[]).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(content_type.unwrap().starts_with("application/json"));
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(
        body,
        json!({
            "error": "Access denied: IP address not allowed",
            "client_ip": "192.168.1.9",
        })
    );
}

#[tokio::test]
async fn denied_page_request_gets_html() {
    let harness = Harness::new(&["10.0.0.0/8"], false).await;

    let (status, content_type, body) = harness.call("/dashboard", "192.168.1.9:5000", &[]).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(content_type.unwrap().starts_with("text/html"));
    assert!(body.contains("<code>192.168.1.9</code>"));
}

#[tokio::test]
async fn bypass_paths_skip_the_gate() {
    let harness = Harness::new(&[], false).await;

    let (status, _, _) = harness.call("/health", "203.0.113.1:5000", &[]).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = harness
        .call("/login/callback/sso", "203.0.113.1:5000", &[])
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = harness.call("/api/ping", "203.0.113.1:5000", &[]).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn forwarded_header_is_ignored_unless_trusted() {
    let forwarded = [("x-forwarded-for", "10.1.2.3, 172.16.0.1")];

    let untrusted = Harness::new(&["10.0.0.0/8"], false).await;
    let (status, _, _) = untrusted
        .call("/api/ping", "172.16.0.1:443", &forwarded)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let trusted = Harness::new(&["10.0.0.0/8"], true).await;
    let (status, _, _) = trusted.call("/api/ping", "172.16.0.1:443", &forwarded).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn forwarded_entry_text_does_not_match_itself() {
    let harness = Harness::new(&["10.0.0.0/8", "localhost"], true).await;

    for forwarded in ["10.0.0.0/8", "localhost"] {
        let (status, _, body) = harness
            .call("/api/ping", "172.16.0.1:443", &[("x-forwarded-for", forwarded)])
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{forwarded}");
        let body: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body["client_ip"], "unknown");
    }
}

#[tokio::test]
async fn ipv6_entry_admits_the_peer_however_it_was_typed() {
    let harness = Harness::new(&["2001:DB8:0::5"], false).await;

    let (status, _, _) = harness.call("/api/ping", "[2001:db8::5]:5000", &[]).await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn localhost_entry_admits_loopback_peers() {
    let harness = Harness::new(&["localhost"], false).await;

    let (v4, _, _) = harness.call("/api/ping", "127.0.0.1:5000", &[]).await;
    let (v6, _, _) = harness.call("/api/ping", "[::1]:5000", &[]).await;

    assert_eq!(v4, StatusCode::OK);
    assert_eq!(v6, StatusCode::OK);
}

#[tokio::test]
async fn removal_through_the_service_applies_immediately() {
    let harness = Harness::new(&["10.0.0.1"], false).await;
    let (status, _, _) = harness.call("/api/ping", "10.0.0.1:5000", &[]).await;
    assert_eq!(status, StatusCode::OK);

    let service = harness.module.service();
    let id = service.list().await.unwrap()[0].id;
    service.remove(id).await.unwrap();

    let (status, _, _) = harness.call("/api/ping", "10.0.0.1:5000", &[]).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn out_of_band_rows_are_seen_after_the_ttl() {
    let harness = Harness::new(&["10.0.0.1"], false).await;
    let (status, _, _) = harness.call("/api/ping", "10.0.0.9:5000", &[]).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    harness
        .store
        .insert_entry(NewAllowListEntry {
            ip_address: "10.0.0.9".to_owned(),
            description: None,
            is_active: true,
            created_by: None,
        })
        .await
        .unwrap();

    harness.clock.advance(Duration::seconds(299));
    let (status, _, _) = harness.call("/api/ping", "10.0.0.9:5000", &[]).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    harness.clock.advance(Duration::seconds(2));
    let (status, _, _) = harness.call("/api/ping", "10.0.0.9:5000", &[]).await;
    assert_eq!(status, StatusCode::OK);
}
