use super::*;
use crate::config::{AppConfig, Environment};
use crate::gateway::GatewayTimeouts;
use crate::rate_limit::MemoryRateLimitStore;
use std::sync::Arc;

fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in pairs {
        map.insert(*name, HeaderValue::from_static(value));
    }
    map
}

#[test]
fn client_id_prefers_first_forwarded_hop() {
    let h = headers(&[("x-forwarded-for", " 203.0.113.7 , 10.0.0.1"), ("x-real-ip", "198.51.100.2")]);
    assert_eq!(client_id_from(&h, Some("127.0.0.1".into())), "203.0.113.7");
}

#[test]
fn client_id_falls_back_through_sources() {
    let h = headers(&[("x-real-ip", "198.51.100.2")]);
    assert_eq!(client_id_from(&h, Some("127.0.0.1".into())), "198.51.100.2");
    assert_eq!(client_id_from(&HeaderMap::new(), Some("127.0.0.1".into())), "127.0.0.1");
    assert_eq!(client_id_from(&HeaderMap::new(), None), "unknown");
    assert_eq!(client_id_from(&headers(&[("x-forwarded-for", " ")]), None), "unknown");
}

#[test]
fn csp_includes_provider_origin() {
    let csp = content_security_policy("https://generativelanguage.googleapis.com");
    assert!(csp.starts_with("default-src 'self'; script-src 'self';"));
    assert!(csp.ends_with("connect-src 'self' https://generativelanguage.googleapis.com"));
    assert!(HeaderValue::from_str(&csp).is_ok());
    assert!(content_security_policy("").ends_with("connect-src 'self'"));
}

#[tokio::test]
async fn every_response_carries_security_headers() {
    let config = AppConfig::from_lookup(&|_| None).unwrap();
    let state = AppState::with_store(
        Environment::Development,
        &config.rate_limits,
        GatewayTimeouts::default(),
        None,
        Arc::new(MemoryRateLimitStore::new()),
    );
    let router = app(state, config.provider.origin());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .unwrap();
    });

    let http = reqwest::Client::new();
    let health = http.get(format!("http://{addr}/healthz")).send().await.unwrap();
    assert_eq!(health.status(), reqwest::StatusCode::OK);
    let h = health.headers();
    assert_eq!(h["x-content-type-options"], "nosniff");
    assert_eq!(h["x-frame-options"], "DENY");
    assert!(h.contains_key("x-xss-protection"));
    assert!(h.contains_key("referrer-policy"));
    assert!(h.contains_key("strict-transport-security"));
    assert!(h["content-security-policy"].to_str().unwrap().contains("generativelanguage.googleapis.com"));

    let rejected = http
        .post(format!("http://{addr}/api/generateMessage"))
        .body("not json")
        .send()
        .await
        .unwrap();
    assert_eq!(rejected.status(), reqwest::StatusCode::BAD_REQUEST);
    assert_eq!(rejected.headers()["x-frame-options"], "DENY");
}
