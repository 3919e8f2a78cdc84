use super::*;
use crate::config::{AppConfig, Environment};
use crate::gateway::GatewayTimeouts;
use crate::rate_limit::MemoryRateLimitStore;
use axum::response::IntoResponse;
use std::collections::HashMap;
use std::sync::Arc;

fn state(csp_limit: &str) -> AppState {
    let env: HashMap<&str, &str> = HashMap::from([("RATE_LIMIT_CSP_PER_WINDOW", csp_limit)]);
    let config = AppConfig::from_lookup(&|key| env.get(key).map(ToString::to_string)).unwrap();
    AppState::with_store(
        Environment::Development,
        &config.rate_limits,
        GatewayTimeouts::default(),
        None,
        Arc::new(MemoryRateLimitStore::new()),
    )
}

fn report(directive: &str, blocked: &str) -> CspReport {
    CspReport {
        violated_directive: directive.into(),
        document_uri: "https://oracle.example/".into(),
        blocked_uri: Some(blocked.into()),
        ..CspReport::default()
    }
}

fn body(directive: &str, blocked: &str) -> Bytes {
    Bytes::from(format!(
        r#"{{"csp-report":{{"document-uri":"https://oracle.example/","violated-directive":"{directive}","blocked-uri":"{blocked}"}}}}"#
    ))
}

fn client() -> ClientId {
    ClientId("10.0.0.9".into())
}

#[test]
fn classify_by_indicator() {
    assert_eq!(classify(&report("script-src 'self'", "eval")), Severity::High);
    assert_eq!(classify(&report("script-src 'self'", "javascript:alert(1)")), Severity::High);
    assert_eq!(classify(&report("style-src 'self'", "inline")), Severity::Medium);
    assert_eq!(classify(&report("img-src 'self'", "https://cdn.example/a.png")), Severity::Low);
}

#[test]
fn script_sample_counts_toward_severity() {
    let mut r = report("script-src-elem", "");
    r.script_sample = Some("EVAL(atob('x'))".into());
    assert_eq!(classify(&r), Severity::High);
}

#[tokio::test]
async fn valid_report_is_204_regardless_of_severity() {
    let st = state("30");
    for blocked in ["eval", "inline", "https://cdn.example/a.png"] {
        let result = csp_report(State(st.clone()), client(), body("script-src 'self'", blocked)).await;
        assert_eq!(result.into_response().status(), StatusCode::NO_CONTENT);
    }
}

#[tokio::test]
async fn missing_required_field_is_400() {
    let bytes = Bytes::from(r#"{"csp-report":{"document-uri":"https://oracle.example/"}}"#);
    let result = csp_report(State(state("30")), client(), bytes).await;
    assert_eq!(result.into_response().status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reports_are_rate_limited() {
    let st = state("2");
    for _ in 0..2 {
        let result = csp_report(State(st.clone()), client(), body("img-src", "x")).await;
        assert_eq!(result.into_response().status(), StatusCode::NO_CONTENT);
    }
    let result = csp_report(State(st), client(), body("img-src", "x")).await;
    assert_eq!(result.into_response().status(), StatusCode::TOO_MANY_REQUESTS);
}
