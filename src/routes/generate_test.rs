use super::*;
use crate::config::{Environment, RateLimits};
use crate::gateway::GatewayTimeouts;
use crate::provider::{CompletionRequest, GeneratedImage, Provider, ProviderError};
use crate::rate_limit::{MemoryRateLimitStore, RateLimitPolicy};
use crate::request::ErrorBody;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use std::time::Duration;

struct MockProvider {
    text: Result<&'static str, u16>,
    image: Result<&'static str, u16>,
}

#[async_trait::async_trait]
impl Provider for MockProvider {
    async fn complete(&self, _request: &CompletionRequest<'_>) -> Result<String, ProviderError> {
        self.text
            .map(str::to_string)
            .map_err(|status| ProviderError::ApiResponse { status, body: String::new() })
    }

    async fn generate_image(&self, _prompt: &str) -> Result<GeneratedImage, ProviderError> {
        self.image
            .map(|b64| GeneratedImage { mime_type: "image/jpeg".into(), base64: b64.into() })
            .map_err(|status| ProviderError::ApiResponse { status, body: String::new() })
    }
}

fn limits(message: u32, image: u32) -> RateLimits {
    RateLimits {
        message: RateLimitPolicy::with_limit(message),
        image: RateLimitPolicy::with_limit(image),
        csp: RateLimitPolicy::with_limit(30),
        sweep_interval: Duration::from_secs(300),
    }
}

fn state_with(provider: Option<MockProvider>, environment: Environment, limits: &RateLimits) -> AppState {
    let provider = provider.map(|p| Arc::new(p) as Arc<dyn Provider>);
    AppState::with_store(
        environment,
        limits,
        GatewayTimeouts::default(),
        provider,
        Arc::new(MemoryRateLimitStore::new()),
    )
}

fn state(text: Result<&'static str, u16>) -> AppState {
    state_with(Some(MockProvider { text, image: Ok("QUJD") }), Environment::Development, &limits(10, 5))
}

fn client() -> ClientId {
    ClientId("10.0.0.1".into())
}

const SINGLE: &str = r#"{"mode":"single","cards":[{"name":"The Lantern","description":"A flame","message":"Trust"}]}"#;

async fn into_parts<T: IntoResponse>(result: Result<T, ApiError>) -> (StatusCode, serde_json::Value) {
    let response: Response = result.into_response();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null))
}

// =========================================================================
// generateMessage
// =========================================================================

#[tokio::test]
async fn message_single_returns_one_message() {
    let result = generate_message(State(state(Ok("Trust the light."))), client(), Bytes::from(SINGLE)).await;
    let (status, body) = into_parts(result).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["messages"], serde_json::json!(["Trust the light."]));
}

#[tokio::test]
async fn message_three_returns_positional_messages() {
    let st = state(Ok(r#"{"past":"a","present":"b","future":"c"}"#));
    let body = r#"{"mode":"three","cards":[
        {"name":"A","description":"a"},{"name":"B","description":"b"},{"name":"C","description":"c"}]}"#;
    let (status, json) = into_parts(generate_message(State(st), client(), Bytes::from(body)).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["messages"], serde_json::json!(["a", "b", "c"]));
}

#[tokio::test]
async fn message_cardinality_mismatch_is_400() {
    let body = r#"{"mode":"three","cards":[{"name":"A","description":"a"},{"name":"B","description":"b"}]}"#;
    let (status, json) = into_parts(generate_message(State(state(Ok("x"))), client(), Bytes::from(body)).await).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let err: ErrorBody = serde_json::from_value(json).unwrap();
    assert!(err.error.contains("exactly 3"));
}

#[tokio::test]
async fn script_injection_is_400_and_penalized() {
    let st = state(Ok("x"));
    let body = r#"{"mode":"single","cards":[{"name":"<SCRIPT>alert(1)</script>","description":"d"}]}"#;
    let (status, _) = into_parts(generate_message(State(st.clone()), client(), Bytes::from(body)).await).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let entry = st.limiters.message.entry(client().as_str()).unwrap();
    assert_eq!(entry.suspicion(), 1 + crate::rate_limit::SECURITY_PENALTY);
}

#[tokio::test]
async fn eleventh_message_in_window_is_429() {
    let st = state(Ok("ok"));
    for _ in 0..10 {
        let (status, _) = into_parts(generate_message(State(st.clone()), client(), Bytes::from(SINGLE)).await).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, json) = into_parts(generate_message(State(st.clone()), client(), Bytes::from(SINGLE)).await).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(json["error"].as_str().unwrap().contains("Too many requests"));

    let other = ClientId("10.0.0.2".into());
    let (status, _) = into_parts(generate_message(State(st), other, Bytes::from(SINGLE)).await).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn provider_quota_is_500_with_details_in_development() {
    let (status, json) =
        into_parts(generate_message(State(state(Err(429))), client(), Bytes::from(SINGLE)).await).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "AI service quota exceeded. Please try again later.");
    assert!(json["details"].is_string());
}

#[tokio::test]
async fn unconfigured_provider_hides_details_in_production() {
    let st = state_with(None, Environment::Production, &limits(10, 5));
    let (status, json) = into_parts(generate_message(State(st), client(), Bytes::from(SINGLE)).await).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "Service temporarily unavailable");
    assert!(json.get("details").is_none());
}

// =========================================================================
// generateImage
// =========================================================================

#[tokio::test]
async fn image_returns_data_uri() {
    let body = r#"{"prompt":"  a lantern in a dark wood  "}"#;
    let (status, json) = into_parts(generate_image(State(state(Ok("x"))), client(), Bytes::from(body)).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["imageUrl"], "data:image/jpeg;base64,QUJD");
}

#[tokio::test]
async fn image_explicit_prompt_is_400() {
    let body = r#"{"prompt":"a NSFW scene"}"#;
    let (status, _) = into_parts(generate_image(State(state(Ok("x"))), client(), Bytes::from(body)).await).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn image_budget_is_stricter_than_message_budget() {
    let st = state(Ok("x"));
    let body = r#"{"prompt":"a lantern"}"#;
    for _ in 0..5 {
        let (status, _) = into_parts(generate_image(State(st.clone()), client(), Bytes::from(body)).await).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, _) = into_parts(generate_image(State(st.clone()), client(), Bytes::from(body)).await).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    // The message endpoint keeps its own window.
    let (status, _) = into_parts(generate_message(State(st), client(), Bytes::from(SINGLE)).await).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn image_failure_is_500() {
    let st = state_with(
        Some(MockProvider { text: Ok("x"), image: Err(403) }),
        Environment::Development,
        &limits(10, 5),
    );
    let (status, json) =
        into_parts(generate_image(State(st), client(), Bytes::from(r#"{"prompt":"a lantern"}"#)).await).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "AI service access denied. Please try again later.");
}
