use super::*;

async fn body_of(response: Response) -> ErrorBody {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn validation_is_400_with_reason() {
    let response = ApiError::from(ValidationError::InvalidMode).into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_of(response).await;
    assert_eq!(body.error, "Invalid mode: must be 'single' or 'three'");
    assert!(body.details.is_none());
}

#[tokio::test]
async fn window_exceeded_is_429_with_retry_after() {
    let err = RateLimitError::WindowExceeded { limit: 10, window_secs: 60, retry_after_secs: 12 };
    let response = ApiError::from(err).into_response();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers().get(RETRY_AFTER).unwrap(), "12");
}

#[tokio::test]
async fn hard_block_is_429_without_retry_after() {
    let response = ApiError::from(RateLimitError::HardBlocked).into_response();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().get(RETRY_AFTER).is_none());
    assert!(body_of(response).await.error.contains("denied"));
}

#[tokio::test]
async fn generation_details_only_in_development() {
    let err = GenerationError::Quota("status 429".into());

    let dev = ApiError::generation(err.clone(), Environment::Development).into_response();
    assert_eq!(dev.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_of(dev).await;
    assert_eq!(body.error, "AI service quota exceeded. Please try again later.");
    assert_eq!(body.details.as_deref(), Some("provider quota exhausted: status 429"));

    let prod = ApiError::generation(err, Environment::Production).into_response();
    let body = body_of(prod).await;
    assert!(body.details.is_none());
}

#[test]
fn auth_failure_reads_as_unavailable() {
    let err = ApiError::generation(GenerationError::Auth("provider not configured".into()), Environment::Production);
    assert_eq!(err.body().error, "Service temporarily unavailable");
    assert_eq!(err.error_code(), "E_AUTH");
}
