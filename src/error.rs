//! HTTP edge of the error taxonomy.
//!
//! Validation → 400, rate limiting → 429, every generation failure → 500.
//! 500 bodies carry a stable per-class message; the underlying detail is
//! attached as `details` only outside production.

use axum::Json;
use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::config::Environment;
use crate::gateway::GenerationError;
use crate::rate_limit::RateLimitError;
use crate::request::ErrorBody;
use crate::validate::ValidationError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    RateLimit(#[from] RateLimitError),
    #[error("{error}")]
    Generation { error: GenerationError, expose_details: bool },
}

impl ApiError {
    #[must_use]
    pub fn generation(error: GenerationError, environment: Environment) -> Self {
        Self::Generation { error, expose_details: environment.exposes_details() }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::RateLimit(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::Generation { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(e) => e.error_code(),
            Self::RateLimit(e) => e.error_code(),
            Self::Generation { error, .. } => error.error_code(),
        }
    }

    #[must_use]
    pub fn body(&self) -> ErrorBody {
        match self {
            Self::Validation(e) => ErrorBody { error: e.to_string(), details: None },
            Self::RateLimit(e) => ErrorBody { error: e.to_string(), details: None },
            Self::Generation { error, expose_details } => ErrorBody {
                error: error.public_message().to_string(),
                details: expose_details.then(|| error.to_string()),
            },
        }
    }

    fn retry_after(&self) -> Option<u64> {
        match self {
            Self::RateLimit(
                RateLimitError::WindowExceeded { retry_after_secs, .. } | RateLimitError::SoftBlocked { retry_after_secs },
            ) => Some(*retry_after_secs),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status(), Json(self.body())).into_response();
        if let Some(secs) = self.retry_after() {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
