//! Generation endpoints.
//!
//! Each request runs the same gate before any provider call:
//! rate limit check → validation → outcome recorded on the limiter.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::rate_limit::{Outcome, RateLimiter};
use crate::request::{ImageResponse, MessagesResponse};
use crate::routes::ClientId;
use crate::state::AppState;
use crate::validate::ValidationError;

/// `POST /api/generateMessage`: one message per card.
pub async fn generate_message(
    State(state): State<AppState>,
    client: ClientId,
    body: Bytes,
) -> Result<Json<MessagesResponse>, ApiError> {
    let limiter = &state.limiters.message;
    admit(limiter, &client)?;
    let request = validated(limiter, &client, state.validator.message(&body))?;

    let mode = request.mode();
    let messages = state
        .gateway
        .generate_text(&request)
        .await
        .map_err(|e| ApiError::generation(e, state.environment))?;
    info!(client_id = client.as_str(), %mode, "generateMessage: ok");
    Ok(Json(MessagesResponse { messages }))
}

/// `POST /api/generateImage`: one image as a `data:` URI.
pub async fn generate_image(
    State(state): State<AppState>,
    client: ClientId,
    body: Bytes,
) -> Result<Json<ImageResponse>, ApiError> {
    let limiter = &state.limiters.image;
    admit(limiter, &client)?;
    let request = validated(limiter, &client, state.validator.image(&body))?;

    let image_url = state
        .gateway
        .generate_image(&request.prompt)
        .await
        .map_err(|e| ApiError::generation(e, state.environment))?;
    info!(client_id = client.as_str(), "generateImage: ok");
    Ok(Json(ImageResponse { image_url }))
}

// =============================================================================
// GATE
// =============================================================================

pub(crate) fn admit(limiter: &RateLimiter, client: &ClientId) -> Result<(), ApiError> {
    limiter.check(client.as_str()).map_err(|e| {
        warn!(endpoint = limiter.endpoint(), client_id = client.as_str(), code = e.error_code(), "rate limit denied");
        ApiError::from(e)
    })
}

/// Record the validation outcome on the limiter and pass the result through.
pub(crate) fn validated<T>(
    limiter: &RateLimiter,
    client: &ClientId,
    result: Result<T, ValidationError>,
) -> Result<T, ApiError> {
    match result {
        Ok(value) => {
            limiter.record(client.as_str(), Outcome::Success);
            Ok(value)
        }
        Err(e) if e.is_security() => {
            warn!(
                security = true,
                endpoint = limiter.endpoint(),
                client_id = client.as_str(),
                code = e.error_code(),
                error = ?e,
                "request blocked by content policy"
            );
            limiter.record(client.as_str(), Outcome::SecurityViolation);
            Err(e.into())
        }
        Err(e) => {
            debug!(endpoint = limiter.endpoint(), client_id = client.as_str(), code = e.error_code(), "request rejected");
            limiter.record(client.as_str(), Outcome::Rejected);
            Err(e.into())
        }
    }
}

#[cfg(test)]
#[path = "generate_test.rs"]
mod tests;
