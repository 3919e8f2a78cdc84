//! `ReadingBackend` over HTTP, for clients of a running server.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use super::ReadingBackend;
use crate::request::{ErrorBody, ImageRequest, ImageResponse, MessageRequest, MessagesResponse};

/// Covers the server's own 60s image budget plus transfer.
const REQUEST_TIMEOUT_SECS: u64 = 90;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("request rejected: {0}")]
    Rejected(String),
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("server error ({status}): {error}")]
    Server { status: u16, error: String, details: Option<String> },
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl BackendError {
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Rejected(_) => "E_REJECTED",
            Self::RateLimited(_) => "E_RATE_LIMITED",
            Self::Server { .. } => "E_SERVER",
            Self::Http(_) => "E_HTTP",
            Self::Decode(_) => "E_DECODE",
        }
    }
}

pub struct HttpBackend {
    http: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    /// # Errors
    ///
    /// Returns [`BackendError::Http`] if the HTTP client fails to build.
    pub fn new(base_url: impl Into<String>) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self { http, base_url: base_url.into().trim_end_matches('/').to_string() })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B: serde::Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, BackendError> {
        let response = self
            .http
            .post(format!("{}{path}", self.base_url))
            .json(body)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        decode_response(status, &text)
    }
}

/// Map a status + body onto the success type or a [`BackendError`].
pub(crate) fn decode_response<T: DeserializeOwned>(status: StatusCode, text: &str) -> Result<T, BackendError> {
    if status.is_success() {
        return serde_json::from_str(text).map_err(|e| BackendError::Decode(e.to_string()));
    }
    let body: ErrorBody = serde_json::from_str(text)
        .unwrap_or_else(|_| ErrorBody { error: status.canonical_reason().unwrap_or("error").to_string(), details: None });
    Err(match status {
        StatusCode::BAD_REQUEST => BackendError::Rejected(body.error),
        StatusCode::TOO_MANY_REQUESTS => BackendError::RateLimited(body.error),
        _ => BackendError::Server { status: status.as_u16(), error: body.error, details: body.details },
    })
}

#[async_trait]
impl ReadingBackend for HttpBackend {
    type Error = BackendError;

    async fn generate_messages(&self, request: &MessageRequest) -> Result<Vec<String>, BackendError> {
        let response: MessagesResponse = self.post("/api/generateMessage", &request.to_body()).await?;
        Ok(response.messages)
    }

    async fn generate_image(&self, prompt: &str) -> Result<String, BackendError> {
        let body = ImageRequest { prompt: prompt.to_string() };
        let response: ImageResponse = self.post("/api/generateImage", &body).await?;
        Ok(response.image_url)
    }
}
