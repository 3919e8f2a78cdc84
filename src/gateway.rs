//! Generation gateway: prompts → provider → stable error taxonomy.
//!
//! DESIGN
//! ======
//! - `single`: one free-text completion, bounded to a short answer.
//! - `three`: one completion constrained to a `{past, present, future}` JSON
//!   object, decoded here into a positional 3-element vector. A malformed
//!   structured answer becomes [`GenerationError::Malformed`], never a panic
//!   or a raw parse error.
//! - images: one prompt, one image, relayed as a `data:` URI.
//!
//! Every call has its own hard timeout. Nothing is retried here; retry is a
//! user action.

use std::fmt::Write;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::{info, warn};

use crate::provider::{CompletionRequest, Provider, ProviderError, ResponseSchema};
use crate::request::{CardPrompt, MessageRequest};

pub const DEFAULT_TEXT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_IMAGE_TIMEOUT_SECS: u64 = 60;
const SINGLE_MAX_TOKENS: u32 = 200;
const THREE_MAX_TOKENS: u32 = 600;

/// Structured output for three-card readings. Field order is the positional order.
pub const THREE_CARD_SCHEMA: ResponseSchema = ResponseSchema {
    name: "three_card_reading",
    fields: &[
        ("past", "Interpretation of the first card as the past"),
        ("present", "Interpretation of the second card as the present"),
        ("future", "Interpretation of the third card as the future"),
    ],
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewayTimeouts {
    pub text: Duration,
    pub image: Duration,
}

impl Default for GatewayTimeouts {
    fn default() -> Self {
        Self {
            text: Duration::from_secs(DEFAULT_TEXT_TIMEOUT_SECS),
            image: Duration::from_secs(DEFAULT_IMAGE_TIMEOUT_SECS),
        }
    }
}

// =============================================================================
// ERROR TAXONOMY
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// Credential missing or rejected. Never shown in detail to end users.
    #[error("provider authentication failed: {0}")]
    Auth(String),
    #[error("provider quota exhausted: {0}")]
    Quota(String),
    #[error("provider permission denied: {0}")]
    Permission(String),
    #[error("provider call timed out after {after_secs}s")]
    Timeout { after_secs: u64 },
    /// The provider answered, but not in the shape we asked for.
    #[error("malformed provider response: {0}")]
    Malformed(String),
    #[error("provider error: {0}")]
    Unknown(String),
}

impl GenerationError {
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Auth(_) => "E_AUTH",
            Self::Quota(_) => "E_QUOTA",
            Self::Permission(_) => "E_PERMISSION",
            Self::Timeout { .. } => "E_TIMEOUT",
            Self::Malformed(_) => "E_MALFORMED_RESPONSE",
            Self::Unknown(_) => "E_PROVIDER",
        }
    }

    /// Stable, detail-free message for end users.
    #[must_use]
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::Auth(_) => "Service temporarily unavailable",
            Self::Quota(_) => "AI service quota exceeded. Please try again later.",
            Self::Permission(_) => "AI service access denied. Please try again later.",
            Self::Timeout { .. } => "The AI service took too long to respond. Please try again.",
            Self::Malformed(_) | Self::Unknown(_) => "Failed to generate content. Please try again.",
        }
    }
}

/// Map a provider failure onto the taxonomy.
#[must_use]
pub fn classify(err: ProviderError) -> GenerationError {
    match err {
        ProviderError::MissingApiKey { .. } | ProviderError::ConfigParse(_) | ProviderError::HttpClientBuild(_) => {
            GenerationError::Auth(err.to_string())
        }
        ProviderError::ApiResponse { status, body } => classify_status(status, &body),
        ProviderError::EmptyResponse(reason) => GenerationError::Malformed(reason),
        ProviderError::ApiRequest(_) | ProviderError::ApiParse(_) => GenerationError::Unknown(err.to_string()),
    }
}

fn classify_status(status: u16, body: &str) -> GenerationError {
    let detail = format!("status {status}");
    let lower = body.to_ascii_lowercase();
    let key_rejected =
        lower.contains("api_key_invalid") || lower.contains("api key not valid") || lower.contains("invalid_api_key");

    if status == 401 || key_rejected {
        GenerationError::Auth(detail)
    } else if status == 429 || lower.contains("resource_exhausted") || lower.contains("insufficient_quota") {
        GenerationError::Quota(detail)
    } else if status == 403 || lower.contains("permission_denied") {
        GenerationError::Permission(detail)
    } else {
        GenerationError::Unknown(detail)
    }
}

// =============================================================================
// GATEWAY
// =============================================================================

#[derive(Clone)]
pub struct GenerationGateway {
    /// `None` when no provider key is configured; every call then fails with `Auth`.
    provider: Option<Arc<dyn Provider>>,
    timeouts: GatewayTimeouts,
}

impl GenerationGateway {
    #[must_use]
    pub fn new(provider: Option<Arc<dyn Provider>>, timeouts: GatewayTimeouts) -> Self {
        Self { provider, timeouts }
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    fn provider(&self) -> Result<&Arc<dyn Provider>, GenerationError> {
        self.provider
            .as_ref()
            .ok_or_else(|| GenerationError::Auth("provider not configured".into()))
    }

    /// Generate one message per card, in card order.
    ///
    /// # Errors
    ///
    /// Returns a [`GenerationError`] on provider failure, timeout, or a
    /// response that does not match the requested shape.
    pub async fn generate_text(&self, request: &MessageRequest) -> Result<Vec<String>, GenerationError> {
        let provider = self.provider()?;
        let mode = request.mode();
        let result = match request {
            MessageRequest::Single(card) => {
                let prompt = build_single_prompt(card);
                let completion = CompletionRequest { prompt: &prompt, max_tokens: SINGLE_MAX_TOKENS, schema: None };
                self.with_timeout(self.timeouts.text, provider.complete(&completion))
                    .await
                    .and_then(|text| decode_single(&text))
                    .map(|message| vec![message])
            }
            MessageRequest::Three(cards) => {
                let prompt = build_three_prompt(cards);
                let completion = CompletionRequest {
                    prompt: &prompt,
                    max_tokens: THREE_MAX_TOKENS,
                    schema: Some(&THREE_CARD_SCHEMA),
                };
                self.with_timeout(self.timeouts.text, provider.complete(&completion))
                    .await
                    .and_then(|text| decode_three(&text))
                    .map(Vec::from)
            }
        };
        match &result {
            Ok(messages) => info!(%mode, count = messages.len(), "gateway: text generated"),
            Err(e) => log_failure("text", e),
        }
        result
    }

    /// Generate one image and return it as a `data:` URI.
    ///
    /// # Errors
    ///
    /// Returns a [`GenerationError`] on provider failure or timeout.
    pub async fn generate_image(&self, prompt: &str) -> Result<String, GenerationError> {
        let provider = self.provider()?;
        let result = self
            .with_timeout(self.timeouts.image, provider.generate_image(prompt))
            .await
            .map(|image| image.data_uri());
        match &result {
            Ok(uri) => info!(bytes = uri.len(), "gateway: image generated"),
            Err(e) => log_failure("image", e),
        }
        result
    }

    async fn with_timeout<T>(
        &self,
        limit: Duration,
        call: impl Future<Output = Result<T, ProviderError>>,
    ) -> Result<T, GenerationError> {
        match tokio::time::timeout(limit, call).await {
            Ok(result) => result.map_err(classify),
            Err(_) => Err(GenerationError::Timeout { after_secs: limit.as_secs() }),
        }
    }
}

fn log_failure(kind: &'static str, err: &GenerationError) {
    match err {
        GenerationError::Timeout { after_secs } => warn!(kind, after_secs, "gateway: provider call timed out"),
        other => warn!(kind, code = other.error_code(), error = %other, "gateway: provider call failed"),
    }
}

// =============================================================================
// PROMPTS
// =============================================================================

fn build_single_prompt(card: &CardPrompt) -> String {
    let mut prompt = format!(
        "You are a gentle, insightful oracle card reader. The seeker drew the card \"{}\".\n\
         Card imagery: {}\n",
        card.name, card.description
    );
    if let Some(message) = &card.message {
        let _ = writeln!(prompt, "Traditional meaning: {message}");
    }
    prompt.push_str(
        "Write a short, personal reading of this card for the seeker in two to four sentences. \
         Speak directly to them, stay encouraging, and do not use markdown or headings.",
    );
    prompt
}

fn build_three_prompt(cards: &[CardPrompt; 3]) -> String {
    let [past, present, future] = cards;
    format!(
        "You are a gentle, insightful oracle card reader giving a three-card reading.\n\
         Past: \"{}\" ({})\n\
         Present: \"{}\" ({})\n\
         Future: \"{}\" ({})\n\
         Interpret each card in its position as one connected story, two or three sentences each. \
         Speak directly to the seeker. Respond only with the JSON object fields past, present, and future.",
        past.name, past.description, present.name, present.description, future.name, future.description
    )
}

// =============================================================================
// DECODING
// =============================================================================

#[derive(Deserialize)]
struct ThreeCardReading {
    past: String,
    present: String,
    future: String,
}

fn decode_single(text: &str) -> Result<String, GenerationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(GenerationError::Malformed("empty completion".into()));
    }
    Ok(trimmed.to_string())
}

/// Decode a `{past, present, future}` object into positional order.
pub(crate) fn decode_three(text: &str) -> Result<[String; 3], GenerationError> {
    let json = strip_code_fence(text);
    let reading: ThreeCardReading = serde_json::from_str(json)
        .map_err(|e| GenerationError::Malformed(format!("three-card response: {e}")))?;
    let fields = [reading.past, reading.present, reading.future];
    for (field, (name, _)) in fields.iter().zip(THREE_CARD_SCHEMA.fields) {
        if field.trim().is_empty() {
            return Err(GenerationError::Malformed(format!("three-card response: empty '{name}'")));
        }
    }
    Ok(fields.map(|f| f.trim().to_string()))
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
#[path = "gateway_test.rs"]
mod tests;
