//! Provider-neutral request types, errors, and the [`Provider`] trait
//! shared by the Gemini and `OpenAI` clients.

use serde_json::{Map, Value, json};

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by provider client operations.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// A configuration value could not be parsed.
    #[error("config parse failed: {0}")]
    ConfigParse(String),

    /// The API key environment variable is not set.
    #[error("missing API key: env var {var} not set")]
    MissingApiKey { var: String },

    /// The HTTP request to the provider failed before a response arrived.
    #[error("API request failed: {0}")]
    ApiRequest(String),

    /// The provider returned a non-success HTTP status.
    #[error("API response error: status {status}")]
    ApiResponse { status: u16, body: String },

    /// The provider response body could not be deserialized.
    #[error("API response parse failed: {0}")]
    ApiParse(String),

    /// The provider answered but produced no usable content (e.g. safety block).
    #[error("provider returned no content: {0}")]
    EmptyResponse(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl ProviderError {
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ConfigParse(_) => "E_CONFIG_PARSE",
            Self::MissingApiKey { .. } => "E_MISSING_API_KEY",
            Self::ApiRequest(_) => "E_API_REQUEST",
            Self::ApiResponse { .. } => "E_API_RESPONSE",
            Self::ApiParse(_) => "E_API_PARSE",
            Self::EmptyResponse(_) => "E_EMPTY_RESPONSE",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }
}

// =============================================================================
// REQUEST TYPES
// =============================================================================

/// A flat object schema of required string fields, used for structured output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseSchema {
    pub name: &'static str,
    /// `(field, description)` pairs, in order.
    pub fields: &'static [(&'static str, &'static str)],
}

impl ResponseSchema {
    /// Standard JSON Schema form (`OpenAI` `json_schema` response format).
    #[must_use]
    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|(field, description)| ((*field).to_string(), json!({ "type": "string", "description": description })))
            .collect();
        let required: Vec<&str> = self.fields.iter().map(|(field, _)| *field).collect();
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }

    /// `OpenAPI` subset form used by Gemini's `responseSchema`.
    #[must_use]
    pub fn to_openapi_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|(field, description)| ((*field).to_string(), json!({ "type": "STRING", "description": description })))
            .collect();
        let required: Vec<&str> = self.fields.iter().map(|(field, _)| *field).collect();
        json!({
            "type": "OBJECT",
            "properties": properties,
            "required": required,
            "propertyOrdering": required,
        })
    }
}

/// A single-turn text completion request.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub prompt: &'a str,
    pub max_tokens: u32,
    /// When set, the provider is asked for a JSON object matching the schema.
    pub schema: Option<&'a ResponseSchema>,
}

/// One generated image, base64-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub mime_type: String,
    pub base64: String,
}

impl GeneratedImage {
    /// `data:<mime>;base64,<bytes>` form handed to the browser.
    #[must_use]
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }
}

// =============================================================================
// PROVIDER TRAIT
// =============================================================================

/// Provider-neutral async trait for text and image generation. Enables mocking in tests.
#[async_trait::async_trait]
pub trait Provider: Send + Sync {
    /// Run a text completion and return the raw text (JSON text when a schema is set).
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] if the request fails or the response is malformed.
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, ProviderError>;

    /// Generate exactly one image for `prompt`.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] if the request fails or no image is returned.
    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, ProviderError>;
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
