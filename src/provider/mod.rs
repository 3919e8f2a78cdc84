//! Provider: multi-vendor adapter for text and image generation.
//!
//! DESIGN
//! ======
//! `ProviderClient` dispatches to Gemini or an OpenAI-compatible API based
//! on `PROVIDER`. Everything above this module talks to the [`Provider`]
//! trait, so tests swap in a mock.

pub mod config;
pub mod gemini;
pub mod openai;
pub mod types;

use std::time::Duration;

use config::{ProviderConfig, ProviderKind};
pub use types::{CompletionRequest, GeneratedImage, Provider, ProviderError, ResponseSchema};

// =============================================================================
// CLIENT DISPATCH
// =============================================================================

/// Concrete provider client. Built from [`ProviderConfig`].
pub struct ProviderClient {
    inner: Backend,
    kind: ProviderKind,
    text_model: String,
}

enum Backend {
    Gemini(gemini::GeminiClient),
    OpenAi(openai::OpenAiClient),
}

impl ProviderClient {
    /// Build a provider client from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid, the API key is missing, or
    /// the HTTP client fails to build.
    pub fn from_env() -> Result<Self, ProviderError> {
        Self::from_config(ProviderConfig::from_env()?)
    }

    /// Build a provider client from a parsed typed config.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::MissingApiKey`] when no key is configured, or
    /// [`ProviderError::HttpClientBuild`] if the HTTP client fails to build.
    pub fn from_config(config: ProviderConfig) -> Result<Self, ProviderError> {
        let api_key = config
            .api_key
            .ok_or(ProviderError::MissingApiKey { var: config.key_var })?;
        let connect_timeout = Duration::from_secs(config.connect_timeout_secs);
        let text_model = config.text_model.clone();
        let inner = match config.kind {
            ProviderKind::Gemini => Backend::Gemini(gemini::GeminiClient::new(
                api_key,
                config.base_url,
                config.text_model,
                config.image_model,
                connect_timeout,
            )?),
            ProviderKind::OpenAi => Backend::OpenAi(openai::OpenAiClient::new(
                api_key,
                config.base_url,
                config.text_model,
                config.image_model,
                connect_timeout,
            )?),
        };
        Ok(Self { inner, kind: config.kind, text_model })
    }

    #[must_use]
    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    /// Return the configured text model name (e.g. `"gemini-2.0-flash"`).
    #[must_use]
    pub fn text_model(&self) -> &str {
        &self.text_model
    }
}

#[async_trait::async_trait]
impl Provider for ProviderClient {
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, ProviderError> {
        match &self.inner {
            Backend::Gemini(c) => c.complete(request).await,
            Backend::OpenAi(c) => c.complete(request).await,
        }
    }

    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, ProviderError> {
        match &self.inner {
            Backend::Gemini(c) => c.generate_image(prompt).await,
            Backend::OpenAi(c) => c.generate_image(prompt).await,
        }
    }
}
