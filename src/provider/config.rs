//! Provider configuration parsed from environment variables.

use super::types::ProviderError;
use crate::config::{Lookup, parse_or};

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Gemini,
    OpenAi,
}

impl ProviderKind {
    #[must_use]
    pub fn default_key_var(self) -> &'static str {
        match self {
            Self::Gemini => "GEMINI_API_KEY",
            Self::OpenAi => "OPENAI_API_KEY",
        }
    }

    #[must_use]
    pub fn default_text_model(self) -> &'static str {
        match self {
            Self::Gemini => "gemini-2.0-flash",
            Self::OpenAi => "gpt-4o-mini",
        }
    }

    #[must_use]
    pub fn default_image_model(self) -> &'static str {
        match self {
            Self::Gemini => "imagen-3.0-generate-002",
            Self::OpenAi => "dall-e-3",
        }
    }

    #[must_use]
    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::Gemini => DEFAULT_GEMINI_BASE_URL,
            Self::OpenAi => DEFAULT_OPENAI_BASE_URL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    /// Name of the env var the key was read from (for diagnostics).
    pub key_var: String,
    /// `None` when the key is not set; generation then fails with an auth error.
    pub api_key: Option<String>,
    pub text_model: String,
    pub image_model: String,
    pub base_url: String,
    pub connect_timeout_secs: u64,
}

impl ProviderConfig {
    /// Build typed provider config from environment variables.
    ///
    /// Optional:
    /// - `PROVIDER`: `gemini` (default) or `openai`
    /// - `PROVIDER_API_KEY_ENV`: names the env var containing the key
    /// - `PROVIDER_TEXT_MODEL`, `PROVIDER_IMAGE_MODEL`: provider defaults when absent
    /// - `PROVIDER_BASE_URL`: provider default when absent
    /// - `PROVIDER_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::ConfigParse`] for an unknown `PROVIDER`.
    pub fn from_env() -> Result<Self, ProviderError> {
        Self::from_lookup(&|key| std::env::var(key).ok())
    }

    /// Same as [`ProviderConfig::from_env`] over an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::ConfigParse`] for an unknown `PROVIDER`.
    pub fn from_lookup(get: Lookup<'_>) -> Result<Self, ProviderError> {
        let kind = parse_kind(get("PROVIDER").as_deref())?;
        let key_var = get("PROVIDER_API_KEY_ENV").unwrap_or_else(|| kind.default_key_var().to_string());
        let api_key = get(key_var.as_str()).filter(|k| !k.trim().is_empty());

        let text_model = get("PROVIDER_TEXT_MODEL").unwrap_or_else(|| kind.default_text_model().to_string());
        let image_model = get("PROVIDER_IMAGE_MODEL").unwrap_or_else(|| kind.default_image_model().to_string());
        let base_url = get("PROVIDER_BASE_URL")
            .unwrap_or_else(|| kind.default_base_url().to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            kind,
            key_var,
            api_key,
            text_model,
            image_model,
            base_url,
            connect_timeout_secs: parse_or(get("PROVIDER_CONNECT_TIMEOUT_SECS"), DEFAULT_CONNECT_TIMEOUT_SECS),
        })
    }

    /// Host of the provider API, used in the CSP `connect-src` allow-list.
    #[must_use]
    pub fn origin(&self) -> &str {
        let scheme_end = self.base_url.find("://").map_or(0, |i| i + 3);
        let host_end = self.base_url[scheme_end..]
            .find('/')
            .map_or(self.base_url.len(), |i| scheme_end + i);
        &self.base_url[..host_end]
    }
}

fn parse_kind(raw: Option<&str>) -> Result<ProviderKind, ProviderError> {
    match raw.unwrap_or("gemini") {
        "gemini" => Ok(ProviderKind::Gemini),
        "openai" => Ok(ProviderKind::OpenAi),
        other => Err(ProviderError::ConfigParse(format!("unknown PROVIDER: {other}"))),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
