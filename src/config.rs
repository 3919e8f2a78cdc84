//! Server configuration parsed from environment variables.
//!
//! Every value is optional; unset or unparsable values fall back to the
//! defaults in the owning module.

use std::str::FromStr;
use std::time::Duration;

use crate::gateway::{DEFAULT_IMAGE_TIMEOUT_SECS, DEFAULT_TEXT_TIMEOUT_SECS, GatewayTimeouts};
use crate::provider::ProviderError;
use crate::provider::config::ProviderConfig;
use crate::rate_limit::{
    DEFAULT_CSP_LIMIT, DEFAULT_HARD_THRESHOLD, DEFAULT_IMAGE_LIMIT, DEFAULT_MESSAGE_LIMIT, DEFAULT_SOFT_THRESHOLD,
    DEFAULT_SUSPICION_WINDOW_SECS, DEFAULT_WINDOW_SECS, RateLimitPolicy,
};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;

/// Key lookup used by the `from_lookup` constructors.
pub type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Parse `raw`, falling back to `default` when absent or invalid.
pub fn parse_or<T: FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

/// Like [`parse_or`] for a period in seconds, where zero also means the default.
#[must_use]
pub fn period_or(raw: Option<String>, default_secs: u64) -> Duration {
    match parse_or(raw, default_secs) {
        0 => Duration::from_secs(default_secs),
        secs => Duration::from_secs(secs),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("production" | "prod") => Self::Production,
            _ => Self::Development,
        }
    }

    /// Whether 500 responses may carry a `details` field.
    #[must_use]
    pub fn exposes_details(self) -> bool {
        self != Self::Production
    }
}

/// Per-endpoint rate limit policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimits {
    pub message: RateLimitPolicy,
    pub image: RateLimitPolicy,
    pub csp: RateLimitPolicy,
    pub sweep_interval: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: String,
    pub port: u16,
    pub environment: Environment,
    pub rate_limits: RateLimits,
    pub timeouts: GatewayTimeouts,
    pub provider: ProviderConfig,
}

impl AppConfig {
    /// Build the server config from environment variables.
    ///
    /// - `PORT` (3000), `BIND_ADDR` (`0.0.0.0`), `APP_ENV` (`development`)
    /// - `RATE_LIMIT_WINDOW_SECS` (60), `RATE_LIMIT_MESSAGE_PER_WINDOW` (10),
    ///   `RATE_LIMIT_IMAGE_PER_WINDOW` (5), `RATE_LIMIT_CSP_PER_WINDOW` (30)
    /// - `SUSPICION_WINDOW_SECS` (3600), `SUSPICION_SOFT_THRESHOLD` (50),
    ///   `SUSPICION_HARD_THRESHOLD` (200), `RATE_LIMIT_SWEEP_SECS` (300)
    /// - `GENERATION_TEXT_TIMEOUT_SECS` (30), `GENERATION_IMAGE_TIMEOUT_SECS` (60)
    /// - provider settings, see [`ProviderConfig::from_env`]
    ///
    /// # Errors
    ///
    /// Returns an error only for an unknown `PROVIDER`.
    pub fn from_env() -> Result<Self, ProviderError> {
        Self::from_lookup(&|key| std::env::var(key).ok())
    }

    /// Same as [`AppConfig::from_env`] over an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns an error only for an unknown `PROVIDER`.
    pub fn from_lookup(get: Lookup<'_>) -> Result<Self, ProviderError> {
        let window = Duration::from_secs(parse_or(get("RATE_LIMIT_WINDOW_SECS"), DEFAULT_WINDOW_SECS));
        let suspicion_window =
            Duration::from_secs(parse_or(get("SUSPICION_WINDOW_SECS"), DEFAULT_SUSPICION_WINDOW_SECS));
        let soft_threshold = parse_or(get("SUSPICION_SOFT_THRESHOLD"), DEFAULT_SOFT_THRESHOLD);
        let hard_threshold = parse_or(get("SUSPICION_HARD_THRESHOLD"), DEFAULT_HARD_THRESHOLD);
        let policy = |limit: u32| RateLimitPolicy { limit, window, suspicion_window, soft_threshold, hard_threshold };

        let rate_limits = RateLimits {
            message: policy(parse_or(get("RATE_LIMIT_MESSAGE_PER_WINDOW"), DEFAULT_MESSAGE_LIMIT)),
            image: policy(parse_or(get("RATE_LIMIT_IMAGE_PER_WINDOW"), DEFAULT_IMAGE_LIMIT)),
            csp: policy(parse_or(get("RATE_LIMIT_CSP_PER_WINDOW"), DEFAULT_CSP_LIMIT)),
            sweep_interval: period_or(get("RATE_LIMIT_SWEEP_SECS"), DEFAULT_SWEEP_INTERVAL_SECS),
        };

        let timeouts = GatewayTimeouts {
            text: Duration::from_secs(parse_or(get("GENERATION_TEXT_TIMEOUT_SECS"), DEFAULT_TEXT_TIMEOUT_SECS)),
            image: Duration::from_secs(parse_or(get("GENERATION_IMAGE_TIMEOUT_SECS"), DEFAULT_IMAGE_TIMEOUT_SECS)),
        };

        Ok(Self {
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            port: parse_or(get("PORT"), DEFAULT_PORT),
            environment: Environment::parse(get("APP_ENV").as_deref()),
            rate_limits,
            timeouts,
            provider: ProviderConfig::from_lookup(get)?,
        })
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
