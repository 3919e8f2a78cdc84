//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into axum handlers via the `State` extractor. The
//! three endpoint limiters share one [`RateLimitStore`]; keys are prefixed
//! with the endpoint name so their windows stay independent.

use std::sync::Arc;

use crate::config::{AppConfig, Environment, RateLimits};
use crate::gateway::{GatewayTimeouts, GenerationGateway};
use crate::provider::Provider;
use crate::rate_limit::{MemoryRateLimitStore, RateLimitStore, RateLimiter};
use crate::validate::Validator;

/// Per-endpoint limiters.
#[derive(Clone)]
pub struct Limiters {
    pub message: RateLimiter,
    pub image: RateLimiter,
    pub csp: RateLimiter,
}

impl Limiters {
    #[must_use]
    pub fn new(limits: &RateLimits, store: Arc<dyn RateLimitStore>) -> Self {
        Self {
            message: RateLimiter::new("message", limits.message, store.clone()),
            image: RateLimiter::new("image", limits.image, store.clone()),
            csp: RateLimiter::new("csp", limits.csp, store),
        }
    }
}

/// Clone is required by axum; every field is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub environment: Environment,
    pub validator: Validator,
    pub gateway: GenerationGateway,
    pub limiters: Limiters,
    pub rate_store: Arc<dyn RateLimitStore>,
}

impl AppState {
    /// Build state from config. `provider` is `None` when no key is configured.
    #[must_use]
    pub fn new(config: &AppConfig, provider: Option<Arc<dyn Provider>>) -> Self {
        let store: Arc<dyn RateLimitStore> = Arc::new(MemoryRateLimitStore::new());
        Self::with_store(config.environment, &config.rate_limits, config.timeouts, provider, store)
    }

    #[must_use]
    pub fn with_store(
        environment: Environment,
        limits: &RateLimits,
        timeouts: GatewayTimeouts,
        provider: Option<Arc<dyn Provider>>,
        store: Arc<dyn RateLimitStore>,
    ) -> Self {
        Self {
            environment,
            validator: Validator::default(),
            gateway: GenerationGateway::new(provider, timeouts),
            limiters: Limiters::new(limits, store.clone()),
            rate_store: store,
        }
    }
}
