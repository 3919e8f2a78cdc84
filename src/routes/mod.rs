//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Three POST endpoints plus a health probe. Every response carries the
//! hardening headers; the CSP is built once at start-up from a fixed
//! allow-list plus the configured provider's origin.

pub mod csp;
pub mod generate;

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::Router;
use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::header::{self, HeaderName};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

const BASE_CSP: &str = "default-src 'self'; \
     script-src 'self'; \
     style-src 'self' 'unsafe-inline' https://fonts.googleapis.com; \
     font-src 'self' https://fonts.gstatic.com; \
     img-src 'self' data: blob:; \
     object-src 'none'; \
     frame-ancestors 'none'; \
     base-uri 'self'; \
     form-action 'self'; \
     report-uri /api/csp-report";

/// Full API router with CORS, tracing, and security headers.
pub fn app(state: AppState, provider_origin: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    let router = Router::new()
        .route("/api/generateMessage", post(generate::generate_message))
        .route("/api/generateImage", post(generate::generate_image))
        .route("/api/csp-report", post(csp::csp_report))
        .route("/healthz", get(healthz))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    with_security_headers(router, &content_security_policy(provider_origin))
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

// =============================================================================
// SECURITY HEADERS
// =============================================================================

/// CSP string: the fixed allow-list with `connect-src` opened to the provider.
#[must_use]
pub fn content_security_policy(provider_origin: &str) -> String {
    let connect = if provider_origin.is_empty() {
        "connect-src 'self'".to_string()
    } else {
        format!("connect-src 'self' {provider_origin}")
    };
    format!("{BASE_CSP}; {connect}")
}

fn with_security_headers(router: Router, csp: &str) -> Router {
    let csp = HeaderValue::from_str(csp).unwrap_or_else(|_| HeaderValue::from_static(BASE_CSP));
    let fixed: [(HeaderName, &'static str); 5] = [
        (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
        (header::X_FRAME_OPTIONS, "DENY"),
        (header::X_XSS_PROTECTION, "1; mode=block"),
        (header::REFERRER_POLICY, "strict-origin-when-cross-origin"),
        (header::STRICT_TRANSPORT_SECURITY, "max-age=31536000; includeSubDomains"),
    ];
    let router = fixed.into_iter().fold(router, |router, (name, value)| {
        router.layer(SetResponseHeaderLayer::overriding(name, HeaderValue::from_static(value)))
    });
    router.layer(SetResponseHeaderLayer::overriding(header::CONTENT_SECURITY_POLICY, csp))
}

// =============================================================================
// CLIENT IDENTIFIER
// =============================================================================

/// Rate-limit key for the caller: first `X-Forwarded-For` hop, then
/// `X-Real-IP`, then the socket peer, else `"unknown"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientId(pub String);

impl ClientId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<S: Send + Sync> FromRequestParts<S> for ClientId {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());
        Ok(Self(client_id_from(&parts.headers, peer)))
    }
}

fn client_id_from(headers: &HeaderMap, peer: Option<String>) -> String {
    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };
    header_value("x-forwarded-for")
        .or_else(|| header_value("x-real-ip"))
        .or(peer)
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
