//! `POST /api/csp-report`: browser CSP violation intake.
//!
//! Reports are rate limited, validated, classified, and logged. A valid
//! report always gets `204`; severity only changes the log level.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use tracing::{error, info, warn};

use crate::error::ApiError;
use crate::request::CspReport;
use crate::routes::ClientId;
use crate::routes::generate::{admit, validated};
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// `javascript:` and `eval` point at script injection; `inline` at a
/// blocked inline script or style.
#[must_use]
pub fn classify(report: &CspReport) -> Severity {
    let haystack = [
        Some(report.violated_directive.as_str()),
        report.effective_directive.as_deref(),
        report.blocked_uri.as_deref(),
        report.script_sample.as_deref(),
    ]
    .into_iter()
    .flatten()
    .map(str::to_ascii_lowercase)
    .collect::<Vec<_>>();

    if haystack.iter().any(|s| s.contains("javascript:") || s.contains("eval")) {
        Severity::High
    } else if haystack.iter().any(|s| s.contains("inline")) {
        Severity::Medium
    } else {
        Severity::Low
    }
}

pub async fn csp_report(State(state): State<AppState>, client: ClientId, body: Bytes) -> Result<StatusCode, ApiError> {
    let limiter = &state.limiters.csp;
    admit(limiter, &client)?;
    let report = validated(limiter, &client, state.validator.csp_report(&body))?;

    let severity = classify(&report);
    let directive = report.violated_directive.as_str();
    let blocked = report.blocked_uri.as_deref().unwrap_or("");
    let document = report.document_uri.as_str();
    let client_id = client.as_str();
    match severity {
        Severity::High => error!(severity = severity.as_str(), client_id, directive, blocked, document, "csp violation"),
        Severity::Medium => warn!(severity = severity.as_str(), client_id, directive, blocked, document, "csp violation"),
        Severity::Low => info!(severity = severity.as_str(), client_id, directive, blocked, document, "csp violation"),
    }
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[path = "csp_test.rs"]
mod tests;
