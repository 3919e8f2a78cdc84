//! Request validation for the three inbound endpoints.
//!
//! DESIGN
//! ======
//! Pure functions of the raw body bytes. Rules run in a fixed order and the
//! first failure wins:
//! 1. body size bound, then well-formed JSON object
//! 2. mode + card cardinality (message requests)
//! 3. non-empty, length-bounded card fields
//! 4. denylist scan of every textual field ([`crate::policy`])
//! 5. prompt non-empty after trim and length-bounded (image requests)
//!
//! The `Display` text of [`ValidationError`] is returned verbatim to the
//! caller in the 400 body, so it never echoes the offending input.

use serde_json::{Map, Value};
use tracing::debug;

use crate::card::ReadingMode;
use crate::policy::{self, RuleSet};
use crate::request::{CardPrompt, CspReport, ImageRequest, MessageRequest};

/// Longest JSON encoding of one char: a surrogate pair as two `\uXXXX` escapes.
const MAX_JSON_BYTES_PER_CHAR: usize = 12;
/// Keys, quotes, separators and whitespace around the text fields.
const ENVELOPE_BYTES: usize = 1_024;

/// Fits three cards with every field at its character limit, fully escaped.
pub const DEFAULT_MAX_MESSAGE_BODY_BYTES: usize =
    3 * (MAX_NAME_CHARS + MAX_DESCRIPTION_CHARS + MAX_CARD_MESSAGE_CHARS) * MAX_JSON_BYTES_PER_CHAR + ENVELOPE_BYTES;
/// Fits a prompt at its character limit, fully escaped.
pub const DEFAULT_MAX_IMAGE_BODY_BYTES: usize = DEFAULT_MAX_PROMPT_CHARS * MAX_JSON_BYTES_PER_CHAR + ENVELOPE_BYTES;
pub const DEFAULT_MAX_CSP_BODY_BYTES: usize = 10_000;
pub const MAX_NAME_CHARS: usize = 100;
pub const MAX_DESCRIPTION_CHARS: usize = 200;
pub const MAX_CARD_MESSAGE_CHARS: usize = 1_000;
pub const DEFAULT_MAX_PROMPT_CHARS: usize = 1_000;

/// Size bounds applied by the validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationLimits {
    pub max_message_body_bytes: usize,
    pub max_image_body_bytes: usize,
    pub max_csp_body_bytes: usize,
    pub max_prompt_chars: usize,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            max_message_body_bytes: DEFAULT_MAX_MESSAGE_BODY_BYTES,
            max_image_body_bytes: DEFAULT_MAX_IMAGE_BODY_BYTES,
            max_csp_body_bytes: DEFAULT_MAX_CSP_BODY_BYTES,
            max_prompt_chars: DEFAULT_MAX_PROMPT_CHARS,
        }
    }
}

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Request body too large (max {limit} bytes)")]
    PayloadTooLarge { limit: usize },
    #[error("Request body must be a JSON object")]
    MalformedBody,
    #[error("Invalid mode: must be 'single' or 'three'")]
    InvalidMode,
    #[error("Cards must be a non-empty array")]
    CardsMissing,
    #[error("Mode '{mode}' requires exactly {expected} card(s), got {actual}")]
    CardCount { mode: ReadingMode, expected: usize, actual: usize },
    #[error("Card {index}: {field} is required")]
    MissingField { index: usize, field: &'static str },
    #[error("Card {index}: {field} exceeds {max} characters")]
    FieldTooLong { index: usize, field: &'static str, max: usize },
    #[error("Invalid content in {field}")]
    ForbiddenContent { field: String, rule: &'static str },
    #[error("Prompt is required")]
    MissingPrompt,
    #[error("Prompt exceeds {max} characters")]
    PromptTooLong { max: usize },
    #[error("CSP report is missing required field '{0}'")]
    MissingReportField(&'static str),
}

impl ValidationError {
    /// Grep-able code for logs.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::PayloadTooLarge { .. } => "E_PAYLOAD_TOO_LARGE",
            Self::MalformedBody => "E_MALFORMED_BODY",
            Self::InvalidMode => "E_INVALID_MODE",
            Self::CardsMissing | Self::CardCount { .. } => "E_CARD_COUNT",
            Self::MissingField { .. } => "E_MISSING_FIELD",
            Self::FieldTooLong { .. } => "E_FIELD_TOO_LONG",
            Self::ForbiddenContent { .. } => "E_FORBIDDEN_CONTENT",
            Self::MissingPrompt => "E_MISSING_PROMPT",
            Self::PromptTooLong { .. } => "E_PROMPT_TOO_LONG",
            Self::MissingReportField(_) => "E_MISSING_REPORT_FIELD",
        }
    }

    /// `true` when a denylist pattern triggered; logged as a security event.
    #[must_use]
    pub fn is_security(&self) -> bool {
        matches!(self, Self::ForbiddenContent { .. })
    }
}

// =============================================================================
// VALIDATOR
// =============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct Validator {
    limits: ValidationLimits,
}

impl Validator {
    #[must_use]
    pub fn new(limits: ValidationLimits) -> Self {
        Self { limits }
    }

    /// Validate a `/api/generateMessage` body.
    ///
    /// # Errors
    ///
    /// Returns the first rule violation as a [`ValidationError`].
    pub fn message(&self, body: &[u8]) -> Result<MessageRequest, ValidationError> {
        let obj = parse_object(body, self.limits.max_message_body_bytes)?;

        let mode: ReadingMode = obj
            .get("mode")
            .and_then(Value::as_str)
            .and_then(|m| m.parse().ok())
            .ok_or(ValidationError::InvalidMode)?;

        let raw_cards = obj
            .get("cards")
            .and_then(Value::as_array)
            .filter(|cards| !cards.is_empty())
            .ok_or(ValidationError::CardsMissing)?;
        if raw_cards.len() != mode.card_count() {
            return Err(ValidationError::CardCount { mode, expected: mode.card_count(), actual: raw_cards.len() });
        }

        let cards = raw_cards
            .iter()
            .enumerate()
            .map(|(i, raw)| parse_card(i + 1, raw))
            .collect::<Result<Vec<_>, _>>()?;

        let xss = policy::generic_xss();
        for (i, card) in cards.iter().enumerate() {
            let index = i + 1;
            scan(xss, &format!("card {index} name"), &card.name)?;
            scan(xss, &format!("card {index} description"), &card.description)?;
            if let Some(message) = &card.message {
                scan(xss, &format!("card {index} message"), message)?;
            }
        }

        match mode {
            ReadingMode::Single => {
                let [card]: [CardPrompt; 1] = cards.try_into().map_err(|_| ValidationError::CardsMissing)?;
                Ok(MessageRequest::Single(card))
            }
            ReadingMode::Three => {
                let cards: [CardPrompt; 3] = cards.try_into().map_err(|_| ValidationError::CardsMissing)?;
                Ok(MessageRequest::Three(cards))
            }
        }
    }

    /// Validate a `/api/generateImage` body.
    ///
    /// # Errors
    ///
    /// Returns the first rule violation as a [`ValidationError`].
    pub fn image(&self, body: &[u8]) -> Result<ImageRequest, ValidationError> {
        let obj = parse_object(body, self.limits.max_image_body_bytes)?;
        let prompt = obj
            .get("prompt")
            .and_then(Value::as_str)
            .ok_or(ValidationError::MissingPrompt)?;

        scan(policy::image_prompt(), "prompt", prompt)?;

        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(ValidationError::MissingPrompt);
        }
        if prompt.chars().count() > self.limits.max_prompt_chars {
            return Err(ValidationError::PromptTooLong { max: self.limits.max_prompt_chars });
        }
        Ok(ImageRequest { prompt: prompt.to_string() })
    }

    /// Validate a `/api/csp-report` body (`{"csp-report": {...}}`).
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for oversized or malformed bodies and for
    /// reports missing `violated-directive` or `document-uri`.
    pub fn csp_report(&self, body: &[u8]) -> Result<CspReport, ValidationError> {
        let obj = parse_object(body, self.limits.max_csp_body_bytes)?;
        let inner = obj
            .get("csp-report")
            .and_then(Value::as_object)
            .ok_or(ValidationError::MalformedBody)?;

        for field in ["violated-directive", "document-uri"] {
            let present = inner
                .get(field)
                .and_then(Value::as_str)
                .is_some_and(|s| !s.trim().is_empty());
            if !present {
                return Err(ValidationError::MissingReportField(field));
            }
        }

        serde_json::from_value(Value::Object(inner.clone())).map_err(|_| ValidationError::MalformedBody)
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn parse_object(body: &[u8], max_bytes: usize) -> Result<Map<String, Value>, ValidationError> {
    if body.len() > max_bytes {
        return Err(ValidationError::PayloadTooLarge { limit: max_bytes });
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(obj)) => Ok(obj),
        _ => Err(ValidationError::MalformedBody),
    }
}

fn parse_card(index: usize, raw: &Value) -> Result<CardPrompt, ValidationError> {
    let obj = raw.as_object().ok_or(ValidationError::MissingField { index, field: "name" })?;
    let name = required_text(obj, index, "name", MAX_NAME_CHARS)?;
    let description = required_text(obj, index, "description", MAX_DESCRIPTION_CHARS)?;
    let message = match obj.get("message") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.chars().count() > MAX_CARD_MESSAGE_CHARS => {
            return Err(ValidationError::FieldTooLong { index, field: "message", max: MAX_CARD_MESSAGE_CHARS });
        }
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => return Err(ValidationError::MissingField { index, field: "message" }),
    };
    Ok(CardPrompt { name, description, message })
}

fn required_text(
    obj: &Map<String, Value>,
    index: usize,
    field: &'static str,
    max: usize,
) -> Result<String, ValidationError> {
    let text = obj
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .ok_or(ValidationError::MissingField { index, field })?;
    if text.chars().count() > max {
        return Err(ValidationError::FieldTooLong { index, field, max });
    }
    Ok(text.to_string())
}

fn scan(rules: &RuleSet, field: &str, text: &str) -> Result<(), ValidationError> {
    match rules.first_violation(text) {
        Some(rule) => {
            debug!(rule_set = rules.name(), rule, field, "content policy match");
            Err(ValidationError::ForbiddenContent { field: field.to_string(), rule })
        }
        None => Ok(()),
    }
}

#[cfg(test)]
#[path = "validate_test.rs"]
mod tests;
