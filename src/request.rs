//! Wire contract shared by the server handlers, the gateway, and the HTTP
//! reading backend.
//!
//! Inbound bodies are parsed by [`crate::validate`] into the typed shapes
//! below exactly once; everything downstream works with the typed form.

use serde::{Deserialize, Serialize};

use crate::card::{Card, Draw, ReadingMode};

// =============================================================================
// MESSAGE GENERATION
// =============================================================================

/// The text fields of a card as sent to `/api/generateMessage`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardPrompt {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<&Card> for CardPrompt {
    fn from(card: &Card) -> Self {
        Self { name: card.name.clone(), description: card.description.clone(), message: Some(card.message.clone()) }
    }
}

/// A validated message request, discriminated by mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageRequest {
    Single(CardPrompt),
    Three([CardPrompt; 3]),
}

impl MessageRequest {
    #[must_use]
    pub fn mode(&self) -> ReadingMode {
        match self {
            Self::Single(_) => ReadingMode::Single,
            Self::Three(_) => ReadingMode::Three,
        }
    }

    #[must_use]
    pub fn cards(&self) -> &[CardPrompt] {
        match self {
            Self::Single(card) => std::slice::from_ref(card),
            Self::Three(cards) => cards,
        }
    }

    /// Serializable body for `POST /api/generateMessage`.
    #[must_use]
    pub fn to_body(&self) -> MessageBody {
        MessageBody { cards: self.cards().to_vec(), mode: self.mode() }
    }
}

impl From<&Draw> for MessageRequest {
    fn from(draw: &Draw) -> Self {
        match draw {
            Draw::Single(card) => Self::Single(card.into()),
            Draw::Three { past, present, future } => Self::Three([past.into(), present.into(), future.into()]),
        }
    }
}

/// Outbound JSON body for the message endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageBody {
    pub cards: Vec<CardPrompt>,
    pub mode: ReadingMode,
}

/// `200` body of `/api/generateMessage`. Length equals the request's card count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagesResponse {
    pub messages: Vec<String>,
}

// =============================================================================
// IMAGE GENERATION
// =============================================================================

/// A validated image request. `prompt` is trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRequest {
    pub prompt: String,
}

/// `200` body of `/api/generateImage`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageResponse {
    #[serde(rename = "imageUrl")]
    pub image_url: String,
}

// =============================================================================
// ERRORS
// =============================================================================

/// Body of every 4xx/5xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

// =============================================================================
// CSP REPORTS
// =============================================================================

/// A browser CSP violation report (the inner object of `{"csp-report": {...}}`).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CspReport {
    pub violated_directive: String,
    pub document_uri: String,
    #[serde(default)]
    pub blocked_uri: Option<String>,
    #[serde(default)]
    pub effective_directive: Option<String>,
    #[serde(default)]
    pub source_file: Option<String>,
    #[serde(default)]
    pub line_number: Option<u64>,
    #[serde(default)]
    pub script_sample: Option<String>,
    #[serde(default)]
    pub disposition: Option<String>,
}
