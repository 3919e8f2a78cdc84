//! Readings: assembling a draw into generated text, and the bounded journal
//! that remembers past draws.
//!
//! SYSTEM CONTEXT
//! ==============
//! A UI hands the [`assembler::ReadingAssembler`] a `Draw`. The assembler
//! asks a [`ReadingBackend`] for text (and, for single draws, an image),
//! degrades each failed part to the card's authored fallback, and records
//! the result in the [`journal::JournalStore`]. The backend is either the
//! in-process [`GenerationGateway`] or [`http::HttpBackend`] talking to a
//! running server.

pub mod assembler;
pub mod http;
pub mod journal;
pub mod sanitize;
pub mod storage;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::card::{Card, ReadingMode};
use crate::gateway::{GenerationError, GenerationGateway};
use crate::request::MessageRequest;

pub use assembler::ReadingAssembler;
pub use journal::JournalStore;

/// One completed draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub id: String,
    pub timestamp: String,
    pub mode: ReadingMode,
    pub cards: Vec<Card>,
    /// Same length as `cards`. `None` means show the card's own message.
    pub messages: Vec<Option<String>>,
    /// Only ever populated in memory; the journal strips it before writing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Reading {
    /// Text to show for card `index`: the generated message or the card's fallback.
    #[must_use]
    pub fn message_for(&self, index: usize) -> Option<&str> {
        let card = self.cards.get(index)?;
        match self.messages.get(index) {
            Some(Some(message)) => Some(message),
            _ => Some(&card.message),
        }
    }

    /// Whether every message fell back to the authored card text.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.messages.iter().all(Option::is_none)
    }
}

// =============================================================================
// BACKEND SEAM
// =============================================================================

/// Where the assembler gets generated content from.
#[async_trait]
pub trait ReadingBackend: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// One message per card in request order.
    async fn generate_messages(&self, request: &MessageRequest) -> Result<Vec<String>, Self::Error>;

    /// A displayable image URL (a `data:` URI from the gateway).
    async fn generate_image(&self, prompt: &str) -> Result<String, Self::Error>;
}

#[async_trait]
impl ReadingBackend for GenerationGateway {
    type Error = GenerationError;

    async fn generate_messages(&self, request: &MessageRequest) -> Result<Vec<String>, GenerationError> {
        self.generate_text(request).await
    }

    async fn generate_image(&self, prompt: &str) -> Result<String, GenerationError> {
        GenerationGateway::generate_image(self, prompt).await
    }
}
