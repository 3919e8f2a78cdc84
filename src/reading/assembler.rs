//! Reading assembler: turns a draw into a recorded [`Reading`].
//!
//! DESIGN
//! ======
//! - `single`: text and image requests run concurrently via `tokio::join!`.
//!   Neither can cancel the other; each degrades on its own (text to the
//!   card's message, image to none).
//! - `three`: one combined text request. Any failure falls back to all three
//!   card messages in position.
//! - Every assembled reading is appended to the journal, fallback or not.
//!
//! `assemble` never fails. Each call is a fresh generation with a new id.

use std::sync::Arc;

use time::OffsetDateTime;
use time::macros::format_description;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use super::journal::JournalStore;
use super::{Reading, ReadingBackend};
use crate::card::{Card, Draw};
use crate::request::MessageRequest;
use crate::validate::DEFAULT_MAX_PROMPT_CHARS;

pub struct ReadingAssembler<B> {
    backend: Arc<B>,
    journal: Arc<JournalStore>,
}

impl<B> Clone for ReadingAssembler<B> {
    fn clone(&self) -> Self {
        Self { backend: Arc::clone(&self.backend), journal: Arc::clone(&self.journal) }
    }
}

impl<B: ReadingBackend + 'static> ReadingAssembler<B> {
    #[must_use]
    pub fn new(backend: Arc<B>, journal: Arc<JournalStore>) -> Self {
        Self { backend, journal }
    }

    #[must_use]
    pub fn journal(&self) -> &JournalStore {
        &self.journal
    }

    /// Generate, reconcile, and record one reading.
    pub async fn assemble(&self, draw: Draw) -> Reading {
        let request = MessageRequest::from(&draw);
        let mode = draw.mode();

        let (messages, image_url) = match &draw {
            Draw::Single(card) => {
                let prompt = build_image_prompt(card);
                let (text, image) = tokio::join!(
                    self.backend.generate_messages(&request),
                    self.backend.generate_image(&prompt)
                );
                let image_url = image
                    .inspect_err(|e| warn!(card = %card.name, error = %e, "assembler: image failed, showing none"))
                    .ok();
                (reconcile(text, 1), image_url)
            }
            Draw::Three { .. } => (reconcile(self.backend.generate_messages(&request).await, 3), None),
        };

        let reading = Reading {
            id: Uuid::new_v4().to_string(),
            timestamp: display_timestamp(OffsetDateTime::now_utc()),
            mode,
            cards: draw.into_cards(),
            messages,
            image_url,
        };
        let outcome = self.journal.append(&reading);
        info!(
            id = %reading.id,
            %mode,
            fallback = reading.is_fallback(),
            has_image = reading.image_url.is_some(),
            ?outcome,
            "assembler: reading recorded"
        );
        reading
    }

    /// Run [`Self::assemble`] on a detached task. Dropping the handle does not
    /// cancel generation or the journal write.
    pub fn spawn(&self, draw: Draw) -> JoinHandle<Reading> {
        let assembler = self.clone();
        tokio::spawn(async move { assembler.assemble(draw).await })
    }
}

fn reconcile<E: std::fmt::Display>(result: Result<Vec<String>, E>, expected: usize) -> Vec<Option<String>> {
    match result {
        Ok(messages) if messages.len() == expected => messages.into_iter().map(Some).collect(),
        Ok(messages) => {
            warn!(expected, got = messages.len(), "assembler: wrong message count, using card messages");
            vec![None; expected]
        }
        Err(e) => {
            warn!(error = %e, "assembler: text failed, using card messages");
            vec![None; expected]
        }
    }
}

/// Image prompt for a single-card reading, clamped to the image prompt limit.
#[must_use]
pub fn build_image_prompt(card: &Card) -> String {
    let prompt = format!(
        "A mystical oracle card illustration titled \"{}\". {} \
         Soft luminous light, rich symbolic detail, painterly style, no text or lettering.",
        card.name, card.description
    );
    prompt.chars().take(DEFAULT_MAX_PROMPT_CHARS).collect()
}

fn display_timestamp(at: OffsetDateTime) -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second] UTC");
    at.format(&format)
        .unwrap_or_else(|_| at.unix_timestamp().to_string())
}

#[cfg(test)]
#[path = "assembler_test.rs"]
mod tests;
