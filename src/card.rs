//! Cards, reading modes, and the static deck.
//!
//! DESIGN
//! ======
//! A `Draw` is the only way a card selection reaches the assembler, so the
//! cardinality rule (1 card for `single`, 3 for `three`) is checked exactly
//! once, at construction. The deck itself is an embedded JSON asset; cards
//! are never mutated after load.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

const DECK_JSON: &str = include_str!("../assets/deck.json");

// =============================================================================
// CARD
// =============================================================================

/// Immutable reference datum from the static deck.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: u32,
    pub name: String,
    pub description: String,
    /// Authored fallback text shown whenever generation fails.
    pub message: String,
}

// =============================================================================
// MODE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadingMode {
    Single,
    Three,
}

impl ReadingMode {
    /// Number of cards this mode operates on.
    #[must_use]
    pub fn card_count(self) -> usize {
        match self {
            Self::Single => 1,
            Self::Three => 3,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Three => "three",
        }
    }
}

impl fmt::Display for ReadingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReadingMode {
    type Err = DrawError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single" => Ok(Self::Single),
            "three" => Ok(Self::Three),
            other => Err(DrawError::UnknownMode(other.to_string())),
        }
    }
}

// =============================================================================
// DRAW
// =============================================================================

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DrawError {
    #[error("unknown mode '{0}' (expected 'single' or 'three')")]
    UnknownMode(String),
    #[error("mode '{mode}' requires exactly {expected} card(s), got {actual}")]
    Cardinality { mode: ReadingMode, expected: usize, actual: usize },
    #[error("deck has only {available} card(s), need {needed}")]
    DeckTooSmall { available: usize, needed: usize },
}

/// A card selection whose shape matches its mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Draw {
    Single(Card),
    Three { past: Card, present: Card, future: Card },
}

impl Draw {
    /// Build a draw from an ordered card list, enforcing the mode's cardinality.
    ///
    /// # Errors
    ///
    /// Returns [`DrawError::Cardinality`] when `cards.len()` differs from
    /// `mode.card_count()`.
    pub fn new(cards: Vec<Card>, mode: ReadingMode) -> Result<Self, DrawError> {
        let actual = cards.len();
        let mismatch = DrawError::Cardinality { mode, expected: mode.card_count(), actual };
        match mode {
            ReadingMode::Single => {
                let [card]: [Card; 1] = cards.try_into().map_err(|_| mismatch)?;
                Ok(Self::Single(card))
            }
            ReadingMode::Three => {
                let [past, present, future]: [Card; 3] = cards.try_into().map_err(|_| mismatch)?;
                Ok(Self::Three { past, present, future })
            }
        }
    }

    #[must_use]
    pub fn mode(&self) -> ReadingMode {
        match self {
            Self::Single(_) => ReadingMode::Single,
            Self::Three { .. } => ReadingMode::Three,
        }
    }

    /// Cards in positional order (past, present, future for three-card draws).
    #[must_use]
    pub fn cards(&self) -> Vec<&Card> {
        match self {
            Self::Single(card) => vec![card],
            Self::Three { past, present, future } => vec![past, present, future],
        }
    }

    #[must_use]
    pub fn into_cards(self) -> Vec<Card> {
        match self {
            Self::Single(card) => vec![card],
            Self::Three { past, present, future } => vec![past, present, future],
        }
    }
}

// =============================================================================
// DECK
// =============================================================================

#[derive(Debug, Clone)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    /// The embedded deck, parsed once.
    ///
    /// # Panics
    ///
    /// Panics if the embedded deck asset is not valid JSON; the asset is
    /// compiled in, so this is covered by the unit tests.
    #[must_use]
    pub fn standard() -> Self {
        static CARDS: OnceLock<Vec<Card>> = OnceLock::new();
        let cards = CARDS.get_or_init(|| serde_json::from_str(DECK_JSON).expect("embedded deck is valid JSON"));
        Self { cards: cards.clone() }
    }

    #[must_use]
    pub fn from_cards(cards: Vec<Card>) -> Self {
        Self { cards }
    }

    #[must_use]
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: u32) -> Option<&Card> {
        self.cards.iter().find(|c| c.id == id)
    }

    /// Shuffle the deck in place.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.cards.shuffle(rng);
    }

    /// Shuffle and take the top cards for `mode`. Cards in a draw are distinct.
    ///
    /// # Errors
    ///
    /// Returns [`DrawError::DeckTooSmall`] if the deck cannot supply enough cards.
    pub fn draw<R: Rng + ?Sized>(&mut self, mode: ReadingMode, rng: &mut R) -> Result<Draw, DrawError> {
        let needed = mode.card_count();
        if self.cards.len() < needed {
            return Err(DrawError::DeckTooSmall { available: self.cards.len(), needed });
        }
        self.shuffle(rng);
        Draw::new(self.cards[..needed].to_vec(), mode)
    }
}

#[cfg(test)]
#[path = "card_test.rs"]
mod tests;
