//! In-memory card collection for one deck

use chrono::NaiveDate;

use super::models::{Card, ReviewStats, MATURE_INTERVAL_DAYS};
use super::storage::{DeckError, Result};

/// An ordered collection of cards with unique ids.
///
/// Nothing here touches the disk; `DeckStore` decides when to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct Deck {
    name: String,
    cards: Vec<Card>,
}

impl Deck {
    pub fn new(name: String) -> Self {
        Self {
            name,
            cards: Vec::new(),
        }
    }

    /// Build a deck from cards that were already validated
    pub(crate) fn from_cards(name: String, cards: Vec<Card>) -> Self {
        Self { name, cards }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Swap in a whole card collection, returning the previous one.
    /// Used to install undo/redo snapshots.
    pub fn replace_cards(&mut self, cards: Vec<Card>) -> Vec<Card> {
        std::mem::replace(&mut self.cards, cards)
    }

    /// Create a card with default retention state, due `today`
    pub fn add_card(&mut self, front: &str, back: &str, today: NaiveDate) -> Result<Card> {
        let front = front.trim();
        if front.is_empty() {
            return Err(DeckError::Validation("front must not be empty".to_string()));
        }

        let mut card = Card::new(front.to_string(), back.trim().to_string(), today);
        // A v4 collision is not going to happen, but ids must stay unique
        while self.position(&card.id).is_some() {
            card = Card::new(card.front, card.back, today);
        }

        self.cards.push(card.clone());
        Ok(card)
    }

    /// Cards due on or before `today`, oldest due date first, ties by id
    pub fn get_due_cards(&self, today: NaiveDate) -> Vec<Card> {
        let mut due: Vec<Card> = self
            .cards
            .iter()
            .filter(|c| c.is_due(today))
            .cloned()
            .collect();
        due.sort_by(|a, b| {
            a.next_review
                .cmp(&b.next_review)
                .then_with(|| a.id.cmp(&b.id))
        });
        due
    }

    pub fn get_card(&self, id: &str) -> Result<&Card> {
        self.cards
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| DeckError::CardNotFound(id.to_string()))
    }

    /// Find a card by exact id or unique id prefix
    pub fn find_card(&self, id_or_prefix: &str) -> Result<&Card> {
        let needle = id_or_prefix.trim();
        if needle.is_empty() {
            return Err(DeckError::Validation("card id must not be empty".to_string()));
        }

        // Exact match first
        if let Ok(card) = self.get_card(needle) {
            return Ok(card);
        }

        let matches: Vec<&Card> = self
            .cards
            .iter()
            .filter(|c| c.id.starts_with(needle))
            .collect();

        match matches.len() {
            0 => Err(DeckError::CardNotFound(needle.to_string())),
            1 => Ok(matches[0]),
            n => Err(DeckError::Validation(format!(
                "id prefix '{}' matches {} cards",
                needle, n
            ))),
        }
    }

    /// Replace the stored state of a card. The id is kept.
    pub fn update_card(&mut self, id: &str, new_state: Card) -> Result<()> {
        let pos = self
            .position(id)
            .ok_or_else(|| DeckError::CardNotFound(id.to_string()))?;

        let card = Card {
            id: id.to_string(),
            ..new_state
        };
        card.check().map_err(DeckError::Validation)?;

        self.cards[pos] = card;
        Ok(())
    }

    /// Remove a card and hand it back
    pub fn delete_card(&mut self, id: &str) -> Result<Card> {
        let pos = self
            .position(id)
            .ok_or_else(|| DeckError::CardNotFound(id.to_string()))?;
        Ok(self.cards.remove(pos))
    }

    /// Review statistics as of `today`
    pub fn stats(&self, today: NaiveDate) -> ReviewStats {
        let tomorrow = today.succ_opt().unwrap_or(today);
        let mut stats = ReviewStats {
            total_cards: self.cards.len(),
            ..ReviewStats::default()
        };

        let mut ease_sum = 0.0;
        for card in &self.cards {
            if card.is_new() {
                stats.new_cards += 1;
            }
            if card.is_due(today) {
                stats.due_cards += 1;
            } else if card.next_review == tomorrow {
                stats.due_tomorrow += 1;
            }
            if card.interval_days >= MATURE_INTERVAL_DAYS {
                stats.mature_cards += 1;
            }
            stats.total_reviews += u64::from(card.review_count);
            ease_sum += card.ease_factor;
        }

        if !self.cards.is_empty() {
            stats.average_ease = ease_sum / self.cards.len() as f64;
        }
        stats
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.cards.iter().position(|c| c.id == id)
    }
}
