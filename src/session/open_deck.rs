use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::flashcards::storage::Result;
use crate::flashcards::{Card, Deck, DeckStore, Quality};
use crate::history::{HistoryLog, Snapshot};

/// A deck loaded from disk together with its undo history.
///
/// All changes go through here so that a snapshot of the previous state is
/// recorded for every change that succeeds.
pub struct OpenDeck {
    store: DeckStore,
    deck: Deck,
    history: HistoryLog,
    history_path: PathBuf,
}

impl OpenDeck {
    /// Load the deck at `path` and its history. Corrupt deck files are
    /// reported as `CorruptData` for the caller to resolve.
    pub fn open(path: PathBuf, history_capacity: usize) -> Result<Self> {
        let store = DeckStore::new(path);
        let deck = store.load()?;
        Ok(Self::from_parts(store, deck, history_capacity))
    }

    /// Wrap a deck obtained some other way, e.g. restored from backup
    pub fn from_parts(store: DeckStore, deck: Deck, history_capacity: usize) -> Self {
        let history_path = HistoryLog::path_for(store.path());
        let history = HistoryLog::load(&history_path, history_capacity);
        Self {
            store,
            deck,
            history,
            history_path,
        }
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    pub fn path(&self) -> &Path {
        self.store.path()
    }

    pub fn add_card(&mut self, front: &str, back: &str, today: NaiveDate) -> Result<Card> {
        let description = format!("add \"{}\"", front.trim());
        self.mutate(description, |deck| deck.add_card(front, back, today))
    }

    /// Change the text of a card; retention state is untouched
    pub fn edit_card(&mut self, id: &str, front: Option<&str>, back: Option<&str>) -> Result<Card> {
        let mut card = self.deck.get_card(id)?.clone();
        if let Some(front) = front {
            card.front = front.trim().to_string();
        }
        if let Some(back) = back {
            card.back = back.trim().to_string();
        }

        let description = format!("edit \"{}\"", card.front);
        self.mutate(description, |deck| {
            deck.update_card(id, card.clone())?;
            Ok(card)
        })
    }

    pub fn delete_card(&mut self, id: &str) -> Result<Card> {
        let front = self.deck.get_card(id)?.front.clone();
        self.mutate(format!("delete \"{}\"", front), |deck| deck.delete_card(id))
    }

    /// Store the scheduler's output for a reviewed card
    pub fn apply_review(&mut self, reviewed: Card, quality: Quality) -> Result<()> {
        let description = format!("review \"{}\" as {}", reviewed.front, quality);
        let id = reviewed.id.clone();
        self.mutate(description, |deck| deck.update_card(&id, reviewed))
    }

    /// Revert the latest change. Returns its description, or `None` when
    /// there is nothing to undo.
    pub fn undo(&mut self) -> Option<String> {
        let snapshot = self.history.undo(self.deck.cards().to_vec())?;
        self.deck.replace_cards(snapshot.cards);
        log::info!("Undid {}", snapshot.description);
        Some(snapshot.description)
    }

    /// Reapply the latest undone change
    pub fn redo(&mut self) -> Option<String> {
        let snapshot = self.history.redo(self.deck.cards().to_vec())?;
        self.deck.replace_cards(snapshot.cards);
        log::info!("Redid {}", snapshot.description);
        Some(snapshot.description)
    }

    /// Persist the deck, then the history. A history that cannot be written
    /// only costs undo steps, so that failure is logged rather than returned.
    pub fn save(&self) -> Result<()> {
        self.store.save(&self.deck)?;
        if let Err(e) = self.history.save(&self.history_path) {
            log::warn!("Failed to save history {:?}: {}", self.history_path, e);
        }
        Ok(())
    }

    fn mutate<T>(
        &mut self,
        description: String,
        change: impl FnOnce(&mut Deck) -> Result<T>,
    ) -> Result<T> {
        let before = self.deck.cards().to_vec();
        let out = change(&mut self.deck)?;
        self.history.record(Snapshot::new(description, before));
        Ok(out)
    }
}
