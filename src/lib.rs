//! Spaced-repetition flashcards: a review scheduler, a deck file with
//! atomic saves and backups, and a bounded undo/redo history.

pub mod config;
pub mod flashcards;
pub mod history;
pub mod session;

pub use config::{Config, ConfigError};
pub use flashcards::{Card, Deck, DeckError, DeckStore, Quality, RatingScale};
pub use history::{HistoryLog, Snapshot};
pub use session::{OpenDeck, SessionOptions, SessionRunner, SessionSummary};
