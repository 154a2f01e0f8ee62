//! Flashcards and spaced repetition
//!
//! This module provides:
//! - Card and rating models
//! - The review scheduler (SM-2 style, fixed ease steps)
//! - The in-memory deck with CRUD
//! - Deck file persistence with atomic saves and a last-good backup

pub mod algorithm;
mod deck;
pub mod models;
pub mod storage;

pub use deck::Deck;
pub use models::*;
pub use storage::{DeckError, DeckStore};
