//! Persistence for a single deck file
//!
//! Files kept next to each other:
//! ```text
//! {dir}/
//! ├── deck.json                      # the deck
//! ├── deck.json.bak                  # copy of the last successful save
//! └── deck.json.corrupt-{timestamp}  # set aside by the user after a failed load
//! ```
//!
//! Every write goes to a uniquely named temporary file in the same directory
//! and is renamed over the target, so a crash leaves either the old or the new
//! file intact.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::deck::Deck;
use super::models::Card;

#[derive(Error, Debug)]
pub enum DeckError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Card not found: {0}")]
    CardNotFound(String),

    #[error("Deck file {path} is corrupt: {reason}")]
    CorruptData { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DeckError>;

/// On-disk shape of a deck
#[derive(Debug, Deserialize)]
struct DeckFile {
    cards: Vec<Card>,
}

/// Loads and saves one deck file
#[derive(Debug, Clone)]
pub struct DeckStore {
    path: PathBuf,
}

impl DeckStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Deck name, taken from the file stem
    pub fn deck_name(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "deck".to_string())
    }

    /// Path of the last-good backup
    pub fn backup_path(&self) -> PathBuf {
        sibling_path(&self.path, ".bak")
    }

    pub fn has_backup(&self) -> bool {
        self.backup_path().is_file()
    }

    /// Load the deck. A missing file is an empty deck; a file that cannot be
    /// parsed or breaks a card invariant is `CorruptData`.
    pub fn load(&self) -> Result<Deck> {
        if !self.path.exists() {
            log::info!("No deck at {:?}, starting empty", self.path);
            return Ok(Deck::new(self.deck_name()));
        }

        let deck = read_deck(&self.path, self.deck_name())?;
        log::info!("Loaded {} cards from {:?}", deck.len(), self.path);
        Ok(deck)
    }

    /// Save the deck atomically, then refresh the backup
    pub fn save(&self, deck: &Deck) -> Result<()> {
        save_cards(&self.path, deck.cards())
    }

    /// Load the backup without touching the deck file. The caller saves the
    /// result once the user has accepted it.
    pub fn restore_backup(&self) -> Result<Deck> {
        let backup = self.backup_path();
        if !backup.is_file() {
            return Err(DeckError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no backup at {}", backup.display()),
            )));
        }
        let deck = read_deck(&backup, self.deck_name())?;
        log::info!("Restored {} cards from backup {:?}", deck.len(), backup);
        Ok(deck)
    }

    /// Move a corrupt deck file out of the way so an empty deck can be
    /// started without destroying it. Returns where the file went.
    pub fn set_aside_corrupt(&self) -> Result<PathBuf> {
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let target = sibling_path(&self.path, &format!(".corrupt-{}", stamp));
        fs::rename(&self.path, &target)?;
        log::warn!("Moved corrupt deck {:?} to {:?}", self.path, target);
        Ok(target)
    }
}

/// Write the cards to `path` and refresh its backup.
///
/// Takes a plain slice so the interrupt handler can save the latest
/// published state without holding a `Deck`.
pub fn save_cards(path: &Path, cards: &[Card]) -> Result<()> {
    let file = DeckFileRef { cards };
    let json = serde_json::to_string_pretty(&file)?;

    write_atomic(path, json.as_bytes())?;
    log::debug!("Saved {} cards to {:?}", cards.len(), path);

    let backup = sibling_path(path, ".bak");
    if let Err(e) = write_atomic(&backup, json.as_bytes()) {
        log::warn!("Failed to refresh backup {:?}: {}", backup, e);
    }

    Ok(())
}

#[derive(Serialize)]
struct DeckFileRef<'a> {
    cards: &'a [Card],
}

fn read_deck(path: &Path, name: String) -> Result<Deck> {
    let content = fs::read_to_string(path).map_err(|e| match e.kind() {
        io::ErrorKind::InvalidData => corrupt(path, "file is not valid UTF-8"),
        _ => DeckError::Io(e),
    })?;

    let file: DeckFile =
        serde_json::from_str(&content).map_err(|e| corrupt(path, &e.to_string()))?;

    validate_cards(&file.cards).map_err(|reason| corrupt(path, &reason))?;

    Ok(Deck::from_cards(name, file.cards))
}

/// Check every card's invariants and that ids are unique. Anything that
/// would be installed as a deck goes through here.
pub(crate) fn validate_cards(cards: &[Card]) -> std::result::Result<(), String> {
    let mut seen = HashSet::new();
    for card in cards {
        card.check()?;
        if !seen.insert(card.id.as_str()) {
            return Err(format!("duplicate card id {}", card.id));
        }
    }
    Ok(())
}

fn corrupt(path: &Path, reason: &str) -> DeckError {
    DeckError::CorruptData {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// `deck.json` + `.bak` -> `deck.json.bak`
fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

/// Write to a temporary file in the target's directory, sync it, and rename
/// it over the target.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let tmp_path = path.with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4()));

    let result = (|| {
        let mut file = File::create(&tmp_path)?;
        file.write_all(contents)?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}
