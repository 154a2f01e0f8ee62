use std::fmt;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};

use recall_lib::flashcards::{Card, DeckError, DeckStore};
use recall_lib::{Config, OpenDeck};

/// The user chose not to recover a corrupt deck
#[derive(Debug)]
pub struct RecoveryDeclined {
    path: PathBuf,
}

impl fmt::Display for RecoveryDeclined {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Left corrupt deck {} untouched", self.path.display())
    }
}

impl std::error::Error for RecoveryDeclined {}

/// Shared application state for CLI commands
pub struct App {
    pub config: Config,
    pub open: OpenDeck,
    pub today: NaiveDate,
}

impl App {
    /// Load config and open the deck, asking how to recover if it is corrupt
    pub fn new(deck: Option<PathBuf>, config_path: Option<&Path>) -> Result<Self> {
        let config = match config_path {
            Some(path) => Config::load(path),
            None => Config::load_default(),
        }
        .context("Failed to load config")?;

        let deck_path = match deck {
            Some(path) => path,
            None => config.deck_path().context("Failed to locate deck file")?,
        };

        let open = match OpenDeck::open(deck_path.clone(), config.history_capacity) {
            Ok(open) => open,
            Err(DeckError::CorruptData { path, reason }) => {
                recover(&path, &reason, config.history_capacity)?
            }
            Err(e) => {
                return Err(e).context(format!("Failed to open deck {}", deck_path.display()))
            }
        };

        Ok(Self {
            config,
            open,
            today: Local::now().date_naive(),
        })
    }

    /// Find a card by id or unique id prefix
    pub fn find_card(&self, id: &str) -> Result<Card> {
        let card = self.open.deck().find_card(id)?;
        Ok(card.clone())
    }

    /// Persist after a change, warning that the file may be stale on failure
    pub fn save(&self) -> Result<()> {
        self.open.save().with_context(|| {
            format!(
                "Failed to save {}; the change is not on disk",
                self.open.path().display()
            )
        })
    }
}

/// Offer the ways out of a corrupt deck file. Nothing on disk changes until
/// the user picks one.
fn recover(path: &Path, reason: &str, history_capacity: usize) -> Result<OpenDeck> {
    let store = DeckStore::new(path.to_path_buf());
    eprintln!("Deck file {} is corrupt: {}", path.display(), reason);

    if !io::stdin().is_terminal() {
        return Err(RecoveryDeclined {
            path: path.to_path_buf(),
        }
        .into());
    }

    let has_backup = store.has_backup();
    if has_backup {
        eprintln!("  [r] restore from {}", store.backup_path().display());
    }
    eprintln!("  [e] start an empty deck (the corrupt file is kept alongside)");
    eprintln!("  [q] quit without changing anything");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        eprint!("Choice: ");
        io::stderr().flush().ok();

        let choice = match lines.next() {
            Some(line) => line?.trim().to_lowercase(),
            None => String::from("q"),
        };

        match choice.as_str() {
            "r" if has_backup => {
                let deck = store.restore_backup().context("Failed to read backup")?;
                let moved = store.set_aside_corrupt()?;
                let open = OpenDeck::from_parts(store, deck, history_capacity);
                open.save().context("Failed to write restored deck")?;
                eprintln!(
                    "Restored {} cards; corrupt file kept at {}",
                    open.deck().len(),
                    moved.display()
                );
                return Ok(open);
            }
            "e" => {
                let moved = store.set_aside_corrupt()?;
                let deck = store.load()?;
                eprintln!("Starting empty; corrupt file kept at {}", moved.display());
                return Ok(OpenDeck::from_parts(store, deck, history_capacity));
            }
            "q" => {
                return Err(RecoveryDeclined {
                    path: path.to_path_buf(),
                }
                .into())
            }
            _ => eprintln!("Please answer {}e or q", if has_backup { "r, " } else { "" }),
        }
    }
}
