//! Bounded undo/redo history of whole-deck snapshots.
//!
//! A snapshot is taken before every mutation. Recording a new snapshot
//! clears the redo stack; only `undo` ever pushes onto it. Both stacks hold
//! at most `capacity` entries and drop the oldest first.
//!
//! The log is stored next to its deck as `{stem}.history.json` so that undo
//! works across separate runs.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::flashcards::storage::{validate_cards, write_atomic, Result};
use crate::flashcards::Card;

/// Default number of undo steps kept
pub const DEFAULT_CAPACITY: usize = 20;

/// Full copy of a deck's cards, taken before a change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub description: String,
    pub taken_at: DateTime<Utc>,
    pub cards: Vec<Card>,
}

impl Snapshot {
    pub fn new(description: impl Into<String>, cards: Vec<Card>) -> Self {
        Self {
            description: description.into(),
            taken_at: Utc::now(),
            cards,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct HistoryFile {
    #[serde(default)]
    undo: VecDeque<Snapshot>,
    #[serde(default)]
    redo: VecDeque<Snapshot>,
}

#[derive(Debug, Clone)]
pub struct HistoryLog {
    capacity: usize,
    // Oldest at the front
    undo: VecDeque<Snapshot>,
    redo: VecDeque<Snapshot>,
}

impl HistoryLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            undo: VecDeque::with_capacity(capacity),
            redo: VecDeque::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    /// Description of the change `undo` would revert
    pub fn peek_undo(&self) -> Option<&str> {
        self.undo.back().map(|s| s.description.as_str())
    }

    /// Description of the change `redo` would reapply
    pub fn peek_redo(&self) -> Option<&str> {
        self.redo.back().map(|s| s.description.as_str())
    }

    /// Push the pre-change state. Any new change invalidates the redo branch.
    pub fn record(&mut self, snapshot: Snapshot) {
        self.redo.clear();
        push_bounded(&mut self.undo, snapshot, self.capacity);
    }

    /// Pop the latest pre-change state for the caller to install. The live
    /// `current` cards move to the redo stack. Returns `None` and changes
    /// nothing when there is nothing to undo.
    pub fn undo(&mut self, current: Vec<Card>) -> Option<Snapshot> {
        let snapshot = self.undo.pop_back()?;
        let after = Snapshot::new(snapshot.description.clone(), current);
        push_bounded(&mut self.redo, after, self.capacity);
        Some(snapshot)
    }

    /// Inverse of `undo`
    pub fn redo(&mut self, current: Vec<Card>) -> Option<Snapshot> {
        let snapshot = self.redo.pop_back()?;
        let before = Snapshot::new(snapshot.description.clone(), current);
        push_bounded(&mut self.undo, before, self.capacity);
        Some(snapshot)
    }

    /// History file that belongs to a deck file
    pub fn path_for(deck_path: &Path) -> PathBuf {
        let stem = deck_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "deck".to_string());
        deck_path.with_file_name(format!("{}.history.json", stem))
    }

    /// Load a saved history. A missing or unreadable file gives an empty log,
    /// as does one holding a snapshot that would not load as a deck; the
    /// deck itself never depends on it.
    pub fn load(path: &Path, capacity: usize) -> Self {
        let mut log = Self::new(capacity);
        if !path.exists() {
            return log;
        }

        let file = fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|content| {
                serde_json::from_str::<HistoryFile>(&content).map_err(|e| e.to_string())
            })
            .and_then(|file| {
                for snapshot in file.undo.iter().chain(file.redo.iter()) {
                    validate_cards(&snapshot.cards)
                        .map_err(|reason| format!("snapshot '{}': {}", snapshot.description, reason))?;
                }
                Ok(file)
            });

        match file {
            Ok(file) => {
                for snapshot in file.undo {
                    push_bounded(&mut log.undo, snapshot, log.capacity);
                }
                for snapshot in file.redo {
                    push_bounded(&mut log.redo, snapshot, log.capacity);
                }
            }
            Err(e) => {
                log::warn!("Ignoring unreadable history {:?}: {}", path, e);
            }
        }
        log
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = HistoryFile {
            undo: self.undo.clone(),
            redo: self.redo.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;
        write_atomic(path, json.as_bytes())?;
        Ok(())
    }
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

fn push_bounded(stack: &mut VecDeque<Snapshot>, snapshot: Snapshot, capacity: usize) {
    stack.push_back(snapshot);
    while stack.len() > capacity {
        if let Some(evicted) = stack.pop_front() {
            log::debug!("History full, dropping '{}'", evicted.description);
        }
    }
}
