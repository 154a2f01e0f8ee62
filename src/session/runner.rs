//! Study session over the cards that are due

use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use rand::seq::SliceRandom;
use serde::Serialize;

use super::open_deck::OpenDeck;
use crate::flashcards::algorithm::{preview_intervals, schedule};
use crate::flashcards::storage::{save_cards, DeckError, Result};
use crate::flashcards::{Card, Quality, ReviewEvent};
use crate::history::HistoryLog;

/// What the reviewer is told about the card being asked
#[derive(Debug, Clone)]
pub struct PromptContext {
    /// 1-based position in this session
    pub position: usize,
    pub total: usize,
    /// Resulting interval for Again, Hard, Good, Easy
    pub preview: [u32; 4],
}

/// Presents a card and collects a rating
pub trait ReviewPrompt {
    /// `Ok(None)` ends the session early
    fn review(&mut self, card: &Card, context: &PromptContext) -> io::Result<Option<Quality>>;
}

/// State of a running session as of the last review, kept where an
/// interrupt handler on another thread can reach it.
#[derive(Debug, Clone, Default)]
pub struct CheckpointSlot {
    latest: Arc<Mutex<Option<Published>>>,
}

#[derive(Debug, Clone)]
struct Published {
    cards: Vec<Card>,
    history: HistoryLog,
}

impl CheckpointSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, cards: &[Card], history: &HistoryLog) {
        let mut slot = match self.latest.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *slot = Some(Published {
            cards: cards.to_vec(),
            history: history.clone(),
        });
    }

    /// Write the last published deck to `deck_path` and its history next to
    /// it, the same pair `OpenDeck::save` writes. Returns `false` when
    /// nothing has been published yet.
    pub fn save_latest(&self, deck_path: &Path) -> Result<bool> {
        let slot = match self.latest.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let Some(published) = slot.as_ref() else {
            return Ok(false);
        };

        save_cards(deck_path, &published.cards)?;
        let history_path = HistoryLog::path_for(deck_path);
        if let Err(e) = published.history.save(&history_path) {
            log::warn!("Failed to save history {:?}: {}", history_path, e);
        }
        Ok(true)
    }
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Review at most this many cards; the most overdue are taken first
    pub limit: Option<usize>,
    /// Shuffle the selected cards
    pub shuffle: bool,
    /// Save after this many reviewed cards
    pub checkpoint_every: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            limit: None,
            shuffle: false,
            checkpoint_every: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StopReason {
    /// Every selected card was reviewed
    Finished,
    /// The reviewer asked to stop
    Quit,
    /// The interrupt flag was raised
    Interrupted,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    /// Cards selected for the session
    pub selected: usize,
    pub reviewed: usize,
    pub again: usize,
    pub hard: usize,
    pub good: usize,
    pub easy: usize,
    pub checkpoints: usize,
    /// Intermediate saves that failed; the final save still ran
    pub failed_checkpoints: usize,
    pub stopped: StopReason,
    #[serde(skip)]
    pub events: Vec<ReviewEvent>,
}

impl SessionSummary {
    fn new(selected: usize) -> Self {
        Self {
            selected,
            reviewed: 0,
            again: 0,
            hard: 0,
            good: 0,
            easy: 0,
            checkpoints: 0,
            failed_checkpoints: 0,
            stopped: StopReason::Finished,
            events: Vec::new(),
        }
    }

    fn count(&mut self, quality: Quality) {
        self.reviewed += 1;
        match quality {
            Quality::Again => self.again += 1,
            Quality::Hard => self.hard += 1,
            Quality::Good => self.good += 1,
            Quality::Easy => self.easy += 1,
        }
    }
}

pub struct SessionRunner<'a> {
    open: &'a mut OpenDeck,
    options: SessionOptions,
    interrupted: Arc<AtomicBool>,
    slot: Option<CheckpointSlot>,
}

impl<'a> SessionRunner<'a> {
    pub fn new(open: &'a mut OpenDeck, options: SessionOptions) -> Self {
        Self {
            open,
            options,
            interrupted: Arc::new(AtomicBool::new(false)),
            slot: None,
        }
    }

    /// Stop at the next card once this flag is raised
    pub fn with_interrupt(mut self, interrupted: Arc<AtomicBool>) -> Self {
        self.interrupted = interrupted;
        self
    }

    /// Publish the deck here after every review
    pub fn with_checkpoint_slot(mut self, slot: CheckpointSlot) -> Self {
        self.slot = Some(slot);
        self
    }

    /// Cards this session will ask, in order
    pub fn select_cards(&self, today: NaiveDate) -> Vec<Card> {
        let mut cards = self.open.deck().get_due_cards(today);
        if let Some(limit) = self.options.limit {
            cards.truncate(limit);
        }
        if self.options.shuffle {
            cards.shuffle(&mut rand::thread_rng());
        }
        cards
    }

    /// Review due cards until they run out, the prompt stops, or the
    /// interrupt flag is raised. The deck is saved on every exit path.
    pub fn run<P: ReviewPrompt>(self, prompt: &mut P, today: NaiveDate) -> Result<SessionSummary> {
        let cards = self.select_cards(today);
        let total = cards.len();
        let mut summary = SessionSummary::new(total);
        log::info!("Starting session with {} due cards", total);

        self.publish();

        for (index, card) in cards.iter().enumerate() {
            if self.interrupted.load(Ordering::SeqCst) {
                summary.stopped = StopReason::Interrupted;
                break;
            }

            let context = PromptContext {
                position: index + 1,
                total,
                preview: preview_intervals(card, today),
            };

            let quality = match prompt.review(card, &context) {
                Ok(Some(quality)) => quality,
                Ok(None) => {
                    summary.stopped = StopReason::Quit;
                    break;
                }
                Err(e) => return Err(self.save_before_failing(e.into())),
            };

            let reviewed = schedule(card, quality, today);
            log::debug!(
                "Card {} graded {}: interval {} -> {}, ease {} -> {}",
                card.id,
                quality,
                card.interval_days,
                reviewed.interval_days,
                card.ease_factor,
                reviewed.ease_factor
            );
            if let Err(e) = self.open.apply_review(reviewed, quality) {
                return Err(self.save_before_failing(e));
            }
            summary.count(quality);
            summary.events.push(ReviewEvent::new(card.id.clone(), quality));
            self.publish();

            if summary.reviewed % self.options.checkpoint_every.max(1) == 0 {
                match self.open.save() {
                    Ok(()) => summary.checkpoints += 1,
                    Err(e) => {
                        log::warn!("Checkpoint save failed, continuing: {}", e);
                        summary.failed_checkpoints += 1;
                    }
                }
            }
        }

        if summary.stopped == StopReason::Finished && self.interrupted.load(Ordering::SeqCst) {
            summary.stopped = StopReason::Interrupted;
        }

        self.open.save()?;
        log::info!(
            "Session ended ({:?}): {} of {} cards reviewed",
            summary.stopped,
            summary.reviewed,
            total
        );
        Ok(summary)
    }

    fn publish(&self) {
        if let Some(slot) = &self.slot {
            slot.publish(self.open.deck().cards(), self.open.history());
        }
    }

    /// Keep what was reviewed so far before giving up on the session
    fn save_before_failing(&self, error: DeckError) -> DeckError {
        if let Err(save_err) = self.open.save() {
            log::error!("Save after '{}' also failed: {}", error, save_err);
        }
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flashcards::DeckStore;
    use std::collections::VecDeque;
    use tempfile::TempDir;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 9, 1).unwrap()
    }

    /// Answers from a script; `None` in the script means "quit"
    struct ScriptedPrompt {
        answers: VecDeque<Option<Quality>>,
        asked: Vec<String>,
        interrupt_after: Option<(usize, Arc<AtomicBool>)>,
        // Reviewed cards found on disk each time a card is asked
        saved_counts: Vec<usize>,
        deck_path: Option<std::path::PathBuf>,
        // Run once, when the given card number is asked
        hook: Option<(usize, Box<dyn FnMut()>)>,
    }

    impl ScriptedPrompt {
        fn new(answers: Vec<Option<Quality>>) -> Self {
            Self {
                answers: answers.into(),
                asked: Vec::new(),
                interrupt_after: None,
                saved_counts: Vec::new(),
                deck_path: None,
                hook: None,
            }
        }

        fn always(quality: Quality, n: usize) -> Self {
            Self::new(vec![Some(quality); n])
        }
    }

    impl ReviewPrompt for ScriptedPrompt {
        fn review(&mut self, card: &Card, _context: &PromptContext) -> io::Result<Option<Quality>> {
            self.asked.push(card.front.clone());
            if let Some(path) = &self.deck_path {
                let reviewed_on_disk = DeckStore::new(path.clone())
                    .load()
                    .map(|d| d.cards().iter().filter(|c| c.review_count > 0).count())
                    .unwrap_or(0);
                self.saved_counts.push(reviewed_on_disk);
            }
            if let Some((n, hook)) = &mut self.hook {
                if self.asked.len() == *n {
                    hook();
                }
            }
            if let Some((n, flag)) = &self.interrupt_after {
                if self.asked.len() == *n {
                    flag.store(true, Ordering::SeqCst);
                }
            }
            Ok(self.answers.pop_front().flatten())
        }
    }

    struct FailingPrompt;

    impl ReviewPrompt for FailingPrompt {
        fn review(&mut self, _card: &Card, _context: &PromptContext) -> io::Result<Option<Quality>> {
            Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stdin closed"))
        }
    }

    fn deck_with(n: usize) -> (OpenDeck, TempDir) {
        let temp = TempDir::new().unwrap();
        let mut open = OpenDeck::open(temp.path().join("deck.json"), 50).unwrap();
        for i in 0..n {
            open.add_card(&format!("card {}", i), "", day()).unwrap();
        }
        (open, temp)
    }

    fn reviewed_on_disk(temp: &TempDir) -> usize {
        DeckStore::new(temp.path().join("deck.json"))
            .load()
            .unwrap()
            .cards()
            .iter()
            .filter(|c| c.review_count > 0)
            .count()
    }

    #[test]
    fn test_reviews_all_due_cards() {
        let (mut open, temp) = deck_with(3);
        let mut prompt = ScriptedPrompt::always(Quality::Good, 3);

        let summary = SessionRunner::new(&mut open, SessionOptions::default())
            .run(&mut prompt, day())
            .unwrap();

        assert_eq!(summary.reviewed, 3);
        assert_eq!(summary.good, 3);
        assert_eq!(summary.stopped, StopReason::Finished);
        assert_eq!(summary.events.len(), 3);
        assert!(open.deck().get_due_cards(day()).is_empty());
        assert_eq!(reviewed_on_disk(&temp), 3);
    }

    #[test]
    fn test_checkpoint_every_five_cards() {
        let (mut open, temp) = deck_with(12);
        let mut prompt = ScriptedPrompt::always(Quality::Easy, 12);
        prompt.deck_path = Some(temp.path().join("deck.json"));

        let summary = SessionRunner::new(&mut open, SessionOptions::default())
            .run(&mut prompt, day())
            .unwrap();

        assert_eq!(summary.checkpoints, 2);
        // What was on disk when each card was asked
        assert_eq!(
            prompt.saved_counts,
            vec![0, 0, 0, 0, 0, 5, 5, 5, 5, 5, 10, 10]
        );
        assert_eq!(reviewed_on_disk(&temp), 12);
    }

    #[test]
    fn test_quit_saves_progress() {
        let (mut open, temp) = deck_with(4);
        let mut prompt = ScriptedPrompt::new(vec![Some(Quality::Hard), Some(Quality::Again), None]);

        let summary = SessionRunner::new(&mut open, SessionOptions::default())
            .run(&mut prompt, day())
            .unwrap();

        assert_eq!(summary.stopped, StopReason::Quit);
        assert_eq!(summary.reviewed, 2);
        assert_eq!(summary.hard, 1);
        assert_eq!(summary.again, 1);
        assert_eq!(reviewed_on_disk(&temp), 2);
    }

    #[test]
    fn test_interrupt_stops_and_saves() {
        let (mut open, temp) = deck_with(6);
        let flag = Arc::new(AtomicBool::new(false));
        let mut prompt = ScriptedPrompt::always(Quality::Good, 6);
        prompt.interrupt_after = Some((2, flag.clone()));

        let summary = SessionRunner::new(&mut open, SessionOptions::default())
            .with_interrupt(flag)
            .run(&mut prompt, day())
            .unwrap();

        assert_eq!(summary.stopped, StopReason::Interrupted);
        assert_eq!(summary.reviewed, 2);
        assert_eq!(prompt.asked.len(), 2);
        assert_eq!(reviewed_on_disk(&temp), 2);
    }

    #[test]
    fn test_limit_takes_most_overdue() {
        let temp = TempDir::new().unwrap();
        let mut open = OpenDeck::open(temp.path().join("deck.json"), 50).unwrap();
        open.add_card("today", "", day()).unwrap();
        open.add_card("old", "", day().pred_opt().unwrap()).unwrap();
        open.add_card("tomorrow", "", day().succ_opt().unwrap()).unwrap();

        let options = SessionOptions {
            limit: Some(1),
            ..SessionOptions::default()
        };
        let mut prompt = ScriptedPrompt::always(Quality::Good, 3);
        let summary = SessionRunner::new(&mut open, options)
            .run(&mut prompt, day())
            .unwrap();

        assert_eq!(summary.selected, 1);
        assert_eq!(prompt.asked, vec!["old"]);
    }

    #[test]
    fn test_shuffle_keeps_the_same_cards() {
        let (mut open, _temp) = deck_with(8);
        let options = SessionOptions {
            shuffle: true,
            ..SessionOptions::default()
        };
        let runner = SessionRunner::new(&mut open, options);
        let mut fronts: Vec<String> = runner.select_cards(day()).into_iter().map(|c| c.front).collect();
        fronts.sort();
        let expected: Vec<String> = (0..8).map(|i| format!("card {}", i)).collect();
        assert_eq!(fronts, expected);
    }

    #[test]
    fn test_prompt_failure_saves_before_returning() {
        let (mut open, temp) = deck_with(2);
        let result = SessionRunner::new(&mut open, SessionOptions::default())
            .run(&mut FailingPrompt, day());

        assert!(result.is_err());
        assert_eq!(
            DeckStore::new(temp.path().join("deck.json")).load().unwrap().len(),
            2
        );
    }

    #[test]
    fn test_checkpoint_slot_tracks_reviews() {
        let (mut open, temp) = deck_with(2);
        let slot = CheckpointSlot::new();
        assert!(!slot.save_latest(&temp.path().join("copy.json")).unwrap());
        let mut prompt = ScriptedPrompt::always(Quality::Good, 2);

        SessionRunner::new(&mut open, SessionOptions::default())
            .with_checkpoint_slot(slot.clone())
            .run(&mut prompt, day())
            .unwrap();

        let copy = temp.path().join("copy.json");
        assert!(slot.save_latest(&copy).unwrap());
        let saved = OpenDeck::open(copy, 50).unwrap();
        assert_eq!(saved.deck().cards(), open.deck().cards());
        assert!(saved.deck().cards().iter().all(|c| c.review_count == 1));
        assert_eq!(saved.history().undo_len(), open.history().undo_len());
    }

    #[test]
    fn test_interrupt_after_checkpoint_keeps_undo_in_step() {
        let (mut open, temp) = deck_with(10);
        let slot = CheckpointSlot::new();
        // What the Ctrl-C handler leaves on disk when pressed while the
        // eighth card is shown, after the checkpoint at five
        let at_exit = temp.path().join("at_exit.json");
        let mut prompt = ScriptedPrompt::always(Quality::Good, 10);
        {
            let slot = slot.clone();
            let at_exit = at_exit.clone();
            let interrupt: Box<dyn FnMut()> = Box::new(move || {
                slot.save_latest(&at_exit).unwrap();
            });
            prompt.hook = Some((8, interrupt));
        }

        SessionRunner::new(&mut open, SessionOptions::default())
            .with_checkpoint_slot(slot)
            .run(&mut prompt, day())
            .unwrap();

        let mut reopened = OpenDeck::open(at_exit, 50).unwrap();
        let reviewed = |open: &OpenDeck| {
            open.deck()
                .cards()
                .iter()
                .filter(|c| c.review_count > 0)
                .count()
        };
        assert_eq!(reviewed(&reopened), 7);

        let last_front = &prompt.asked[6];
        assert_eq!(
            reopened.undo().unwrap(),
            format!("review \"{}\" as good", last_front)
        );
        assert_eq!(reviewed(&reopened), 6);
    }

    /// Put a directory where the deck file goes, so every save fails
    fn block_saves(temp: &TempDir) -> std::path::PathBuf {
        let path = temp.path().join("deck.json");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("occupied"), "").unwrap();
        path
    }

    #[test]
    fn test_failed_checkpoints_are_counted_and_session_continues() {
        let (mut open, temp) = deck_with(6);
        let blocked = block_saves(&temp);
        let options = SessionOptions {
            checkpoint_every: 2,
            ..SessionOptions::default()
        };
        let mut prompt = ScriptedPrompt::always(Quality::Good, 6);
        let unblock: Box<dyn FnMut()> = Box::new(move || std::fs::remove_dir_all(&blocked).unwrap());
        prompt.hook = Some((5, unblock));

        let summary = SessionRunner::new(&mut open, options)
            .run(&mut prompt, day())
            .unwrap();

        assert_eq!(summary.reviewed, 6);
        assert_eq!(summary.failed_checkpoints, 2);
        assert_eq!(summary.checkpoints, 1);
        assert_eq!(prompt.asked.len(), 6);
        assert_eq!(reviewed_on_disk(&temp), 6);
    }

    #[test]
    fn test_failed_final_save_is_returned_and_reviews_kept() {
        let (mut open, temp) = deck_with(3);
        block_saves(&temp);
        let mut prompt = ScriptedPrompt::always(Quality::Easy, 3);

        let result = SessionRunner::new(&mut open, SessionOptions::default())
            .run(&mut prompt, day());

        assert!(matches!(result, Err(DeckError::Io(_))));
        assert_eq!(prompt.asked.len(), 3);
        assert!(open.deck().cards().iter().all(|c| c.review_count == 1));
        assert!(open.deck().get_due_cards(day()).is_empty());
    }

    #[test]
    fn test_prompt_failure_with_failing_save_returns_prompt_error() {
        let (mut open, temp) = deck_with(2);
        block_saves(&temp);

        let result = SessionRunner::new(&mut open, SessionOptions::default())
            .run(&mut FailingPrompt, day());

        match result {
            Err(DeckError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof),
            other => panic!("expected the prompt's error, got {:?}", other),
        }
    }

    #[test]
    fn test_each_review_is_undoable() {
        let (mut open, _temp) = deck_with(2);
        let before = open.deck().cards().to_vec();
        let mut prompt = ScriptedPrompt::always(Quality::Easy, 2);

        SessionRunner::new(&mut open, SessionOptions::default())
            .run(&mut prompt, day())
            .unwrap();

        open.undo().unwrap();
        open.undo().unwrap();
        assert_eq!(open.deck().cards(), &before[..]);
    }

    #[test]
    fn test_nothing_due() {
        let (mut open, _temp) = deck_with(0);
        let mut prompt = ScriptedPrompt::new(Vec::new());
        let summary = SessionRunner::new(&mut open, SessionOptions::default())
            .run(&mut prompt, day())
            .unwrap();
        assert_eq!(summary.selected, 0);
        assert_eq!(summary.stopped, StopReason::Finished);
        assert!(prompt.asked.is_empty());
    }
}
