//! Data models for the flashcard system

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::storage::DeckError;

/// Lower bound of the ease factor
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// Upper bound of the ease factor
pub const MAX_EASE_FACTOR: f64 = 5.0;

/// Ease factor given to new cards
pub const DEFAULT_EASE_FACTOR: f64 = 2.5;

/// Interval given to new cards
pub const DEFAULT_INTERVAL_DAYS: u32 = 1;

/// Longest interval the scheduler hands out, about a hundred years
pub const MAX_INTERVAL_DAYS: u32 = 36_500;

/// Interval at which a card counts as mature
pub const MATURE_INTERVAL_DAYS: u32 = 21;

/// A flashcard with question (front), answer (back) and its retention state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    pub front: String,
    #[serde(default)]
    pub back: String,
    /// Days until the next review after a successful grade
    pub interval_days: u32,
    /// Multiplier applied to the interval on successful recall
    pub ease_factor: f64,
    /// The card is due when this date is on or before today
    pub next_review: NaiveDate,
    /// Number of graded reviews
    #[serde(default)]
    pub review_count: u32,
}

impl Card {
    pub fn new(front: String, back: String, today: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            front,
            back,
            interval_days: DEFAULT_INTERVAL_DAYS,
            ease_factor: DEFAULT_EASE_FACTOR,
            next_review: today,
            review_count: 0,
        }
    }

    /// Check if the card is due for review
    pub fn is_due(&self, today: NaiveDate) -> bool {
        self.next_review <= today
    }

    /// Whether the card has never been graded
    pub fn is_new(&self) -> bool {
        self.review_count == 0
    }

    /// Check the card invariants, returning a description of the first violation
    pub fn check(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("card id is empty".to_string());
        }
        if self.front.trim().is_empty() {
            return Err(format!("card {} has an empty front", self.id));
        }
        if self.interval_days < 1 {
            return Err(format!("card {} has interval_days 0", self.id));
        }
        if self.interval_days > MAX_INTERVAL_DAYS {
            return Err(format!(
                "card {} has interval_days {} above {}",
                self.id, self.interval_days, MAX_INTERVAL_DAYS
            ));
        }
        if !(MIN_EASE_FACTOR..=MAX_EASE_FACTOR).contains(&self.ease_factor) {
            return Err(format!(
                "card {} has ease_factor {} outside [{}, {}]",
                self.id, self.ease_factor, MIN_EASE_FACTOR, MAX_EASE_FACTOR
            ));
        }
        Ok(())
    }
}

/// How well a card was recalled.
///
/// This is the only rating type the scheduler accepts. Wider numeric scales
/// are mapped onto it here and nowhere else:
///
/// | scale            | Again   | Hard | Good | Easy |
/// |------------------|---------|------|------|------|
/// | four-point (1-4) | 1       | 2    | 3    | 4    |
/// | SM-2 (0-5)       | 0, 1, 2 | 3    | 4    | 5    |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    /// Not recalled; the card starts over
    Again,
    /// Recalled with serious difficulty
    Hard,
    /// Recalled after some hesitation
    Good,
    /// Recalled effortlessly
    Easy,
}

impl Quality {
    pub const ALL: [Quality; 4] = [Quality::Again, Quality::Hard, Quality::Good, Quality::Easy];

    /// Map a four-point rating (1 = again .. 4 = easy)
    pub fn from_rating(rating: u8) -> Result<Self, DeckError> {
        match rating {
            1 => Ok(Quality::Again),
            2 => Ok(Quality::Hard),
            3 => Ok(Quality::Good),
            4 => Ok(Quality::Easy),
            other => Err(DeckError::Validation(format!(
                "rating {} is outside 1-4",
                other
            ))),
        }
    }

    /// Map an SM-2 quality grade (0 = blackout .. 5 = perfect)
    pub fn from_sm2(grade: u8) -> Result<Self, DeckError> {
        match grade {
            0..=2 => Ok(Quality::Again),
            3 => Ok(Quality::Hard),
            4 => Ok(Quality::Good),
            5 => Ok(Quality::Easy),
            other => Err(DeckError::Validation(format!(
                "quality {} is outside 0-5",
                other
            ))),
        }
    }

    /// Parse user input on the given numeric scale. Words and their first
    /// letters are accepted on either scale.
    pub fn parse_on(input: &str, scale: RatingScale) -> Result<Self, DeckError> {
        let input = input.trim();
        if let Ok(quality) = input.parse::<Quality>() {
            return Ok(quality);
        }
        let number: u8 = input
            .parse()
            .map_err(|_| DeckError::Validation(format!("'{}' is not a rating", input)))?;
        match scale {
            RatingScale::FourPoint => Self::from_rating(number),
            RatingScale::Sm2 => Self::from_sm2(number),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Again => "again",
            Quality::Hard => "hard",
            Quality::Good => "good",
            Quality::Easy => "easy",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quality {
    type Err = DeckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "again" | "a" => Ok(Quality::Again),
            "hard" | "h" => Ok(Quality::Hard),
            "good" | "g" => Ok(Quality::Good),
            "easy" | "e" => Ok(Quality::Easy),
            other => Err(DeckError::Validation(format!(
                "'{}' is not one of again, hard, good, easy",
                other
            ))),
        }
    }
}

/// Numeric scale the reviewer types ratings on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RatingScale {
    /// 1 = again, 2 = hard, 3 = good, 4 = easy
    #[default]
    FourPoint,
    /// Classic SM-2 grades 0-5
    Sm2,
}

impl RatingScale {
    /// Hint shown next to the rating prompt
    pub fn hint(&self) -> &'static str {
        match self {
            RatingScale::FourPoint => "1=again 2=hard 3=good 4=easy",
            RatingScale::Sm2 => "0-2=again 3=hard 4=good 5=easy",
        }
    }
}

/// A record of a single graded review, kept for the session summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewEvent {
    pub card_id: String,
    pub quality: Quality,
    pub timestamp: DateTime<Utc>,
}

impl ReviewEvent {
    pub fn new(card_id: String, quality: Quality) -> Self {
        Self {
            card_id,
            quality,
            timestamp: Utc::now(),
        }
    }
}

/// Statistics for a deck
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewStats {
    pub total_cards: usize,
    /// Never reviewed
    pub new_cards: usize,
    pub due_cards: usize,
    pub due_tomorrow: usize,
    /// Interval of three weeks or more
    pub mature_cards: usize,
    pub total_reviews: u64,
    /// Mean ease factor, 0 for an empty deck
    pub average_ease: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_new_card_defaults() {
        let card = Card::new("front".to_string(), String::new(), day(2026, 3, 1));
        assert_eq!(card.interval_days, 1);
        assert_eq!(card.ease_factor, 2.5);
        assert_eq!(card.review_count, 0);
        assert!(card.is_due(day(2026, 3, 1)));
        assert!(!card.is_due(day(2026, 2, 28)));
        assert!(card.check().is_ok());
    }

    #[test]
    fn test_check_rejects_broken_state() {
        let mut card = Card::new("q".to_string(), "a".to_string(), day(2026, 3, 1));
        card.interval_days = 0;
        assert!(card.check().is_err());

        card.interval_days = MAX_INTERVAL_DAYS + 1;
        assert!(card.check().is_err());

        card.interval_days = 3;
        card.ease_factor = 1.2;
        assert!(card.check().is_err());

        card.ease_factor = 2.0;
        card.front = "  ".to_string();
        assert!(card.check().is_err());
    }

    #[test]
    fn test_four_point_mapping() {
        assert_eq!(Quality::from_rating(1).unwrap(), Quality::Again);
        assert_eq!(Quality::from_rating(2).unwrap(), Quality::Hard);
        assert_eq!(Quality::from_rating(3).unwrap(), Quality::Good);
        assert_eq!(Quality::from_rating(4).unwrap(), Quality::Easy);
        assert!(matches!(Quality::from_rating(0), Err(DeckError::Validation(_))));
        assert!(matches!(Quality::from_rating(5), Err(DeckError::Validation(_))));
    }

    #[test]
    fn test_sm2_mapping() {
        for grade in 0..=2 {
            assert_eq!(Quality::from_sm2(grade).unwrap(), Quality::Again);
        }
        assert_eq!(Quality::from_sm2(3).unwrap(), Quality::Hard);
        assert_eq!(Quality::from_sm2(4).unwrap(), Quality::Good);
        assert_eq!(Quality::from_sm2(5).unwrap(), Quality::Easy);
        assert!(matches!(Quality::from_sm2(6), Err(DeckError::Validation(_))));
    }

    #[test]
    fn test_parse_words_and_numbers() {
        assert_eq!(Quality::parse_on("Good", RatingScale::FourPoint).unwrap(), Quality::Good);
        assert_eq!(Quality::parse_on(" e ", RatingScale::Sm2).unwrap(), Quality::Easy);
        assert_eq!(Quality::parse_on("2", RatingScale::FourPoint).unwrap(), Quality::Hard);
        assert_eq!(Quality::parse_on("2", RatingScale::Sm2).unwrap(), Quality::Again);
        assert!(Quality::parse_on("-1", RatingScale::FourPoint).is_err());
        assert!(Quality::parse_on("maybe", RatingScale::FourPoint).is_err());
        assert!(Quality::parse_on("", RatingScale::FourPoint).is_err());
    }

    #[test]
    fn test_card_json_shape() {
        let card = Card::new("q".to_string(), "a".to_string(), day(2026, 3, 1));
        let value = serde_json::to_value(&card).unwrap();
        assert_eq!(value["next_review"], "2026-03-01");
        assert_eq!(value["interval_days"], 1);
        assert_eq!(value["ease_factor"], 2.5);
        assert_eq!(value["review_count"], 0);
    }
}
