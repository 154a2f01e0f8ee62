//! Review scheduling, adapted from SM-2.
//!
//! Each rating moves the ease factor by a fixed step:
//! - Again: -0.20, and the interval starts over at one day
//! - Hard:  -0.15
//! - Good:   0.00
//! - Easy:  +0.15
//!
//! Every rating except Again multiplies the interval by the new ease factor.
//! Hard therefore still grows the interval, just more slowly. Intervals stop
//! growing at `MAX_INTERVAL_DAYS`.

use chrono::{Days, NaiveDate};

use super::models::{
    Card, Quality, DEFAULT_EASE_FACTOR, DEFAULT_INTERVAL_DAYS, MAX_EASE_FACTOR, MAX_INTERVAL_DAYS,
    MIN_EASE_FACTOR,
};

/// Ease factor change for a rating
pub fn ease_delta(quality: Quality) -> f64 {
    match quality {
        Quality::Again => -0.20,
        Quality::Hard => -0.15,
        Quality::Good => 0.0,
        Quality::Easy => 0.15,
    }
}

/// Grade a card reviewed on `today` and return its next state.
///
/// Never fails: same-day re-reviews are accepted, and a card that has never
/// been graded starts from the default ease and interval.
pub fn schedule(card: &Card, quality: Quality, today: NaiveDate) -> Card {
    let (old_ease, old_interval) = if card.is_new() {
        (DEFAULT_EASE_FACTOR, DEFAULT_INTERVAL_DAYS)
    } else {
        (card.ease_factor, card.interval_days)
    };

    let ease_factor = clamp_ease(old_ease + ease_delta(quality));

    let interval_days = match quality {
        Quality::Again => 1,
        _ => {
            let grown = (f64::from(old_interval.max(1)) * ease_factor).round();
            grown.clamp(1.0, f64::from(MAX_INTERVAL_DAYS)) as u32
        }
    };

    Card {
        interval_days,
        ease_factor,
        next_review: add_days(today, interval_days),
        review_count: card.review_count.saturating_add(1),
        ..card.clone()
    }
}

/// Clamp to the allowed range, stored at two decimals
fn clamp_ease(ease: f64) -> f64 {
    let rounded = (ease * 100.0).round() / 100.0;
    rounded.clamp(MIN_EASE_FACTOR, MAX_EASE_FACTOR)
}

fn add_days(today: NaiveDate, days: u32) -> NaiveDate {
    today
        .checked_add_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MAX)
}

/// Intervals each rating would give, in the order Again, Hard, Good, Easy.
/// Used to show the reviewer what each answer means.
pub fn preview_intervals(card: &Card, today: NaiveDate) -> [u32; 4] {
    Quality::ALL.map(|quality| schedule(card, quality, today).interval_days)
}

/// Format an interval in days to a human-readable string
pub fn format_interval(days: u32) -> String {
    if days == 0 {
        "now".to_string()
    } else if days < 7 {
        format!("{}d", days)
    } else if days < 30 {
        format!("{}w", days / 7)
    } else if days < 365 {
        format!("{}mo", days / 30)
    } else {
        format!("{}y", days / 365)
    }
}
