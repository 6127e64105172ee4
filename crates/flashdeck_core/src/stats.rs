//! crates/flashdeck_core/src/stats.rs
//!
//! Daily completion counts for the dashboard.

use chrono::NaiveDate;

use crate::domain::{DailyProgress, FlashCard};
use crate::grading::percent;

pub fn daily_progress(cards: &[FlashCard], today: NaiveDate, revision_threshold: u8) -> DailyProgress {
    let cards_total = cards.len();
    let cards_today = cards
        .iter()
        .filter(|c| c.last_seen.map(|at| at.date_naive()) == Some(today))
        .count();
    let percent_complete = if cards_total == 0 {
        0
    } else {
        percent(cards_today as u64, cards_total as u64) as u8
    };
    let revision = cards
        .iter()
        .filter(|c| c.needs_revision(revision_threshold))
        .cloned()
        .collect();

    DailyProgress {
        today,
        cards_total,
        cards_today,
        percent_complete,
        revision,
    }
}
