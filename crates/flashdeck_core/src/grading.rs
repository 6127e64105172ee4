//! crates/flashdeck_core/src/grading.rs
//!
//! Updates a card's counters after the user marks an answer right or wrong.
//! Ease is the running accuracy as a percentage, never below 1 once graded.

use crate::domain::FlashCard;

pub fn grade(card: &mut FlashCard, correct: bool) {
    card.times_seen = card.times_seen.saturating_add(1);
    if correct {
        card.times_correct = card.times_correct.saturating_add(1);
    } else {
        card.times_wrong = card.times_wrong.saturating_add(1);
    }
    card.ease = ease_score(card.times_correct, card.times_seen);
}

pub fn ease_score(times_correct: u32, times_seen: u32) -> u8 {
    if times_seen == 0 {
        return 0;
    }
    percent(u64::from(times_correct), u64::from(times_seen)).clamp(1, 100) as u8
}

/// `part / whole * 100`, rounded half to even. `whole` must be non-zero.
pub(crate) fn percent(part: u64, whole: u64) -> u64 {
    let scaled = part * 100;
    let quotient = scaled / whole;
    let twice_remainder = 2 * (scaled % whole);
    if twice_remainder > whole || (twice_remainder == whole && quotient % 2 == 1) {
        quotient + 1
    } else {
        quotient
    }
}
