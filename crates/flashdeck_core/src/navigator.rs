//! crates/flashdeck_core/src/navigator.rs
//!
//! The review state machine. All state lives on the cards themselves: `seen`
//! marks a card as shown in the current pass, `last_seen` records its first
//! exposure in that pass and doubles as the viewing history.

use chrono::{DateTime, Utc};
use rand::seq::IndexedRandom;
use rand::Rng;
use tracing::debug;

use crate::domain::{CardId, FlashCard};
use crate::topics::REVISION_TOPIC;

/// Which cards a topic key in a review URL refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicSelector {
    /// Every unmastered card across all topics.
    Revision,
    /// The unmastered cards of one real topic.
    RevisionOf(String),
    Topic(String),
}

impl TopicSelector {
    /// Resolves a raw topic key against the user's cards.
    ///
    /// An exact real topic wins over the `<anything> - <topic>` revision form, so
    /// hyphenated topic names stay reachable.
    pub fn resolve(raw: &str, cards: &[FlashCard]) -> Self {
        if raw == REVISION_TOPIC {
            return TopicSelector::Revision;
        }
        let is_topic = |name: &str| cards.iter().any(|c| c.topic == name);
        if is_topic(raw) {
            return TopicSelector::Topic(raw.to_string());
        }
        if let Some((_, after)) = raw.split_once('-') {
            let after = after.trim();
            if is_topic(after) {
                return TopicSelector::RevisionOf(after.to_string());
            }
        }
        TopicSelector::Topic(raw.to_string())
    }

    pub fn matches(&self, card: &FlashCard, revision_threshold: u8) -> bool {
        match self {
            TopicSelector::Revision => card.needs_revision(revision_threshold),
            TopicSelector::RevisionOf(topic) => {
                card.topic == *topic && card.needs_revision(revision_threshold)
            }
            TopicSelector::Topic(topic) => card.topic == *topic,
        }
    }
}

/// The outcome of one `view` over a candidate set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub card_id: CardId,
    pub total: usize,
    pub complete: usize,
    /// True when every candidate had been seen and a new pass was started.
    pub pass_reset: bool,
}

/// Picks the card to show and records the exposure on it.
///
/// A `requested` id that is among the candidates is shown as-is. Otherwise a
/// card is drawn uniformly from the unseen ones, starting a fresh pass first if
/// none are left, and never the most recently seen card when there is a choice.
/// Returns `None` only for an empty candidate set.
pub fn select_card<R: Rng + ?Sized>(
    candidates: &mut [&mut FlashCard],
    requested: Option<CardId>,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Option<Selection> {
    if candidates.is_empty() {
        return None;
    }

    let mut pass_reset = false;
    let explicit = requested.and_then(|id| candidates.iter().position(|c| c.id == id));
    let index = match explicit {
        Some(index) => index,
        None => {
            let mut unseen: Vec<usize> = (0..candidates.len())
                .filter(|&i| !candidates[i].seen)
                .collect();
            if unseen.is_empty() {
                debug!(cards = candidates.len(), "pass complete, starting a new one");
                reset_pass(candidates.iter_mut().map(|c| &mut **c));
                unseen = (0..candidates.len()).collect();
                pass_reset = true;
            }

            let just_seen = if candidates.len() > 1 {
                most_recently_seen(candidates.iter().map(|c| &**c))
            } else {
                None
            };
            let fresh: Vec<usize> = unseen
                .iter()
                .copied()
                .filter(|&i| Some(candidates[i].id) != just_seen)
                .collect();
            let pool = if fresh.is_empty() { unseen } else { fresh };
            *pool.choose(rng)?
        }
    };

    let card = &mut candidates[index];
    if !card.seen {
        card.last_seen = Some(now);
    }
    card.seen = true;
    let card_id = card.id;

    Some(Selection {
        card_id,
        total: candidates.len(),
        complete: candidates.iter().filter(|c| c.seen).count(),
        pass_reset,
    })
}

/// Marks every card unseen, starting a new pass.
pub fn reset_pass<'a>(cards: impl IntoIterator<Item = &'a mut FlashCard>) {
    for card in cards {
        card.seen = false;
    }
}

/// The card shown before `current` in viewing history, wrapping to the newest.
///
/// History is every candidate that has a `last_seen`, oldest first. When
/// `current` is absent or not in the history the rewind starts from the newest
/// entry. Returns `None` when nothing has been viewed yet.
pub fn previous_card_id<'a>(
    candidates: impl IntoIterator<Item = &'a FlashCard>,
    current: Option<CardId>,
) -> Option<CardId> {
    let mut history: Vec<&FlashCard> = candidates
        .into_iter()
        .filter(|c| c.last_seen.is_some())
        .collect();
    if history.is_empty() {
        return None;
    }
    history.sort_by_key(|c| c.last_seen);

    let len = history.len();
    let position = current
        .and_then(|id| history.iter().position(|c| c.id == id))
        .unwrap_or(len - 1);
    Some(history[(position + len - 1) % len].id)
}

fn most_recently_seen<'a>(cards: impl Iterator<Item = &'a FlashCard>) -> Option<CardId> {
    cards
        .filter_map(|c| c.last_seen.map(|at| (at, c.id)))
        .max_by_key(|(at, _)| *at)
        .map(|(_, id)| id)
}
