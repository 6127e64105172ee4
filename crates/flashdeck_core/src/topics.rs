//! crates/flashdeck_core/src/topics.rs
//!
//! Groups a user's cards by topic and synthesizes the "revision" pseudo-topics
//! from the cards that have not yet been mastered.

use indexmap::IndexMap;

use crate::domain::{CardId, FlashCard};

pub const REVISION_TOPIC: &str = "revision";

/// The displayable content of a card inside a topic listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardFace {
    pub question: String,
    pub answer: String,
}

/// Cards keyed by id, in the order they were created.
pub type TopicCards = IndexMap<CardId, CardFace>;

/// Every topic key a user can open, with the cards behind it.
///
/// Real topics and the synthesized revision buckets are kept apart. `NewCard`
/// refuses topic names in the revision namespace, so display keys never collide.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicAggregate {
    pub topics: IndexMap<String, TopicCards>,
    pub revision: TopicCards,
    /// Low-mastery cards per real topic, keyed by the real topic name.
    pub revision_topics: IndexMap<String, TopicCards>,
}

impl TopicAggregate {
    /// Looks a bucket up by its display key (`math`, `revision`, `revision - math`).
    pub fn get(&self, key: &str) -> Option<&TopicCards> {
        if key == REVISION_TOPIC {
            return Some(&self.revision);
        }
        if let Some(topic) = key.strip_prefix(REVISION_PREFIX) {
            if let Some(cards) = self.revision_topics.get(topic) {
                return Some(cards);
            }
        }
        self.topics.get(key)
    }

    /// Display keys in listing order: real topics, `revision`, then the per-topic revision keys.
    pub fn keys(&self) -> Vec<String> {
        self.topics
            .keys()
            .cloned()
            .chain(std::iter::once(REVISION_TOPIC.to_string()))
            .chain(self.revision_topics.keys().map(|t| revision_key(t)))
            .collect()
    }
}

const REVISION_PREFIX: &str = "revision - ";

pub fn revision_key(topic: &str) -> String {
    format!("{}{}", REVISION_PREFIX, topic)
}

pub fn aggregate(cards: &[FlashCard], revision_threshold: u8) -> TopicAggregate {
    let mut result = TopicAggregate::default();

    for card in cards {
        let face = CardFace {
            question: card.question.clone(),
            answer: card.answer.clone(),
        };
        result
            .topics
            .entry(card.topic.clone())
            .or_default()
            .insert(card.id, face.clone());

        if card.needs_revision(revision_threshold) {
            result.revision.insert(card.id, face.clone());
            result
                .revision_topics
                .entry(card.topic.clone())
                .or_default()
                .insert(card.id, face);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NewCard;

    fn card(id: CardId, topic: &str, ease: u8) -> FlashCard {
        let mut card = FlashCard::new(
            id,
            1,
            NewCard::new(topic, &format!("q{}", id), &format!("a{}", id)).unwrap(),
        );
        card.ease = ease;
        card
    }

    #[test]
    fn only_unmastered_cards_are_up_for_revision() {
        let cards = vec![card(1, "math", 50), card(2, "math", 90), card(3, "math", 100)];
        let topics = aggregate(&cards, 75);

        assert_eq!(topics.topics["math"].len(), 3);
        assert_eq!(topics.revision.keys().copied().collect::<Vec<_>>(), vec![1]);
        let math_revision = topics.get("revision - math").unwrap();
        assert_eq!(math_revision.keys().copied().collect::<Vec<_>>(), vec![1]);
        assert_eq!(math_revision[&1].question, "q1");
    }

    #[test]
    fn every_card_lands_in_exactly_one_real_topic() {
        let cards = vec![
            card(1, "math", 0),
            card(2, "History", 80),
            card(3, "math", 75),
            card(4, " chemistry ", 76),
        ];
        let topics = aggregate(&cards, 75);

        for c in &cards {
            let homes = topics.topics.values().filter(|t| t.contains_key(&c.id)).count();
            assert_eq!(homes, 1);
            assert_eq!(topics.revision.contains_key(&c.id), c.ease <= 75);
        }
        assert_eq!(
            topics.keys(),
            vec!["math", "history", "chemistry", "revision", "revision - math"]
        );
    }

    #[test]
    fn insertion_order_is_kept_within_a_topic() {
        let cards = vec![card(9, "a", 0), card(3, "a", 0), card(5, "a", 0)];
        let topics = aggregate(&cards, 75);
        assert_eq!(topics.topics["a"].keys().copied().collect::<Vec<_>>(), vec![9, 3, 5]);
    }

    #[test]
    fn no_cards_gives_an_empty_revision_bucket() {
        let topics = aggregate(&[], 75);
        assert!(topics.topics.is_empty());
        assert_eq!(topics.get(REVISION_TOPIC), Some(&TopicCards::new()));
        assert_eq!(topics.keys(), vec![REVISION_TOPIC]);
    }
}
