//! crates/flashdeck_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, NaiveDate, Utc};
use std::fmt;
use std::str::FromStr;

use crate::ports::{PortError, PortResult};
use crate::topics::REVISION_TOPIC;

pub type UserId = i64;
pub type CardId = i64;

/// Cards at or below this ease are part of the "revision" pseudo-topics.
pub const DEFAULT_REVISION_THRESHOLD: u8 = 75;

/// Longest topic name, in characters, that the card store accepts.
pub const MAX_TOPIC_LEN: usize = 120;

//=========================================================================================
// Accounts
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Normal,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Normal => "Normal",
            Role::Admin => "Admin",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Role::Normal => Role::Admin,
            Role::Admin => Role::Normal,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Normal" => Ok(Role::Normal),
            "Admin" => Ok(Role::Admin),
            other => Err(PortError::Unexpected(format!("Unknown role '{}'", other))),
        }
    }
}

// Represents a user - used throughout app
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub role: Role,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

// Only used internally for login - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub hashed_password: String,
}

/// The fields needed to register a new account. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub hashed_password: String,
    pub role: Role,
}

//=========================================================================================
// Flash cards
//=========================================================================================

/// A single question/answer card owned by one user.
///
/// `seen` tracks the current pass through the card's topic, `last_seen` the first
/// exposure within that pass. The counters only ever grow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashCard {
    pub id: CardId,
    pub user_id: UserId,
    pub topic: String,
    pub question: String,
    pub answer: String,
    pub seen: bool,
    pub last_seen: Option<DateTime<Utc>>,
    pub times_seen: u32,
    pub times_correct: u32,
    pub times_wrong: u32,
    pub ease: u8,
}

impl FlashCard {
    /// A freshly created card: unseen, never graded.
    pub fn new(id: CardId, user_id: UserId, card: NewCard) -> Self {
        Self {
            id,
            user_id,
            topic: card.topic,
            question: card.question,
            answer: card.answer,
            seen: false,
            last_seen: None,
            times_seen: 0,
            times_correct: 0,
            times_wrong: 0,
            ease: 0,
        }
    }

    pub fn needs_revision(&self, threshold: u8) -> bool {
        self.ease <= threshold
    }
}

/// Validated, normalized content for creating or editing a card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCard {
    pub topic: String,
    pub question: String,
    pub answer: String,
}

impl NewCard {
    /// Normalizes the topic to lowercase-trimmed and trims the texts.
    /// Any field left empty after trimming is rejected, as are overlong topics
    /// and topics in the `revision` namespace.
    pub fn new(topic: &str, question: &str, answer: &str) -> PortResult<Self> {
        let topic = normalize_topic(topic);
        let question = question.trim().to_string();
        let answer = answer.trim().to_string();
        for (name, value) in [("topic", &topic), ("question", &question), ("answer", &answer)] {
            if value.is_empty() {
                return Err(PortError::InvalidInput(format!("The {} must not be empty", name)));
            }
        }
        if topic.chars().count() > MAX_TOPIC_LEN {
            return Err(PortError::InvalidInput(format!(
                "The topic must be at most {} characters",
                MAX_TOPIC_LEN
            )));
        }
        if is_reserved_topic(&topic) {
            return Err(PortError::InvalidInput(format!(
                "'{}' is reserved for revision topics",
                topic
            )));
        }
        Ok(Self { topic, question, answer })
    }
}

/// `revision` and `revision - <anything>` name the synthesized revision buckets.
fn is_reserved_topic(topic: &str) -> bool {
    match topic.strip_prefix(REVISION_TOPIC) {
        Some(rest) => rest.is_empty() || rest.trim_start().starts_with('-'),
        None => false,
    }
}

pub fn normalize_topic(raw: &str) -> String {
    raw.trim().to_lowercase()
}

//=========================================================================================
// Review navigation
//=========================================================================================

/// Which face of a card is being displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Question,
    Answer,
}

impl Side {
    pub fn flipped(self) -> Self {
        match self {
            Side::Question => Side::Answer,
            Side::Answer => Side::Question,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Question => "question",
            Side::Answer => "answer",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "question" => Ok(Side::Question),
            "answer" => Ok(Side::Answer),
            other => Err(PortError::InvalidInput(format!(
                "'{}' is not a card side, expected 'question' or 'answer'",
                other
            ))),
        }
    }
}

/// The card picked for display, with everything needed to render the review page.
#[derive(Debug, Clone)]
pub struct NavigationResult {
    pub topic: String,
    pub card: FlashCard,
    pub token: String,
    pub side: Side,
    pub total: usize,
    pub complete: usize,
}

//=========================================================================================
// Dashboard and card forms
//=========================================================================================

/// How many of a user's cards were first shown today.
#[derive(Debug, Clone)]
pub struct DailyProgress {
    pub today: NaiveDate,
    pub cards_total: usize,
    pub cards_today: usize,
    pub percent_complete: u8,
    pub revision: Vec<FlashCard>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftMode {
    /// Add another card to an existing card's topic.
    NewInTopic,
    Edit,
}

/// Pre-filled values for the add/edit card form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardDraft {
    pub mode: DraftMode,
    pub card_id: Option<CardId>,
    pub topic: String,
    pub question: Option<String>,
    pub answer: Option<String>,
}

/// The card-management intents a boundary can submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardCommand {
    Add {
        topic: String,
        question: String,
        answer: String,
    },
    Edit {
        card_id: CardId,
        topic: String,
        question: String,
        answer: String,
    },
    Delete {
        card_id: CardId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Saved(FlashCard),
    Deleted(CardId),
}
