//! services/api/src/web/protocol.rs
//!
//! Defines the JSON request and response bodies exchanged with clients.

use chrono::{DateTime, NaiveDate, Utc};
use flashdeck_core::domain::{CardDraft, DailyProgress, DraftMode, FlashCard, NavigationResult, Side};
use flashdeck_core::topics::TopicCards;
use flashdeck_core::{TopicAggregate, User};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

//=========================================================================================
// Requests
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    /// Keeps the cookie across browser restarts.
    #[serde(default)]
    pub remember_me: bool,
}

#[derive(Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    pub password: String,
    pub new_password: String,
    pub confirm_password: String,
}

/// Body for adding or editing a card.
#[derive(Deserialize, ToSchema)]
pub struct CardRequest {
    pub topic: String,
    pub question: String,
    pub answer: String,
}

//=========================================================================================
// Responses
//=========================================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role.to_string(),
        }
    }
}

/// The result of an admin action on an account.
#[derive(Debug, Serialize, ToSchema)]
pub struct AdminActionResponse {
    pub message: String,
    pub user: UserResponse,
    /// Set when the caller's own session was ended by the action.
    pub logged_out: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CardResponse {
    pub id: i64,
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

impl From<FlashCard> for CardResponse {
    fn from(card: FlashCard) -> Self {
        Self {
            id: card.id,
            topic: card.topic,
            question: card.question,
            answer: card.answer,
            seen: card.seen,
            last_seen: card.last_seen,
            times_seen: card.times_seen,
            times_correct: card.times_correct,
            times_wrong: card.times_wrong,
            ease: card.ease,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CardFaceResponse {
    pub id: i64,
    pub question: String,
    pub answer: String,
}

/// One entry of the topic list, keyed by the name used in review URLs.
#[derive(Debug, Serialize, ToSchema)]
pub struct TopicResponse {
    pub key: String,
    pub cards: Vec<CardFaceResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TopicListResponse {
    pub topics: Vec<TopicResponse>,
}

fn faces(cards: &TopicCards) -> Vec<CardFaceResponse> {
    cards
        .iter()
        .map(|(id, face)| CardFaceResponse {
            id: *id,
            question: face.question.clone(),
            answer: face.answer.clone(),
        })
        .collect()
}

impl From<TopicAggregate> for TopicListResponse {
    fn from(aggregate: TopicAggregate) -> Self {
        let topics = aggregate
            .keys()
            .into_iter()
            .filter_map(|key| {
                let cards = faces(aggregate.get(&key)?);
                Some(TopicResponse { key, cards })
            })
            .collect();
        Self { topics }
    }
}

/// The card on display during a review, with the side that is up.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReviewResponse {
    pub topic: String,
    /// Opaque card reference for the follow-up review URLs.
    pub token: String,
    pub side: String,
    /// The text of the side that is up.
    pub text: String,
    pub total: usize,
    pub complete: usize,
    pub ease: u8,
    pub times_seen: u32,
    pub times_correct: u32,
    pub times_wrong: u32,
}

impl From<NavigationResult> for ReviewResponse {
    fn from(result: NavigationResult) -> Self {
        let card = result.card;
        let text = match result.side {
            Side::Question => card.question,
            Side::Answer => card.answer,
        };
        Self {
            topic: result.topic,
            token: result.token,
            side: result.side.to_string(),
            text,
            total: result.total,
            complete: result.complete,
            ease: card.ease,
            times_seen: card.times_seen,
            times_correct: card.times_correct,
            times_wrong: card.times_wrong,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardResponse {
    pub today: NaiveDate,
    pub cards_total: usize,
    pub cards_today: usize,
    pub percent_complete: u8,
    /// Cards still below the mastery threshold.
    pub revision: Vec<CardResponse>,
}

impl From<DailyProgress> for DashboardResponse {
    fn from(progress: DailyProgress) -> Self {
        Self {
            today: progress.today,
            cards_total: progress.cards_total,
            cards_today: progress.cards_today,
            percent_complete: progress.percent_complete,
            revision: progress.revision.into_iter().map(CardResponse::from).collect(),
        }
    }
}

/// Pre-filled values for the add/edit card form.
#[derive(Debug, Serialize, ToSchema)]
pub struct DraftResponse {
    pub mode: String,
    pub card_id: Option<i64>,
    pub topic: String,
    pub question: Option<String>,
    pub answer: Option<String>,
}

impl From<CardDraft> for DraftResponse {
    fn from(draft: CardDraft) -> Self {
        Self {
            mode: match draft.mode {
                DraftMode::NewInTopic => "new",
                DraftMode::Edit => "edit",
            }
            .to_string(),
            card_id: draft.card_id,
            topic: draft.topic,
            question: draft.question,
            answer: draft.answer,
        }
    }
}
