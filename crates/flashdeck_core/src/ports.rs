//! crates/flashdeck_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{CardId, FlashCard, NewCard, NewUser, Role, User, UserCredentials, UserId};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// The error type for all core and port operations.
/// This abstracts away the specific errors from external services (e.g., database).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("No cards exists for this topic: {0}")]
    NoCardsFound(String),
    #[error("No cards have been viewed yet in topic: {0}")]
    NoHistory(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden")]
    Forbidden,
    #[error("Must have at least one admin")]
    LastAdmin,
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// A synchronous mutation run inside a store transaction.
///
/// Returning an error rolls the transaction back.
pub type CardMutation<'a> = dyn FnMut(&mut [FlashCard]) -> PortResult<()> + Send + 'a;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait CardStore: Send + Sync {
    async fn get_card(&self, card_id: CardId) -> PortResult<FlashCard>;

    /// All of a user's cards, in insertion order.
    async fn list_cards_by_user(&self, user_id: UserId) -> PortResult<Vec<FlashCard>>;

    async fn create_card(&self, user_id: UserId, card: NewCard) -> PortResult<FlashCard>;

    /// Persists every field except `id` and `user_id`.
    async fn update_card(&self, card: &FlashCard) -> PortResult<()>;

    async fn delete_card(&self, card_id: CardId) -> PortResult<()>;

    /// Removes every card owned by `user_id`, returning how many were deleted.
    async fn delete_cards_by_user(&self, user_id: UserId) -> PortResult<u64>;

    /// Loads all of the user's cards under a write lock, applies `op`, and
    /// persists the cards it changed in one atomic commit.
    async fn modify_user_cards(&self, user_id: UserId, op: &mut CardMutation<'_>) -> PortResult<()>;
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Fails with `Conflict` when the username or email is already registered.
    async fn create_user(&self, user: NewUser) -> PortResult<User>;

    async fn get_user(&self, user_id: UserId) -> PortResult<User>;

    async fn get_credentials_by_username(&self, username: &str) -> PortResult<UserCredentials>;

    async fn list_users(&self) -> PortResult<Vec<User>>;

    async fn set_role(&self, user_id: UserId, role: Role) -> PortResult<()>;

    async fn set_password_hash(&self, user_id: UserId, hashed_password: &str) -> PortResult<()>;

    async fn delete_user(&self, user_id: UserId) -> PortResult<()>;

    async fn count_admins(&self) -> PortResult<u64>;
}

#[async_trait]
pub trait AuthSessionStore: Send + Sync {
    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: UserId,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Resolves a live session to its user; unknown or expired ids are `Unauthorized`.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<UserId>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;
}
