//! crates/flashdeck_core/src/memory.rs
//!
//! An in-process implementation of every port. Used by the test suites and by
//! the `memory://` store URL for local runs; nothing survives a restart.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{CardId, FlashCard, NewCard, NewUser, Role, User, UserCredentials, UserId};
use crate::ports::{
    AccountStore, AuthSessionStore, CardMutation, CardStore, PortError, PortResult,
};

#[derive(Default)]
struct MemoryState {
    cards: Vec<FlashCard>,
    next_card_id: CardId,
    users: Vec<UserCredentials>,
    next_user_id: UserId,
    sessions: HashMap<String, (UserId, DateTime<Utc>)>,
}

#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<MemoryState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> PortResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| PortError::StoreUnavailable("in-memory store lock poisoned".to_string()))
    }
}

fn card_not_found(card_id: CardId) -> PortError {
    PortError::NotFound(format!("Card {} not found", card_id))
}

fn user_not_found(user_id: UserId) -> PortError {
    PortError::NotFound(format!("User with ID: {} does not exist", user_id))
}

//=========================================================================================
// `CardStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl CardStore for InMemoryStore {
    async fn get_card(&self, card_id: CardId) -> PortResult<FlashCard> {
        let state = self.lock()?;
        state
            .cards
            .iter()
            .find(|c| c.id == card_id)
            .cloned()
            .ok_or_else(|| card_not_found(card_id))
    }

    async fn list_cards_by_user(&self, user_id: UserId) -> PortResult<Vec<FlashCard>> {
        let state = self.lock()?;
        Ok(state.cards.iter().filter(|c| c.user_id == user_id).cloned().collect())
    }

    async fn create_card(&self, user_id: UserId, card: NewCard) -> PortResult<FlashCard> {
        let mut state = self.lock()?;
        state.next_card_id += 1;
        let card = FlashCard::new(state.next_card_id, user_id, card);
        state.cards.push(card.clone());
        Ok(card)
    }

    async fn update_card(&self, card: &FlashCard) -> PortResult<()> {
        let mut state = self.lock()?;
        let stored = state
            .cards
            .iter_mut()
            .find(|c| c.id == card.id)
            .ok_or_else(|| card_not_found(card.id))?;
        let owner = stored.user_id;
        *stored = FlashCard { user_id: owner, ..card.clone() };
        Ok(())
    }

    async fn delete_card(&self, card_id: CardId) -> PortResult<()> {
        let mut state = self.lock()?;
        let before = state.cards.len();
        state.cards.retain(|c| c.id != card_id);
        if state.cards.len() == before {
            return Err(card_not_found(card_id));
        }
        Ok(())
    }

    async fn delete_cards_by_user(&self, user_id: UserId) -> PortResult<u64> {
        let mut state = self.lock()?;
        let before = state.cards.len();
        state.cards.retain(|c| c.user_id != user_id);
        Ok((before - state.cards.len()) as u64)
    }

    async fn modify_user_cards(&self, user_id: UserId, op: &mut CardMutation<'_>) -> PortResult<()> {
        let mut state = self.lock()?;
        // Work on copies so a failed mutation leaves the store untouched.
        let mut working: Vec<FlashCard> =
            state.cards.iter().filter(|c| c.user_id == user_id).cloned().collect();
        op(working.as_mut_slice())?;

        let mut updated = working.into_iter();
        for stored in state.cards.iter_mut().filter(|c| c.user_id == user_id) {
            if let Some(card) = updated.next() {
                *stored = FlashCard {
                    id: stored.id,
                    user_id,
                    ..card
                };
            }
        }
        Ok(())
    }
}

//=========================================================================================
// `AccountStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl AccountStore for InMemoryStore {
    async fn create_user(&self, user: NewUser) -> PortResult<User> {
        let mut state = self.lock()?;
        if state.users.iter().any(|u| u.user.username == user.username) {
            return Err(PortError::Conflict("Username not available".to_string()));
        }
        if state.users.iter().any(|u| u.user.email == user.email) {
            return Err(PortError::Conflict("Email already used".to_string()));
        }
        state.next_user_id += 1;
        let created = User {
            id: state.next_user_id,
            username: user.username,
            email: user.email,
            role: user.role,
        };
        state.users.push(UserCredentials {
            user: created.clone(),
            hashed_password: user.hashed_password,
        });
        Ok(created)
    }

    async fn get_user(&self, user_id: UserId) -> PortResult<User> {
        let state = self.lock()?;
        state
            .users
            .iter()
            .find(|u| u.user.id == user_id)
            .map(|u| u.user.clone())
            .ok_or_else(|| user_not_found(user_id))
    }

    async fn get_credentials_by_username(&self, username: &str) -> PortResult<UserCredentials> {
        let state = self.lock()?;
        state
            .users
            .iter()
            .find(|u| u.user.username == username)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", username)))
    }

    async fn list_users(&self) -> PortResult<Vec<User>> {
        let state = self.lock()?;
        Ok(state.users.iter().map(|u| u.user.clone()).collect())
    }

    async fn set_role(&self, user_id: UserId, role: Role) -> PortResult<()> {
        let mut state = self.lock()?;
        let entry = state
            .users
            .iter_mut()
            .find(|u| u.user.id == user_id)
            .ok_or_else(|| user_not_found(user_id))?;
        entry.user.role = role;
        Ok(())
    }

    async fn set_password_hash(&self, user_id: UserId, hashed_password: &str) -> PortResult<()> {
        let mut state = self.lock()?;
        let entry = state
            .users
            .iter_mut()
            .find(|u| u.user.id == user_id)
            .ok_or_else(|| user_not_found(user_id))?;
        entry.hashed_password = hashed_password.to_string();
        Ok(())
    }

    async fn delete_user(&self, user_id: UserId) -> PortResult<()> {
        let mut state = self.lock()?;
        let before = state.users.len();
        state.users.retain(|u| u.user.id != user_id);
        if state.users.len() == before {
            return Err(user_not_found(user_id));
        }
        state.sessions.retain(|_, (owner, _)| *owner != user_id);
        Ok(())
    }

    async fn count_admins(&self) -> PortResult<u64> {
        let state = self.lock()?;
        Ok(state.users.iter().filter(|u| u.user.is_admin()).count() as u64)
    }
}

//=========================================================================================
// `AuthSessionStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl AuthSessionStore for InMemoryStore {
    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: UserId,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        let mut state = self.lock()?;
        state.sessions.insert(session_id.to_string(), (user_id, expires_at));
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<UserId> {
        let state = self.lock()?;
        match state.sessions.get(session_id) {
            Some((user_id, expires_at)) if *expires_at > Utc::now() => Ok(*user_id),
            _ => Err(PortError::Unauthorized),
        }
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        let mut state = self.lock()?;
        state.sessions.remove(session_id);
        Ok(())
    }
}
