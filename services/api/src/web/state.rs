//! services/api/src/web/state.rs
//!
//! Defines the application state shared by every request handler.

use crate::config::Config;
use crate::error::ApiError;
use crate::web::validation::FormValidator;
use flashdeck_core::ports::{AccountStore, AuthSessionStore, CardStore};
use flashdeck_core::{AccountService, StudyService, TokenCodec};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub study: Arc<StudyService>,
    pub accounts: AccountService,
    pub account_store: Arc<dyn AccountStore>,
    pub sessions: Arc<dyn AuthSessionStore>,
    pub validator: Arc<FormValidator>,
}

impl AppState {
    /// Wires the services over a single backing store.
    pub fn new<S>(config: Arc<Config>, store: Arc<S>) -> Result<Self, ApiError>
    where
        S: CardStore + AccountStore + AuthSessionStore + 'static,
    {
        let codec = TokenCodec::new(config.secret_key.as_bytes())?;
        let validator = FormValidator::new().map_err(|e| ApiError::Internal(e.to_string()))?;
        let cards: Arc<dyn CardStore> = store.clone();
        let study = StudyService::new(cards.clone(), codec)
            .with_revision_threshold(config.revision_threshold);

        Ok(Self {
            study: Arc::new(study),
            accounts: AccountService::new(store.clone(), cards),
            account_store: store.clone(),
            sessions: store,
            validator: Arc::new(validator),
            config,
        })
    }
}
