//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use flashdeck_core::ports::PortError;
use flashdeck_core::User;
use std::sync::Arc;
use tracing::warn;

use crate::error::ApiError;
use crate::web::state::AppState;

pub const SESSION_COOKIE: &str = "session";

/// The logged-in user, inserted into request extensions by `require_auth`.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub session_id: String,
}

/// Reads the auth session id out of the `Cookie` header.
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())?
        .split(';')
        .find_map(|c| c.trim().strip_prefix(SESSION_COOKIE)?.strip_prefix('='))
        .filter(|id| !id.is_empty())
}

/// Middleware that validates the auth session cookie and loads the user.
///
/// If valid, inserts a `CurrentUser` into request extensions for handlers to use.
/// If invalid, expired or missing, returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let session_id = session_id_from_headers(req.headers())
        .ok_or(PortError::Unauthorized)?
        .to_string();

    let user_id = state
        .sessions
        .validate_auth_session(&session_id)
        .await
        .map_err(|e| {
            warn!("Rejected auth session: {}", e);
            e
        })?;

    // A session can outlive its user if the account was deleted elsewhere.
    let user = state.account_store.get_user(user_id).await.map_err(|e| match e {
        PortError::NotFound(_) => PortError::Unauthorized,
        other => other,
    })?;

    req.extensions_mut().insert(CurrentUser { user, session_id });
    Ok(next.run(req).await)
}
