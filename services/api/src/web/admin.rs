//! services/api/src/web/admin.rs
//!
//! User-management endpoints. The core refuses non-admin callers and will not
//! remove the last admin.

use crate::error::{ApiError, ErrorResponse};
use crate::web::auth::cleared_session_cookie;
use crate::web::middleware::CurrentUser;
use crate::web::protocol::{AdminActionResponse, UserResponse};
use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Json, Response},
    Extension,
};
use flashdeck_core::AdminOutcome;
use std::sync::Arc;
use tracing::info;

#[utoipa::path(
    get,
    path = "/admin/users",
    responses(
        (status = 200, description = "Every account", body = [UserResponse]),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse)
    )
)]
pub async fn list_users_handler(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = state.accounts.list_users(&current.user).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// Deletes an account and every card it owns.
#[utoipa::path(
    delete,
    path = "/admin/users/{id}",
    params(("id" = i64, Path, description = "The account to delete")),
    responses(
        (status = 200, description = "Account deleted", body = AdminActionResponse),
        (status = 403, description = "Not an admin, or the last admin", body = ErrorResponse),
        (status = 404, description = "No such user", body = ErrorResponse)
    )
)]
pub async fn delete_user_handler(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(user_id): Path<i64>,
) -> Result<Response, ApiError> {
    let outcome = state.accounts.delete_user(&current.user, user_id).await?;
    let message = format!("{} has been deleted successfully", outcome.user.username);
    respond(&state, &current, outcome, message).await
}

/// Swaps an account between the Normal and Admin roles.
#[utoipa::path(
    post,
    path = "/admin/users/{id}/role",
    params(("id" = i64, Path, description = "The account to change")),
    responses(
        (status = 200, description = "Role changed", body = AdminActionResponse),
        (status = 403, description = "Not an admin, or the last admin", body = ErrorResponse),
        (status = 404, description = "No such user", body = ErrorResponse)
    )
)]
pub async fn toggle_role_handler(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(user_id): Path<i64>,
) -> Result<Response, ApiError> {
    let outcome = state.accounts.toggle_role(&current.user, user_id).await?;
    let message = format!("{}'s role has been changed successfully", outcome.user.username);
    respond(&state, &current, outcome, message).await
}

/// Ends the caller's session when they acted on their own account.
async fn respond(
    state: &AppState,
    current: &CurrentUser,
    outcome: AdminOutcome,
    message: String,
) -> Result<Response, ApiError> {
    let body = AdminActionResponse {
        message,
        logged_out: outcome.end_caller_session,
        user: outcome.user.into(),
    };
    if !outcome.end_caller_session {
        return Ok(Json(body).into_response());
    }

    state.sessions.delete_auth_session(&current.session_id).await?;
    info!("Ended session of {} after changing their own account", current.user.username);
    Ok(([(header::SET_COOKIE, cleared_session_cookie())], Json(body)).into_response())
}
