//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for registration, login, logout and password changes.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use flashdeck_core::ports::PortError;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::{ApiError, ErrorResponse};
use crate::web::middleware::{session_id_from_headers, CurrentUser, SESSION_COOKIE};
use crate::web::protocol::{
    ChangePasswordRequest, LoginRequest, MessageResponse, RegisterRequest, UserResponse,
};
use crate::web::state::AppState;

//=========================================================================================
// Password and cookie helpers
//=========================================================================================

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            ApiError::Internal("Failed to hash password".to_string())
        })
}

fn password_matches(password: &str, hashed_password: &str) -> Result<bool, ApiError> {
    let parsed_hash = PasswordHash::new(hashed_password).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        ApiError::Internal("Authentication error".to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// A persistent cookie lives as long as the server-side session.
fn session_cookie(session_id: &str, max_age_days: Option<i64>) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; Secure; SameSite=Lax; Path=/",
        SESSION_COOKIE, session_id
    );
    if let Some(days) = max_age_days {
        cookie.push_str(&format!("; Max-Age={}", Duration::days(days).num_seconds()));
    }
    cookie
}

pub fn cleared_session_cookie() -> String {
    format!("{}=; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=0", SESSION_COOKIE)
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/register - Create a new account
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created, login to proceed", body = UserResponse),
        (status = 400, description = "Invalid form", body = ErrorResponse),
        (status = 409, description = "Username or email already taken", body = ErrorResponse)
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .validator
        .check_registration(&req.username, &req.email, &req.password, &req.confirm_password)?;

    let password_hash = hash_password(&req.password)?;
    let user = state
        .accounts
        .register(&req.username, &req.email, password_hash)
        .await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// POST /auth/login - Login with an existing account
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = UserResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse)
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.validator.check_login(&req.username, &req.password)?;

    // 1. Look up the account; an unknown name looks the same as a bad password.
    let creds = match state.account_store.get_credentials_by_username(req.username.trim()).await {
        Ok(creds) => creds,
        Err(PortError::NotFound(_)) => return Err(ApiError::InvalidCredentials),
        Err(e) => return Err(e.into()),
    };

    // 2. Verify password
    if !password_matches(&req.password, &creds.hashed_password)? {
        warn!("Failed login for {}", creds.user.username);
        return Err(ApiError::InvalidCredentials);
    }

    // 3. Create the auth session
    let ttl_days = state.config.session_ttl_days;
    let auth_session_id = Uuid::new_v4().to_string();
    let expires_at = Utc::now() + Duration::days(ttl_days);
    state
        .sessions
        .create_auth_session(&auth_session_id, creds.user.id, expires_at)
        .await?;
    info!("User {} logged in", creds.user.username);

    // 4. Return response with cookie
    let cookie = session_cookie(&auth_session_id, req.remember_me.then_some(ttl_days));
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(UserResponse::from(creds.user)),
    ))
}

/// POST /auth/logout - Logout and invalidate session
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful", body = MessageResponse),
        (status = 401, description = "No active session", body = ErrorResponse)
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let auth_session_id = session_id_from_headers(&headers).ok_or(PortError::Unauthorized)?;
    state.sessions.delete_auth_session(auth_session_id).await?;

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cleared_session_cookie())],
        Json(MessageResponse::new("Logged out")),
    ))
}

/// POST /auth/password - Change the caller's password
#[utoipa::path(
    post,
    path = "/auth/password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Invalid form or wrong current password", body = ErrorResponse),
        (status = 401, description = "Not logged in", body = ErrorResponse)
    )
)]
pub async fn change_password_handler(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .validator
        .check_password_change(&req.password, &req.new_password, &req.confirm_password)?;

    let creds = state
        .account_store
        .get_credentials_by_username(&current.user.username)
        .await?;
    if !password_matches(&req.password, &creds.hashed_password)? {
        return Err(ApiError::Validation(vec!["Invalid password".to_string()]));
    }

    let new_hash = hash_password(&req.new_password)?;
    state
        .account_store
        .set_password_hash(current.user.id, &new_hash)
        .await?;
    info!("User {} changed their password", current.user.username);

    Ok(Json(MessageResponse::new("Password has been changed successfully")))
}
