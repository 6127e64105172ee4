//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the dashboard, topic list and card management
//! endpoints, and the master definition for the OpenAPI specification.

use crate::error::{ApiError, ErrorResponse, NoticeResponse};
use crate::web::middleware::CurrentUser;
use crate::web::protocol::{
    AdminActionResponse, CardFaceResponse, CardRequest, CardResponse, ChangePasswordRequest,
    DashboardResponse, DraftResponse, LoginRequest, MessageResponse, RegisterRequest,
    ReviewResponse, TopicListResponse, TopicResponse, UserResponse,
};
use crate::web::state::AppState;
use crate::web::{admin, auth, review};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::Utc;
use flashdeck_core::{CardCommand, CommandOutcome, DraftMode};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::{IntoParams, OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::register_handler,
        auth::login_handler,
        auth::logout_handler,
        auth::change_password_handler,
        dashboard_handler,
        list_topics_handler,
        create_card_handler,
        update_card_handler,
        delete_card_handler,
        card_draft_handler,
        review::view_card_handler,
        review::review_action_handler,
        admin::list_users_handler,
        admin::delete_user_handler,
        admin::toggle_role_handler,
    ),
    components(
        schemas(
            RegisterRequest, LoginRequest, ChangePasswordRequest, CardRequest,
            UserResponse, MessageResponse, AdminActionResponse, CardResponse,
            CardFaceResponse, TopicResponse, TopicListResponse, ReviewResponse,
            DashboardResponse, DraftResponse, ErrorResponse, NoticeResponse,
            DraftModeParam, review::ReviewAction,
        )
    ),
    tags(
        (name = "Flashcard Study API", description = "Endpoints for managing and reviewing flash cards.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Query Parameters
//=========================================================================================

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DraftModeParam {
    New,
    Edit,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DraftQuery {
    /// `new` pre-fills the topic only; `edit` pre-fills the whole card.
    pub mode: DraftModeParam,
}

//=========================================================================================
// Dashboard and Topics
//=========================================================================================

/// Today's progress and the cards that still need revision.
#[utoipa::path(
    get,
    path = "/dashboard",
    responses(
        (status = 200, description = "Daily progress", body = DashboardResponse),
        (status = 401, description = "Not logged in", body = ErrorResponse)
    )
)]
pub async fn dashboard_handler(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<DashboardResponse>, ApiError> {
    let today = Utc::now().date_naive();
    let progress = state.study.dashboard(current.user.id, today).await?;
    Ok(Json(progress.into()))
}

/// Lists every topic, including the revision pseudo-topics.
///
/// Opening the list starts a fresh pass, so every card is marked unseen.
#[utoipa::path(
    get,
    path = "/topics",
    responses(
        (status = 200, description = "Topics with their cards", body = TopicListResponse),
        (status = 401, description = "Not logged in", body = ErrorResponse)
    )
)]
pub async fn list_topics_handler(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<TopicListResponse>, ApiError> {
    let topics = state.study.list_topics(current.user.id).await?;
    Ok(Json(topics.into()))
}

//=========================================================================================
// Card Management
//=========================================================================================

#[utoipa::path(
    post,
    path = "/cards",
    request_body = CardRequest,
    responses(
        (status = 201, description = "Card created", body = CardResponse),
        (status = 400, description = "A field was empty", body = ErrorResponse)
    )
)]
pub async fn create_card_handler(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<CardRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let command = CardCommand::Add {
        topic: req.topic,
        question: req.question,
        answer: req.answer,
    };
    let card = saved_card(state.study.execute(current.user.id, command).await?)?;
    Ok((StatusCode::CREATED, Json(CardResponse::from(card))))
}

#[utoipa::path(
    put,
    path = "/cards/{id}",
    params(("id" = i64, Path, description = "The card to edit")),
    request_body = CardRequest,
    responses(
        (status = 200, description = "Card updated", body = CardResponse),
        (status = 400, description = "A field was empty", body = ErrorResponse),
        (status = 404, description = "No such card", body = ErrorResponse)
    )
)]
pub async fn update_card_handler(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(card_id): Path<i64>,
    Json(req): Json<CardRequest>,
) -> Result<Json<CardResponse>, ApiError> {
    let command = CardCommand::Edit {
        card_id,
        topic: req.topic,
        question: req.question,
        answer: req.answer,
    };
    let card = saved_card(state.study.execute(current.user.id, command).await?)?;
    Ok(Json(card.into()))
}

#[utoipa::path(
    delete,
    path = "/cards/{id}",
    params(("id" = i64, Path, description = "The card to delete")),
    responses(
        (status = 200, description = "Card deleted", body = MessageResponse),
        (status = 404, description = "No such card", body = ErrorResponse)
    )
)]
pub async fn delete_card_handler(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(card_id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .study
        .execute(current.user.id, CardCommand::Delete { card_id })
        .await?;
    Ok(Json(MessageResponse::new(format!("Card {} deleted", card_id))))
}

/// Form values for adding a card to the same topic, or editing this card.
#[utoipa::path(
    get,
    path = "/cards/{id}/draft",
    params(("id" = i64, Path, description = "The card the form starts from"), DraftQuery),
    responses(
        (status = 200, description = "Pre-filled form values", body = DraftResponse),
        (status = 404, description = "No such card", body = ErrorResponse)
    )
)]
pub async fn card_draft_handler(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(card_id): Path<i64>,
    Query(query): Query<DraftQuery>,
) -> Result<Json<DraftResponse>, ApiError> {
    let mode = match query.mode {
        DraftModeParam::New => DraftMode::NewInTopic,
        DraftModeParam::Edit => DraftMode::Edit,
    };
    let draft = state.study.card_draft(current.user.id, card_id, mode).await?;
    Ok(Json(draft.into()))
}

fn saved_card(outcome: CommandOutcome) -> Result<flashdeck_core::FlashCard, ApiError> {
    match outcome {
        CommandOutcome::Saved(card) => Ok(card),
        CommandOutcome::Deleted(id) => Err(ApiError::Internal(format!(
            "card {} was deleted by a save command",
            id
        ))),
    }
}
