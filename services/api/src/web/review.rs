//! services/api/src/web/review.rs
//!
//! Handlers for stepping through a topic's cards. Every response names the card
//! on display by an opaque token, never by its database id.

use crate::error::{ApiError, ErrorResponse, NoticeResponse};
use crate::web::middleware::CurrentUser;
use crate::web::protocol::ReviewResponse;
use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    response::Json,
    Extension,
};
use chrono::Utc;
use flashdeck_core::Side;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;
use utoipa::ToSchema;

/// What to do with the card currently on display.
#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReviewAction {
    Flip,
    Next,
    Previous,
    Correct,
    Wrong,
}

/// Shows a card. The token `next` draws an unseen card from the topic.
#[utoipa::path(
    get,
    path = "/topics/{topic}/{token}/{side}",
    params(
        ("topic" = String, Path, description = "A topic, `revision`, or `revision - <topic>`"),
        ("token" = String, Path, description = "A card token, or `next`"),
        ("side" = String, Path, description = "`question` or `answer`")
    ),
    responses(
        (status = 200, description = "The card on display", body = ReviewResponse),
        (status = 303, description = "The topic has no cards", body = NoticeResponse),
        (status = 400, description = "Unknown side", body = ErrorResponse)
    )
)]
pub async fn view_card_handler(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path((topic, token, side)): Path<(String, String, String)>,
) -> Result<Json<ReviewResponse>, ApiError> {
    let side = side.parse::<Side>()?;
    let result = state
        .study
        .view_card(current.user.id, &topic, &token, side, Utc::now())
        .await?;
    Ok(Json(result.into()))
}

/// Flips, steps, or grades the card on display.
#[utoipa::path(
    post,
    path = "/topics/{topic}/{token}/{side}/{action}",
    params(
        ("topic" = String, Path, description = "A topic, `revision`, or `revision - <topic>`"),
        ("token" = String, Path, description = "The token of the card on display"),
        ("side" = String, Path, description = "The side currently up"),
        ("action" = ReviewAction, Path, description = "flip, next, previous, correct or wrong")
    ),
    responses(
        (status = 200, description = "The card now on display", body = ReviewResponse),
        (status = 303, description = "Nothing to show for this topic", body = NoticeResponse),
        (status = 404, description = "Graded token does not name a card", body = ErrorResponse)
    )
)]
pub async fn review_action_handler(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path((topic, token, side, action)): Path<(String, String, String, ReviewAction)>,
) -> Result<Json<ReviewResponse>, ApiError> {
    let side = side.parse::<Side>()?;
    let user_id = current.user.id;
    let now = Utc::now();
    debug!(user_id, ?action, topic = %topic, "review action");

    let study = &state.study;
    let result = match action {
        ReviewAction::Flip => study.flip_card(user_id, &topic, &token, side, now).await?,
        ReviewAction::Next => study.next_card(user_id, &topic, now).await?,
        ReviewAction::Previous => study.previous_card(user_id, &topic, &token, now).await?,
        ReviewAction::Correct => study.grade_card(user_id, &topic, &token, true, now).await?,
        ReviewAction::Wrong => study.grade_card(user_id, &topic, &token, false, now).await?,
    };
    Ok(Json(result.into()))
}
