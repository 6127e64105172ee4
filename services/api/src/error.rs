//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and how each
//! failure is rendered as an HTTP response.

use crate::config::ConfigError;
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use flashdeck_core::ports::PortError;
use serde::Serialize;
use tracing::{debug, error, warn};
use utoipa::ToSchema;

/// Where review requests are sent when a topic has nothing to show.
pub const TOPICS_PATH: &str = "/topics";

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// One or more submitted form fields were rejected.
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Invalid username or password")]
    InvalidCredentials,

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// The JSON body of every error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

/// Sent with a redirect when a review request cannot show a card.
#[derive(Debug, Serialize, ToSchema)]
pub struct NoticeResponse {
    pub notice: String,
    pub redirect: String,
}

fn error_body(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
            details: Vec::new(),
        }),
    )
        .into_response()
}

fn redirect_to_topics(notice: &str) -> Response {
    (
        StatusCode::SEE_OTHER,
        [(header::LOCATION, TOPICS_PATH)],
        Json(NoticeResponse {
            notice: notice.to_string(),
            redirect: TOPICS_PATH.to_string(),
        }),
    )
        .into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        debug!(error = %self, "request rejected");
        match self {
            ApiError::Port(port) => match port {
                PortError::NotFound(message) => error_body(StatusCode::NOT_FOUND, message),
                PortError::NoCardsFound(topic) => {
                    warn!("No cards to show for topic '{}'", topic);
                    redirect_to_topics("No cards exists for this topic.")
                }
                PortError::NoHistory(topic) => {
                    warn!("No viewing history for topic '{}'", topic);
                    redirect_to_topics("No cards have been viewed yet in this topic.")
                }
                PortError::Conflict(message) => error_body(StatusCode::CONFLICT, message),
                PortError::InvalidInput(message) => error_body(StatusCode::BAD_REQUEST, message),
                PortError::Unauthorized => error_body(StatusCode::UNAUTHORIZED, "Please log in to access this page"),
                PortError::Forbidden => {
                    error_body(StatusCode::FORBIDDEN, "You do not have permission to access this page")
                }
                PortError::LastAdmin => error_body(StatusCode::FORBIDDEN, "Must have at least one admin"),
                PortError::StoreUnavailable(message) => {
                    error!("Store unavailable: {}", message);
                    error_body(StatusCode::SERVICE_UNAVAILABLE, "Storage is temporarily unavailable")
                }
                PortError::Unexpected(message) => {
                    error!("Unexpected port error: {}", message);
                    error_body(StatusCode::INTERNAL_SERVER_ERROR, "Error occurred while performing action")
                }
            },
            ApiError::Validation(details) => (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: "Invalid form submission".to_string(),
                    details,
                }),
            )
                .into_response(),
            ApiError::InvalidCredentials => error_body(StatusCode::UNAUTHORIZED, "Invalid username or password"),
            other => {
                error!("Request failed: {:?}", other);
                error_body(StatusCode::INTERNAL_SERVER_ERROR, "An unexpected internal error occurred")
            }
        }
    }
}
