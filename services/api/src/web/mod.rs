pub mod admin;
pub mod auth;
pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod review;
pub mod state;
pub mod validation;

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;

pub use middleware::require_auth;
pub use state::AppState;

/// Builds the API router. CORS and the Swagger UI are layered on by the binary.
pub fn router(state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/auth/password", post(auth::change_password_handler))
        .route("/dashboard", get(rest::dashboard_handler))
        .route("/topics", get(rest::list_topics_handler))
        .route("/topics/{topic}/{token}/{side}", get(review::view_card_handler))
        .route(
            "/topics/{topic}/{token}/{side}/{action}",
            post(review::review_action_handler),
        )
        .route("/cards", post(rest::create_card_handler))
        .route(
            "/cards/{id}",
            put(rest::update_card_handler).delete(rest::delete_card_handler),
        )
        .route("/cards/{id}/draft", get(rest::card_draft_handler))
        .route("/admin/users", get(admin::list_users_handler))
        .route("/admin/users/{id}", delete(admin::delete_user_handler))
        .route("/admin/users/{id}/role", post(admin::toggle_role_handler))
        .layer(axum_middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
