//! services/api/src/bin/api.rs

use api_lib::{
    adapters::db::DbAdapter,
    config::{AdminSeed, Config},
    error::ApiError,
    web::{auth::hash_password, rest::ApiDoc, router, state::AppState},
};
use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use axum::Router;
use flashdeck_core::{InMemoryStore, NewUser, Role};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Creates the configured admin account if the system has none.
async fn bootstrap_admin(state: &AppState, seed: &AdminSeed) -> Result<(), ApiError> {
    if state.accounts.has_admin().await? {
        return Ok(());
    }
    let admin = NewUser {
        username: seed.username.clone(),
        email: seed.email.clone(),
        hashed_password: hash_password(&seed.password)?,
        role: Role::Admin,
    };
    if let Some(user) = state.accounts.ensure_admin(admin).await? {
        info!("Created admin account '{}'", user.username);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to the Store & Run Migrations ---
    let app_state = if config.uses_memory_store() {
        warn!("Using the in-memory store; nothing will survive a restart");
        AppState::new(config.clone(), Arc::new(InMemoryStore::new()))?
    } else {
        info!("Connecting to database...");
        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&config.database_url)
            .await?;
        let db_adapter = Arc::new(DbAdapter::new(db_pool));
        info!("Running database migrations...");
        db_adapter.run_migrations().await?;
        info!("Database migrations complete.");
        AppState::new(config.clone(), db_adapter)?
    };
    let app_state = Arc::new(app_state);

    // --- 3. Make Sure Someone Can Administer the System ---
    match &config.bootstrap_admin {
        Some(seed) => bootstrap_admin(&app_state, seed).await?,
        None if !app_state.accounts.has_admin().await? => {
            warn!("No admin account exists; set ADMIN_USERNAME, ADMIN_EMAIL and ADMIN_PASSWORD to create one");
        }
        None => {}
    }

    // --- 4. Create the Web Router ---
    let origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid CORS_ORIGIN '{}': {}", config.cors_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(router(app_state).layer(cors))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
