//! Switchboard server library.
//!
//! A single-admin direct messaging service: users register and chat only
//! with the admin, and the admin picks which user's conversation to view.
//! The library exposes the router so the binary and the integration tests
//! serve the same application.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::Router;
use tower_http::{services::ServeDir, trace::TraceLayer};

use state::AppState;

/// Build the application router over `state`.
///
/// Sentry layers are added by the binary so tests run without them.
pub fn app(state: AppState) -> Router {
    let config = state.config();
    let session_layer = middleware::create_session_layer(state.session_store().clone(), config);

    Router::new()
        .merge(routes::routes(config.max_upload_bytes))
        .nest_service("/avatars", ServeDir::new(&config.avatar_dir))
        .nest_service("/uploads", ServeDir::new(&config.upload_dir))
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
