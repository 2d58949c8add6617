// Library exports for Palengke
// This allows integration tests and external code to use Palengke modules

pub mod auth;
pub mod booking;
pub mod catalog;
pub mod community;
pub mod config;
pub mod db;
pub mod dispute;
pub mod error;
pub mod extractors;
pub mod moderation;
pub mod repository;
pub mod state;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// The full application router, shared by `main` and the integration tests.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(auth::handlers::router())
        .merge(catalog::router())
        .merge(community::router())
        .merge(booking::router())
        .merge(dispute::router())
        .merge(moderation::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
