//! Web layer - page handlers and routing
//!
//! Contains:
//! - `pages`, the four public blog pages
//! - `responses`, the serializers shaping models for templates
//! - `middleware`, shared state and the error type handlers return

pub mod middleware;
pub mod pages;
pub mod responses;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

pub use middleware::{ApiError, AppState};

/// Build the complete router with middleware
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(pages::index))
        .route("/post/{slug}", get(pages::post_detail))
        .route("/tag/{tag_title}", get(pages::tag_filter))
        .route("/contacts", get(pages::contacts))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
