//! HTTP surface assembly
//!
//! Each entity contributes its own `Router<AppState>`; this module merges
//! them under `/api/v1`, adds the health probe, and installs the JSON 404
//! fallback.

mod bookings;
mod reviews;
mod tours;
mod users;

use axum::http::Uri;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::error::Error;
use crate::state::AppState;

/// Build the full application router
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .merge(tours::router(&state))
        .merge(users::router(&state))
        .merge(reviews::router(&state))
        .merge(bookings::router(&state))
        .route("/health", get(health))
        .fallback(not_found)
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "success" }))
}

async fn not_found(uri: Uri) -> Error {
    Error::NotFound(format!("Can't find {} on this server", uri.path()))
}
