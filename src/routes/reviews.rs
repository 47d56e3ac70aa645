//! Review routes, flat and nested under a tour
//!
//! Everything requires a login. Only plain `user` accounts write
//! reviews; edits and deletes additionally allow `admin`.

use axum::extract::{Path, Query, State};
use axum::routing::{get, patch, post};
use axum::{middleware, Extension, Json, Router};
use http::StatusCode;
use serde_json::Value;

use crate::handlers::factory::{self, body_object, insert_resource, list_resource};
use crate::handlers::response::Envelope;
use crate::middleware::{protect, users_and_admins, users_only, CurrentUser};
use crate::models::Review;
use crate::state::AppState;
use crate::store::FilterCondition;
use crate::Result;

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/reviews", get(factory::get_all::<Review>))
        .route(
            "/api/v1/reviews",
            post(create_review).route_layer(middleware::from_fn(users_only)),
        )
        .route("/api/v1/reviews/{id}", get(factory::get_one::<Review>))
        .route(
            "/api/v1/reviews/{id}",
            patch(factory::update_one::<Review>)
                .delete(factory::delete_one::<Review>)
                .route_layer(middleware::from_fn(users_and_admins)),
        )
        .route("/api/v1/tours/{id}/reviews", get(list_for_tour))
        .route(
            "/api/v1/tours/{id}/reviews",
            post(create_for_tour).route_layer(middleware::from_fn(users_only)),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), protect))
}

/// `POST /reviews`: the author defaults to the logged-in user
async fn create_review(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Envelope>)> {
    let mut doc = body_object(body)?;
    if !doc.contains_key("user") {
        doc.insert("user".to_string(), Value::String(current.id()?));
    }
    insert_resource::<Review>(&state, doc).await
}

/// `GET /tours/{id}/reviews`: the flat list surface scoped to one tour
async fn list_for_tour(
    State(state): State<AppState>,
    Path(tour_id): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<(StatusCode, Json<Envelope>)> {
    list_resource::<Review>(&state, &params, vec![FilterCondition::eq("tour", tour_id)]).await
}

/// `POST /tours/{id}/reviews`: tour and author come from the route and
/// the login, never the body
async fn create_for_tour(
    State(state): State<AppState>,
    Path(tour_id): Path<String>,
    Extension(current): Extension<CurrentUser>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Envelope>)> {
    let mut doc = body_object(body)?;
    doc.insert("tour".to_string(), Value::String(tour_id));
    doc.insert("user".to_string(), Value::String(current.id()?));
    insert_resource::<Review>(&state, doc).await
}
