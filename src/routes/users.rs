//! User routes
//!
//! Signup, login, and password recovery are public. The `me` routes only
//! need a login; the bare CRUD surface is admin territory, and `POST
//! /users` is a signpost to `/signup` rather than a handler.

use axum::routing::{delete, get, patch, post};
use axum::{middleware, Router};

use crate::auth::handlers as account;
use crate::handlers::factory;
use crate::middleware::{admin_only, protect};
use crate::models::User;
use crate::state::AppState;

pub fn router(state: &AppState) -> Router<AppState> {
    let logged_in = || middleware::from_fn_with_state(state.clone(), protect);

    Router::new()
        .route("/api/v1/users/signup", post(account::signup))
        .route("/api/v1/users/login", post(account::login))
        .route("/api/v1/users/forgot-password", post(account::forgot_password))
        .route(
            "/api/v1/users/reset-password/{token}",
            patch(account::reset_password),
        )
        .route(
            "/api/v1/users/update-my-password",
            patch(account::update_password).route_layer(logged_in()),
        )
        .route(
            "/api/v1/users/me",
            get(account::get_me).route_layer(logged_in()),
        )
        .route(
            "/api/v1/users/update-me",
            patch(account::update_me).route_layer(logged_in()),
        )
        .route(
            "/api/v1/users/delete-me",
            delete(account::delete_me).route_layer(logged_in()),
        )
        .route(
            "/api/v1/users",
            get(factory::get_all::<User>)
                .post(account::create_user_not_defined)
                .route_layer(middleware::from_fn(admin_only))
                .route_layer(logged_in()),
        )
        .route(
            "/api/v1/users/{id}",
            get(factory::get_one::<User>)
                .patch(factory::update_one::<User>)
                .delete(factory::delete_one::<User>)
                .route_layer(middleware::from_fn(admin_only))
                .route_layer(logged_in()),
        )
}
