//! Booking routes
//!
//! The whole surface is back-office: login plus `admin` or `lead-guide`.

use axum::routing::get;
use axum::{middleware, Router};

use crate::handlers::factory;
use crate::middleware::{protect, staff_only};
use crate::models::Booking;
use crate::state::AppState;

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/bookings",
            get(factory::get_all::<Booking>).post(factory::create_one::<Booking>),
        )
        .route(
            "/api/v1/bookings/{id}",
            get(factory::get_one::<Booking>)
                .patch(factory::update_one::<Booking>)
                .delete(factory::delete_one::<Booking>),
        )
        .route_layer(middleware::from_fn(staff_only))
        .route_layer(middleware::from_fn_with_state(state.clone(), protect))
}
