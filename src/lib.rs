//! Tour booking REST API.
//!
//! Four document collections (tours, users, reviews, bookings) exposed
//! through generic CRUD handlers. List endpoints are shaped by a staged
//! query builder: filter, sort, projection, pagination, in that order.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod routes;
pub mod server;
pub mod state;
pub mod store;

pub use error::{Error, Result};
pub use state::AppState;
