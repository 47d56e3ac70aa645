//! Tour routes
//!
//! Reads are public; mutations are gated to `admin` and `lead-guide`.
//! The planning view (`/monthly-plan`) additionally admits plain guides.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::{middleware, Json, Router};
use chrono::{Datelike, NaiveDate};
use http::StatusCode;
use serde_json::{json, Map, Value};

use crate::handlers::factory::{self, list_resource};
use crate::handlers::response::Envelope;
use crate::middleware::{guides_and_staff, protect, staff_only};
use crate::models::{Resource, Tour};
use crate::state::AppState;
use crate::store::{FilterCondition, QueryPlan};
use crate::Result;

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/tours/top-5-cheap", get(top_tours))
        .route("/api/v1/tours/tour-stats", get(tour_stats))
        .route(
            "/api/v1/tours/monthly-plan/{year}",
            get(monthly_plan)
                .route_layer(middleware::from_fn(guides_and_staff))
                .route_layer(middleware::from_fn_with_state(state.clone(), protect)),
        )
        .route("/api/v1/tours", get(factory::get_all::<Tour>))
        .route("/api/v1/tours/{id}", get(factory::get_one::<Tour>))
        .route(
            "/api/v1/tours",
            post(factory::create_one::<Tour>)
                .route_layer(middleware::from_fn(staff_only))
                .route_layer(middleware::from_fn_with_state(state.clone(), protect)),
        )
        .route(
            "/api/v1/tours/{id}",
            patch(factory::update_one::<Tour>)
                .delete(factory::delete_one::<Tour>)
                .route_layer(middleware::from_fn(staff_only))
                .route_layer(middleware::from_fn_with_state(state.clone(), protect)),
        )
}

/// Preset alias: the five best-rated tours, cheapest first among ties,
/// trimmed to the card fields
async fn top_tours(State(state): State<AppState>) -> Result<(StatusCode, Json<Envelope>)> {
    let params: Vec<(String, String)> = [
        ("limit", "5"),
        ("sort", "-ratings_average,price"),
        ("fields", "name,price,ratings_average,summary,difficulty"),
    ]
    .iter()
    .map(|(key, value)| (key.to_string(), value.to_string()))
    .collect();

    list_resource::<Tour>(&state, &params, Vec::new()).await
}

/// `GET /tours/tour-stats`: per-difficulty aggregates over well-rated
/// tours (rating 4.5 and up), cheapest group first
async fn tour_stats(State(state): State<AppState>) -> Result<(StatusCode, Json<Envelope>)> {
    let mut filters = Tour::scope_filters();
    filters.push(FilterCondition::gte("ratings_average", 4.5));
    let tours = state
        .store
        .find(Tour::COLLECTION, &QueryPlan::filtered(filters))
        .await;

    struct Group {
        num_tours: u64,
        num_ratings: f64,
        rating_sum: f64,
        price_sum: f64,
        min_price: f64,
        max_price: f64,
    }

    let mut groups: BTreeMap<String, Group> = BTreeMap::new();
    for tour in &tours {
        let Some(difficulty) = tour.get("difficulty").and_then(Value::as_str) else {
            continue;
        };
        let price = tour.get("price").and_then(Value::as_f64).unwrap_or(0.0);
        let rating = tour
            .get("ratings_average")
            .and_then(Value::as_f64)
            .unwrap_or(0.0);
        let quantity = tour
            .get("ratings_quantity")
            .and_then(Value::as_f64)
            .unwrap_or(0.0);

        let group = groups.entry(difficulty.to_string()).or_insert(Group {
            num_tours: 0,
            num_ratings: 0.0,
            rating_sum: 0.0,
            price_sum: 0.0,
            min_price: f64::INFINITY,
            max_price: f64::NEG_INFINITY,
        });
        group.num_tours += 1;
        group.num_ratings += quantity;
        group.rating_sum += rating;
        group.price_sum += price;
        group.min_price = group.min_price.min(price);
        group.max_price = group.max_price.max(price);
    }

    let mut stats: Vec<Map<String, Value>> = groups
        .into_iter()
        .map(|(difficulty, group)| {
            let count = group.num_tours as f64;
            let mut doc = Map::new();
            doc.insert("difficulty".to_string(), json!(difficulty));
            doc.insert("num_tours".to_string(), json!(group.num_tours));
            doc.insert("num_ratings".to_string(), json!(group.num_ratings));
            doc.insert("avg_rating".to_string(), json!(group.rating_sum / count));
            doc.insert("avg_price".to_string(), json!(group.price_sum / count));
            doc.insert("min_price".to_string(), json!(group.min_price));
            doc.insert("max_price".to_string(), json!(group.max_price));
            doc
        })
        .collect();
    stats.sort_by(|a, b| {
        let avg = |doc: &Map<String, Value>| {
            doc.get("avg_price").and_then(Value::as_f64).unwrap_or(0.0)
        };
        avg(a).total_cmp(&avg(b))
    });

    Ok((StatusCode::OK, Json(Envelope::list(stats))))
}

/// `GET /tours/monthly-plan/{year}`: how many tours start in each month
/// of the given year, busiest month first
async fn monthly_plan(
    State(state): State<AppState>,
    Path(year): Path<i32>,
) -> Result<(StatusCode, Json<Envelope>)> {
    let tours = state
        .store
        .find(Tour::COLLECTION, &QueryPlan::filtered(Tour::scope_filters()))
        .await;

    let mut months: BTreeMap<u32, Vec<String>> = BTreeMap::new();
    for tour in &tours {
        let Some(name) = tour.get("name").and_then(Value::as_str) else {
            continue;
        };
        let Some(dates) = tour.get("start_dates").and_then(Value::as_array) else {
            continue;
        };
        for date in dates {
            let Some(date) = date.as_str().and_then(parse_start_date) else {
                continue;
            };
            if date.year() == year {
                months.entry(date.month()).or_default().push(name.to_string());
            }
        }
    }

    let mut plan: Vec<Map<String, Value>> = months
        .into_iter()
        .map(|(month, names)| {
            let mut doc = Map::new();
            doc.insert("month".to_string(), json!(month));
            doc.insert("num_tour_starts".to_string(), json!(names.len()));
            doc.insert("tours".to_string(), json!(names));
            doc
        })
        .collect();
    plan.sort_by_key(|doc| {
        Reverse(
            doc.get("num_tour_starts")
                .and_then(Value::as_u64)
                .unwrap_or(0),
        )
    });
    plan.truncate(12);

    Ok((StatusCode::OK, Json(Envelope::list(plan))))
}

/// Start dates are stored as RFC 3339 or plain `YYYY-MM-DD` strings;
/// only the calendar date matters here
fn parse_start_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.get(..10)?, "%Y-%m-%d").ok()
}
