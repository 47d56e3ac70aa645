//! Review entity
//!
//! A user reviews a tour at most once. Every write or delete recomputes
//! the owning tour's rating aggregates.

use std::future::Future;

use serde_json::{json, Map, Value};

use super::{require_number, require_string, Relation, Resource};
use crate::store::{DocumentStore, FilterCondition, QueryPlan};

/// A rating and comment a user leaves on a tour
pub struct Review;

impl Resource for Review {
    const NAME: &'static str = "Review";
    const COLLECTION: &'static str = "reviews";

    const FIELDS: &'static [&'static str] =
        &["id", "review", "rating", "tour", "user", "created_at", "updated_at"];

    const UNIQUE_GROUPS: &'static [&'static [&'static str]] = &[&["tour", "user"]];

    const RELATIONS: &'static [Relation] = &[Relation::BelongsTo {
        field: "user",
        collection: "users",
        fields: &["name", "photo"],
    }];

    fn validate(doc: &Map<String, Value>) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        require_string(doc, "review", &mut errors);
        require_string(doc, "tour", &mut errors);
        require_string(doc, "user", &mut errors);

        if let Some(rating) = require_number(doc, "rating", &mut errors) {
            if !(1.0..=5.0).contains(&rating) {
                errors.push("Rating must be between 1.0 and 5.0".to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn after_change(
        store: &DocumentStore,
        doc: &Map<String, Value>,
    ) -> impl Future<Output = crate::Result<()>> + Send {
        let store = store.clone();
        let tour_id = doc.get("tour").and_then(Value::as_str).map(String::from);

        async move {
            let Some(tour_id) = tour_id else {
                return Ok(());
            };
            recalculate_ratings(&store, &tour_id).await;
            Ok(())
        }
    }
}

/// Recompute a tour's `ratings_quantity`/`ratings_average` from its
/// remaining reviews; 0 and 4.5 when none are left.
async fn recalculate_ratings(store: &DocumentStore, tour_id: &str) {
    let plan = QueryPlan::filtered(vec![FilterCondition::eq("tour", tour_id)]);
    let reviews = store.find(Review::COLLECTION, &plan).await;

    let ratings: Vec<f64> = reviews
        .iter()
        .filter_map(|review| review.get("rating").and_then(Value::as_f64))
        .collect();

    let (quantity, average) = if ratings.is_empty() {
        (0, 4.5)
    } else {
        let sum: f64 = ratings.iter().sum();
        (ratings.len(), sum / ratings.len() as f64)
    };

    let mut fields = Map::new();
    fields.insert("ratings_quantity".to_string(), json!(quantity));
    fields.insert("ratings_average".to_string(), json!(average));

    // The tour may have been deleted out from under its reviews
    if let Err(err) = store.patch("tours", tour_id, fields).await {
        tracing::debug!(tour_id, error = %err, "skipped rating recalculation");
    }
}
