//! Tour entity

use serde_json::{json, Map, Value};

use super::{optional_number, require_number, require_string, Relation, Resource};
use crate::store::FilterCondition;

const DIFFICULTIES: &[&str] = &["easy", "medium", "difficult"];

/// A guided tour clients can book and review
pub struct Tour;

impl Resource for Tour {
    const NAME: &'static str = "Tour";
    const COLLECTION: &'static str = "tours";

    const FIELDS: &'static [&'static str] = &[
        "id",
        "name",
        "duration",
        "max_group_size",
        "difficulty",
        "ratings_average",
        "ratings_quantity",
        "price",
        "price_discount",
        "summary",
        "description",
        "image_cover",
        "images",
        "start_dates",
        "secret_tour",
        "created_at",
        "updated_at",
        "reviews",
    ];

    const UNIQUE_GROUPS: &'static [&'static [&'static str]] = &[&["name"]];

    const RELATIONS: &'static [Relation] = &[Relation::HasMany {
        name: "reviews",
        collection: "reviews",
        foreign_key: "tour",
    }];

    fn scope_filters() -> Vec<FilterCondition> {
        // Secret tours never show up on the public surface
        vec![FilterCondition::ne("secret_tour", true)]
    }

    fn apply_defaults(doc: &mut Map<String, Value>) {
        super::set_default(doc, "ratings_average", json!(4.5));
        super::set_default(doc, "ratings_quantity", json!(0));
        super::set_default(doc, "secret_tour", json!(false));
    }

    fn validate(doc: &Map<String, Value>) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if let Some(name) = require_string(doc, "name", &mut errors) {
            let len = name.chars().count();
            if !(10..=40).contains(&len) {
                errors.push("A tour name must have between 10 and 40 characters".to_string());
            }
        }

        for field in ["duration", "max_group_size", "price"] {
            if let Some(n) = require_number(doc, field, &mut errors) {
                if n <= 0.0 {
                    errors.push(format!("The {} field must be positive", field));
                }
            }
        }

        match doc.get("difficulty").and_then(Value::as_str) {
            Some(level) if DIFFICULTIES.contains(&level) => {}
            _ => errors.push("Difficulty is either: easy, medium, difficult".to_string()),
        }

        if let Some(rating) = optional_number(doc, "ratings_average", &mut errors) {
            if !(1.0..=5.0).contains(&rating) {
                errors.push("Rating must be between 1.0 and 5.0".to_string());
            }
        }

        if let (Some(discount), Some(price)) = (
            optional_number(doc, "price_discount", &mut errors),
            doc.get("price").and_then(Value::as_f64),
        ) {
            if discount >= price {
                errors.push("Discount price should be below the regular price".to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_tour() -> Map<String, Value> {
        json!({
            "name": "The Forest Hiker",
            "duration": 5,
            "max_group_size": 25,
            "difficulty": "easy",
            "price": 397,
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    #[test]
    fn test_valid_tour_passes() {
        let mut doc = valid_tour();
        Tour::apply_defaults(&mut doc);
        assert!(Tour::validate(&doc).is_ok());
        assert_eq!(doc.get("ratings_average"), Some(&json!(4.5)));
        assert_eq!(doc.get("secret_tour"), Some(&json!(false)));
    }

    #[test]
    fn test_missing_required_fields() {
        let errors = Tour::validate(&Map::new()).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("name")));
        assert!(errors.iter().any(|e| e.contains("price")));
        assert!(errors.iter().any(|e| e.contains("difficulty")));
    }

    #[test]
    fn test_name_length_bounds() {
        let mut doc = valid_tour();
        doc.insert("name".to_string(), json!("Short"));
        assert!(Tour::validate(&doc).is_err());

        doc.insert(
            "name".to_string(),
            json!("A name well beyond the forty character ceiling set here"),
        );
        assert!(Tour::validate(&doc).is_err());
    }

    #[test]
    fn test_unknown_difficulty_rejected() {
        let mut doc = valid_tour();
        doc.insert("difficulty".to_string(), json!("brutal"));
        let errors = Tour::validate(&doc).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("Difficulty")));
    }

    #[test]
    fn test_discount_must_be_below_price() {
        let mut doc = valid_tour();
        doc.insert("price_discount".to_string(), json!(500));
        assert!(Tour::validate(&doc).is_err());

        doc.insert("price_discount".to_string(), json!(100));
        assert!(Tour::validate(&doc).is_ok());
    }

    #[test]
    fn test_rating_bounds() {
        let mut doc = valid_tour();
        doc.insert("ratings_average".to_string(), json!(5.5));
        assert!(Tour::validate(&doc).is_err());
    }
}
