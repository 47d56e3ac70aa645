//! Booking entity

use serde_json::{json, Map, Value};

use super::{require_number, require_string, Relation, Resource};

/// A paid (or pending) reservation of a tour by a user
pub struct Booking;

impl Resource for Booking {
    const NAME: &'static str = "Booking";
    const COLLECTION: &'static str = "bookings";

    const FIELDS: &'static [&'static str] =
        &["id", "tour", "user", "price", "paid", "created_at", "updated_at"];

    const RELATIONS: &'static [Relation] = &[Relation::BelongsTo {
        field: "tour",
        collection: "tours",
        fields: &["name"],
    }];

    fn apply_defaults(doc: &mut Map<String, Value>) {
        super::set_default(doc, "paid", json!(true));
    }

    fn validate(doc: &Map<String, Value>) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        require_string(doc, "tour", &mut errors);
        require_string(doc, "user", &mut errors);

        if let Some(price) = require_number(doc, "price", &mut errors) {
            if price <= 0.0 {
                errors.push("The price field must be positive".to_string());
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

    #[test]
    fn test_defaults_and_validation() {
        let mut doc = json!({"tour": "t1", "user": "u1", "price": 250})
            .as_object()
            .cloned()
            .unwrap();
        Booking::apply_defaults(&mut doc);
        assert_eq!(doc.get("paid"), Some(&json!(true)));
        assert!(Booking::validate(&doc).is_ok());
    }

    #[test]
    fn test_price_must_be_positive() {
        let doc = json!({"tour": "t1", "user": "u1", "price": 0})
            .as_object()
            .cloned()
            .unwrap();
        assert!(Booking::validate(&doc).is_err());
    }
}
