//! Entity metadata and validation
//!
//! Each domain type implements [`Resource`]: the per-entity knowledge the
//! generic handlers need. Documents themselves stay untyped JSON objects;
//! the trait carries the collection name, the enumerated field set used to
//! validate projections, hidden fields, unique groups, visibility scope,
//! relations, defaults, and full-document validation.

mod booking;
mod review;
mod tour;
mod user;

pub use booking::Booking;
pub use review::Review;
pub use tour::Tour;
pub use user::User;

use std::future::Future;

use serde_json::{Map, Value};

use crate::store::{DocumentStore, FilterCondition};

/// A related entity inlined on reads
#[derive(Debug, Clone, Copy)]
pub enum Relation {
    /// Children referencing this document, embedded as an array on
    /// read-one
    HasMany {
        /// Field name the children are embedded under
        name: &'static str,
        /// Child collection
        collection: &'static str,
        /// Child field holding this document's id
        foreign_key: &'static str,
    },
    /// A referenced parent, embedded in place of its id on every read
    BelongsTo {
        /// Field holding the referenced id
        field: &'static str,
        /// Referenced collection
        collection: &'static str,
        /// Fields of the referenced document to embed (plus its id)
        fields: &'static [&'static str],
    },
}

/// Per-entity contract consumed by the generic CRUD handlers
pub trait Resource: Send + Sync + 'static {
    /// Display name used in error messages
    const NAME: &'static str;

    /// Store collection
    const COLLECTION: &'static str;

    /// Every client-visible field; the allow-list projections are
    /// validated against
    const FIELDS: &'static [&'static str];

    /// Fields stripped from every response
    const HIDDEN_FIELDS: &'static [&'static str] = &[];

    /// Field groups enforced unique across the collection
    const UNIQUE_GROUPS: &'static [&'static [&'static str]] = &[];

    /// Relations expanded on reads
    const RELATIONS: &'static [Relation] = &[];

    /// Conditions a document must satisfy to be visible to reads
    fn scope_filters() -> Vec<FilterCondition> {
        Vec::new()
    }

    /// Fill defaulted fields before validation on create
    fn apply_defaults(_doc: &mut Map<String, Value>) {}

    /// Validate a full document. Returns every violation, not just the
    /// first.
    fn validate(doc: &Map<String, Value>) -> Result<(), Vec<String>>;

    /// Hook invoked after any create, update, or delete of a document
    fn after_change(
        _store: &DocumentStore,
        _doc: &Map<String, Value>,
    ) -> impl Future<Output = crate::Result<()>> + Send {
        async { Ok(()) }
    }
}

// Validation helpers shared by the entity impls. Each pushes a message and
// returns None on failure so checks can chain without early returns.

pub(crate) fn require_string<'a>(
    doc: &'a Map<String, Value>,
    field: &str,
    errors: &mut Vec<String>,
) -> Option<&'a str> {
    match doc.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(Value::String(_)) | None => {
            errors.push(format!("A {} is required", field));
            None
        }
        Some(_) => {
            errors.push(format!("The {} field must be a string", field));
            None
        }
    }
}

pub(crate) fn require_number(
    doc: &Map<String, Value>,
    field: &str,
    errors: &mut Vec<String>,
) -> Option<f64> {
    match doc.get(field).and_then(Value::as_f64) {
        Some(n) => Some(n),
        None => {
            errors.push(format!("A numeric {} is required", field));
            None
        }
    }
}

pub(crate) fn optional_number(
    doc: &Map<String, Value>,
    field: &str,
    errors: &mut Vec<String>,
) -> Option<f64> {
    match doc.get(field) {
        None | Some(Value::Null) => None,
        Some(value) => match value.as_f64() {
            Some(n) => Some(n),
            None => {
                errors.push(format!("The {} field must be a number", field));
                None
            }
        },
    }
}

pub(crate) fn set_default(doc: &mut Map<String, Value>, field: &str, value: Value) {
    if !doc.contains_key(field) {
        doc.insert(field.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Map<String, Value> {
        value.as_object().cloned().expect("object literal")
    }

    #[test]
    fn test_require_string() {
        let d = doc(json!({"name": "ok", "blank": "  ", "num": 3}));
        let mut errors = Vec::new();
        assert_eq!(require_string(&d, "name", &mut errors), Some("ok"));
        assert!(require_string(&d, "blank", &mut errors).is_none());
        assert!(require_string(&d, "num", &mut errors).is_none());
        assert!(require_string(&d, "missing", &mut errors).is_none());
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_optional_number() {
        let d = doc(json!({"price": 100, "bad": "x"}));
        let mut errors = Vec::new();
        assert_eq!(optional_number(&d, "price", &mut errors), Some(100.0));
        assert_eq!(optional_number(&d, "absent", &mut errors), None);
        assert!(errors.is_empty());
        assert_eq!(optional_number(&d, "bad", &mut errors), None);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_set_default_does_not_overwrite() {
        let mut d = doc(json!({"role": "admin"}));
        set_default(&mut d, "role", json!("user"));
        set_default(&mut d, "photo", json!("default.jpg"));
        assert_eq!(d.get("role"), Some(&json!("admin")));
        assert_eq!(d.get("photo"), Some(&json!("default.jpg")));
    }
}
