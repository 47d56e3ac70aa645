//! User entity
//!
//! Credentials and reset-token bookkeeping live on the document but are
//! hidden from every response. Soft-deleted accounts (`active: false`)
//! are filtered out of reads by the scope filter.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map, Value};

use super::{require_string, Resource};
use crate::store::FilterCondition;

/// Roles a user may hold
pub const ROLES: &[&str] = &["user", "guide", "lead-guide", "admin"];

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
});

/// An account holder
pub struct User;

impl User {
    /// Is this a syntactically plausible email address?
    pub fn is_valid_email(email: &str) -> bool {
        EMAIL_RE.is_match(email)
    }
}

impl Resource for User {
    const NAME: &'static str = "User";
    const COLLECTION: &'static str = "users";

    const FIELDS: &'static [&'static str] =
        &["id", "name", "email", "photo", "role", "created_at", "updated_at"];

    const HIDDEN_FIELDS: &'static [&'static str] = &[
        "password",
        "password_changed_at",
        "password_reset_token",
        "password_reset_expires",
        "active",
    ];

    const UNIQUE_GROUPS: &'static [&'static [&'static str]] = &[&["email"]];

    fn scope_filters() -> Vec<FilterCondition> {
        vec![FilterCondition::ne("active", false)]
    }

    fn apply_defaults(doc: &mut Map<String, Value>) {
        super::set_default(doc, "role", json!("user"));
        super::set_default(doc, "photo", json!("default.jpg"));
        super::set_default(doc, "active", json!(true));
    }

    fn validate(doc: &Map<String, Value>) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        require_string(doc, "name", &mut errors);

        if let Some(email) = require_string(doc, "email", &mut errors) {
            if !Self::is_valid_email(email) {
                errors.push("Please provide a valid email".to_string());
            }
        }

        match doc.get("role").and_then(Value::as_str) {
            Some(role) if ROLES.contains(&role) => {}
            _ => errors.push("Role is either: user, guide, lead-guide, admin".to_string()),
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
