//! Filtering, ordering, projection, and pagination types for store queries

use std::cmp::Ordering;
use std::fmt;

use serde_json::{Map, Value};

/// Direction for ordering results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDirection {
    /// Sort in ascending order (A-Z, 0-9)
    #[default]
    Ascending,
    /// Sort in descending order (Z-A, 9-0)
    Descending,
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => write!(f, "asc"),
            Self::Descending => write!(f, "desc"),
        }
    }
}

/// A single ordering key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    /// Field name to order by
    pub field: String,
    /// Direction to order in
    pub direction: OrderDirection,
}

impl SortKey {
    /// Ascending key
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Ascending,
        }
    }

    /// Descending key
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Descending,
        }
    }

    /// Parse a single sort token: a leading `-` marks descending
    pub fn parse(spec: &str) -> Self {
        match spec.strip_prefix('-') {
            Some(field) => Self::desc(field),
            None => Self::asc(spec),
        }
    }
}

/// Pagination parameters for limiting query results
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    /// Number of results to skip
    pub offset: u64,
    /// Maximum number of results to return
    pub limit: u64,
}

impl Pagination {
    /// Create new pagination parameters
    #[must_use]
    pub const fn new(offset: u64, limit: u64) -> Self {
        Self { offset, limit }
    }

    /// Pagination for the first page with the given limit
    #[must_use]
    pub const fn first_page(limit: u64) -> Self {
        Self { offset: 0, limit }
    }

    /// Pagination for a specific page number (1-indexed).
    ///
    /// The offset saturates; an absurd page number yields an empty page
    /// rather than wrapping.
    #[must_use]
    pub const fn page(page_number: u64, page_size: u64) -> Self {
        let offset = page_number.saturating_sub(1).saturating_mul(page_size);
        Self {
            offset,
            limit: page_size,
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 100,
        }
    }
}

/// Comparison operators for filter conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    /// Equal to (=)
    Equal,
    /// Not equal to (!=)
    NotEqual,
    /// Greater than (>)
    GreaterThan,
    /// Greater than or equal to (>=)
    GreaterThanOrEqual,
    /// Less than (<)
    LessThan,
    /// Less than or equal to (<=)
    LessThanOrEqual,
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equal => write!(f, "="),
            Self::NotEqual => write!(f, "!="),
            Self::GreaterThan => write!(f, ">"),
            Self::GreaterThanOrEqual => write!(f, ">="),
            Self::LessThan => write!(f, "<"),
            Self::LessThanOrEqual => write!(f, "<="),
        }
    }
}

/// A single filter condition evaluated against a document field
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCondition {
    /// The field name to filter on
    pub field: String,
    /// The comparison operator
    pub operator: FilterOperator,
    /// The value to compare against
    pub value: Value,
}

impl FilterCondition {
    /// Create a new filter condition
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    /// Equality filter (field = value)
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOperator::Equal, value)
    }

    /// Not-equal filter (field != value)
    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOperator::NotEqual, value)
    }

    /// Greater-than filter (field > value)
    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOperator::GreaterThan, value)
    }

    /// Greater-than-or-equal filter (field >= value)
    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOperator::GreaterThanOrEqual, value)
    }

    /// Less-than filter (field < value)
    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOperator::LessThan, value)
    }

    /// Less-than-or-equal filter (field <= value)
    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOperator::LessThanOrEqual, value)
    }

    /// Evaluate this condition against a document.
    ///
    /// A missing field fails every comparison except `!=`, which passes:
    /// scope filters such as `active != false` must keep matching documents
    /// that never set the field.
    pub fn matches(&self, doc: &Map<String, Value>) -> bool {
        let field_value = doc.get(&self.field);

        let Some(field_value) = field_value else {
            return self.operator == FilterOperator::NotEqual;
        };

        let Some(ordering) = compare_values(field_value, &self.value) else {
            // Incomparable types: only != can succeed
            return self.operator == FilterOperator::NotEqual;
        };

        match self.operator {
            FilterOperator::Equal => ordering == Ordering::Equal,
            FilterOperator::NotEqual => ordering != Ordering::Equal,
            FilterOperator::GreaterThan => ordering == Ordering::Greater,
            FilterOperator::GreaterThanOrEqual => ordering != Ordering::Less,
            FilterOperator::LessThan => ordering == Ordering::Less,
            FilterOperator::LessThanOrEqual => ordering != Ordering::Greater,
        }
    }
}

/// Field subset returned to the client
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Projection {
    /// All fields
    #[default]
    All,
    /// Only the listed fields (plus the identifier)
    Include(Vec<String>),
    /// All fields except the listed ones
    Exclude(Vec<String>),
}

impl Projection {
    /// Apply this projection to a document in place
    pub fn apply(&self, doc: &mut Map<String, Value>) {
        match self {
            Self::All => {}
            Self::Include(fields) => {
                doc.retain(|key, _| key == super::ID_FIELD || fields.iter().any(|f| f == key));
            }
            Self::Exclude(fields) => {
                doc.retain(|key, _| !fields.iter().any(|f| f == key));
            }
        }
    }
}

/// Order two JSON values, coercing across the representations a query
/// string produces.
///
/// Numbers compare numerically, strings lexically (RFC 3339 timestamps
/// therefore order chronologically). A string on either side of a number is
/// parsed before comparing. Returns `None` for incomparable types.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64().partial_cmp(&y.as_f64()),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Number(x), Value::String(y)) => {
            let parsed: f64 = y.parse().ok()?;
            x.as_f64().partial_cmp(&Some(parsed))
        }
        (Value::String(x), Value::Number(y)) => {
            let parsed: f64 = x.parse().ok()?;
            Some(parsed).partial_cmp(&y.as_f64())
        }
        _ => None,
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
    fn test_sort_key_parse() {
        assert_eq!(SortKey::parse("price"), SortKey::asc("price"));
        assert_eq!(SortKey::parse("-created_at"), SortKey::desc("created_at"));
    }

    #[test]
    fn test_pagination_page() {
        let page1 = Pagination::page(1, 100);
        assert_eq!(page1.offset, 0);
        assert_eq!(page1.limit, 100);

        let page3 = Pagination::page(3, 20);
        assert_eq!(page3.offset, 40);
    }

    #[test]
    fn test_pagination_page_zero_handling() {
        // Page 0 cannot underflow the offset
        let page0 = Pagination::page(0, 20);
        assert_eq!(page0.offset, 0);
    }

    #[test]
    fn test_pagination_huge_page_saturates() {
        // A page number near u64::MAX must not wrap the offset
        let huge = Pagination::page(u64::MAX, 1000);
        assert_eq!(huge.offset, u64::MAX);
        assert_eq!(huge.limit, 1000);
    }

    #[test]
    fn test_equality_match() {
        let d = doc(json!({"difficulty": "easy"}));
        assert!(FilterCondition::eq("difficulty", "easy").matches(&d));
        assert!(!FilterCondition::eq("difficulty", "medium").matches(&d));
    }

    #[test]
    fn test_range_operators() {
        let d = doc(json!({"duration": 7}));
        assert!(FilterCondition::gte("duration", 5).matches(&d));
        assert!(FilterCondition::gt("duration", 5).matches(&d));
        assert!(!FilterCondition::gt("duration", 7).matches(&d));
        assert!(FilterCondition::lte("duration", 7).matches(&d));
        assert!(!FilterCondition::lt("duration", 7).matches(&d));
    }

    #[test]
    fn test_numeric_string_coercion() {
        // Query values arrive as strings; they must still compare against
        // numeric fields.
        let d = doc(json!({"duration": 7}));
        assert!(FilterCondition::gte("duration", "5").matches(&d));
        assert!(!FilterCondition::gte("duration", "9").matches(&d));
    }

    #[test]
    fn test_missing_field_only_matches_not_equal() {
        let d = doc(json!({"name": "x"}));
        assert!(!FilterCondition::eq("active", false).matches(&d));
        assert!(FilterCondition::ne("active", false).matches(&d));
        assert!(!FilterCondition::gte("rating", 1).matches(&d));
    }

    #[test]
    fn test_projection_include_keeps_id() {
        let mut d = doc(json!({"id": "t1", "name": "Hike", "price": 10, "summary": "s"}));
        Projection::Include(vec!["name".into()]).apply(&mut d);
        assert_eq!(d.len(), 2);
        assert!(d.contains_key("id"));
        assert!(d.contains_key("name"));
    }

    #[test]
    fn test_projection_exclude() {
        let mut d = doc(json!({"id": "t1", "name": "Hike", "_version": 3}));
        Projection::Exclude(vec!["_version".into()]).apply(&mut d);
        assert!(!d.contains_key("_version"));
        assert!(d.contains_key("name"));
    }

    #[test]
    fn test_compare_rfc3339_strings() {
        let earlier = json!("2024-01-01T00:00:00+00:00");
        let later = json!("2024-06-01T00:00:00+00:00");
        assert_eq!(compare_values(&earlier, &later), Some(Ordering::Less));
    }
}
