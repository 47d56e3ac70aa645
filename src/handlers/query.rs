//! Query feature builder
//!
//! Shapes a list request from the raw, ordered query-string pairs into a
//! [`QueryPlan`]. Four independent concerns, applied in a fixed order:
//! filter, sort, projection, pagination. Each stage consumes the builder
//! and returns a new value; nothing is shared or mutated in place.
//!
//! Reserved parameter names, the default sort, and the limit bounds come
//! from [`QueryConfig`] rather than hard-coded literals.
//!
//! Query-string contract:
//! - `field=value` is an equality filter; `field[gte|gt|lte|lt]=value` a
//!   range filter on that field. Values are coerced to integer, float,
//!   or boolean where they parse as one.
//! - `sort=a,-b`: comma-separated keys, leading `-` for descending.
//! - `fields=a,b` is an include list; `fields=-a,-b` an exclude list.
//! - `page`/`limit`: positive integers; non-numeric input falls back to
//!   the defaults, non-positive input is clamped to 1.

use serde_json::Value;

use crate::config::QueryConfig;
use crate::error::{Error, Result};
use crate::store::{
    FilterCondition, FilterOperator, Pagination, Projection, QueryPlan, SortKey, VERSION_FIELD,
};

/// Staged builder from query-string pairs to a [`QueryPlan`]
#[derive(Debug, Clone)]
pub struct QueryBuilder<'a> {
    params: &'a [(String, String)],
    options: &'a QueryConfig,
    filters: Vec<FilterCondition>,
    sort: Vec<SortKey>,
    projection: Projection,
    pagination: Pagination,
}

impl<'a> QueryBuilder<'a> {
    /// Start a builder over the raw query pairs
    pub fn new(params: &'a [(String, String)], options: &'a QueryConfig) -> Self {
        Self {
            params,
            options,
            filters: Vec::new(),
            sort: Vec::new(),
            projection: Projection::Exclude(vec![VERSION_FIELD.to_string()]),
            pagination: Pagination::first_page(options.default_limit),
        }
    }

    /// Prepend conditions the client cannot override: implicit parent
    /// filters on nested routes and entity scope filters.
    pub fn with_filters(mut self, base: Vec<FilterCondition>) -> Self {
        self.filters = base;
        self
    }

    /// Translate every non-reserved pair into a filter condition.
    ///
    /// An unrecognized bracket operator is a client error.
    pub fn filter(mut self) -> Result<Self> {
        for (key, raw) in self.params {
            if self.options.reserved_params.iter().any(|r| r == key) {
                continue;
            }

            let condition = match parse_operator_key(key) {
                Some((field, op)) => {
                    let operator = match op {
                        "gte" => FilterOperator::GreaterThanOrEqual,
                        "gt" => FilterOperator::GreaterThan,
                        "lte" => FilterOperator::LessThanOrEqual,
                        "lt" => FilterOperator::LessThan,
                        other => {
                            return Err(Error::BadRequest(format!(
                                "Unsupported filter operator '{}' on field '{}'",
                                other, field
                            )))
                        }
                    };
                    FilterCondition::new(field, operator, coerce_value(raw))
                }
                None => FilterCondition::eq(key.clone(), coerce_value(raw)),
            };
            self.filters.push(condition);
        }
        Ok(self)
    }

    /// Apply the client's sort keys, or the configured default
    pub fn sort(mut self) -> Self {
        let spec = self
            .param("sort")
            .unwrap_or(self.options.default_sort.as_str());
        self.sort = spec
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty() && *token != "-")
            .map(SortKey::parse)
            .collect();
        self
    }

    /// Apply the client's field selection.
    ///
    /// A list whose first entry carries a `-` prefix excludes those fields;
    /// otherwise the list is an allow-list. Absent, the default exclusion
    /// of the internal version field stands.
    pub fn project(mut self) -> Self {
        let Some(spec) = self.param("fields") else {
            return self;
        };
        let tokens: Vec<&str> = spec
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect();
        if tokens.is_empty() {
            return self;
        }

        self.projection = if tokens[0].starts_with('-') {
            let mut excluded: Vec<String> = tokens
                .iter()
                .map(|t| t.trim_start_matches('-').to_string())
                .collect();
            excluded.push(VERSION_FIELD.to_string());
            Projection::Exclude(excluded)
        } else {
            Projection::Include(
                tokens
                    .iter()
                    .filter(|t| !t.starts_with('-'))
                    .map(ToString::to_string)
                    .collect(),
            )
        };
        self
    }

    /// Apply page/limit, with `skip = (page - 1) * limit`
    pub fn paginate(mut self) -> Self {
        let page = parse_positive(self.param("page"), 1);
        let limit =
            parse_positive(self.param("limit"), self.options.default_limit).min(self.options.max_limit);
        self.pagination = Pagination::page(page, limit);
        self
    }

    /// Finish the chain
    pub fn build(self) -> QueryPlan {
        QueryPlan {
            filters: self.filters,
            sort: self.sort,
            projection: self.projection,
            pagination: self.pagination,
        }
    }

    fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Split `field[op]` into its parts; `None` for a plain field name
fn parse_operator_key(key: &str) -> Option<(&str, &str)> {
    let open = key.find('[')?;
    let inner = key.strip_suffix(']')?;
    Some((&key[..open], &inner[open + 1..]))
}

/// Coerce a raw query value: integer, then float, then boolean, else string
fn coerce_value(raw: &str) -> Value {
    if let Ok(n) = raw.parse::<i64>() {
        return Value::from(n);
    }
    if let Ok(f) = raw.parse::<f64>() {
        if let Some(number) = serde_json::Number::from_f64(f) {
            return Value::Number(number);
        }
    }
    if let Ok(b) = raw.parse::<bool>() {
        return Value::from(b);
    }
    Value::from(raw)
}

/// Parse a positive integer, falling back to `default` for non-numeric
/// input and clamping non-positive input to 1
fn parse_positive(raw: Option<&str>, default: u64) -> u64 {
    match raw {
        None => default,
        Some(raw) => match raw.parse::<i64>() {
            Ok(n) if n < 1 => 1,
            Ok(n) => n as u64,
            Err(_) => default,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::OrderDirection;

    fn options() -> QueryConfig {
        crate::config::Config::default().query
    }

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn plan(raw: &[(&str, &str)]) -> QueryPlan {
        let params = pairs(raw);
        let opts = options();
        QueryBuilder::new(&params, &opts)
            .filter()
            .expect("valid filters")
            .sort()
            .project()
            .paginate()
            .build()
    }

    #[test]
    fn test_reserved_keys_never_filter() {
        let plan = plan(&[
            ("page", "2"),
            ("sort", "price"),
            ("limit", "10"),
            ("fields", "name"),
        ]);
        assert!(plan.filters.is_empty());
    }

    #[test]
    fn test_equality_and_range_filters() {
        let plan = plan(&[("difficulty", "easy"), ("duration[gte]", "5")]);
        assert_eq!(plan.filters.len(), 2);
        assert_eq!(plan.filters[0], FilterCondition::eq("difficulty", "easy"));
        assert_eq!(plan.filters[1], FilterCondition::gte("duration", 5));
    }

    #[test]
    fn test_each_operator_suffix() {
        for (suffix, operator) in [
            ("gte", FilterOperator::GreaterThanOrEqual),
            ("gt", FilterOperator::GreaterThan),
            ("lte", FilterOperator::LessThanOrEqual),
            ("lt", FilterOperator::LessThan),
        ] {
            let key = format!("price[{}]", suffix);
            let params = pairs(&[(key.as_str(), "100")]);
            let opts = options();
            let plan = QueryBuilder::new(&params, &opts)
                .filter()
                .expect("valid filters")
                .build();
            assert_eq!(plan.filters.len(), 1);
            assert_eq!(plan.filters[0].operator, operator);
            assert_eq!(plan.filters[0].field, "price");
        }
    }

    #[test]
    fn test_unknown_operator_rejected() {
        let params = pairs(&[("price[regex]", "x")]);
        let opts = options();
        let err = QueryBuilder::new(&params, &opts).filter().unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
    }

    #[test]
    fn test_base_filters_precede_client_filters() {
        let params = pairs(&[("rating", "5")]);
        let opts = options();
        let plan = QueryBuilder::new(&params, &opts)
            .with_filters(vec![FilterCondition::eq("tour", "t1")])
            .filter()
            .expect("valid filters")
            .build();
        assert_eq!(plan.filters[0], FilterCondition::eq("tour", "t1"));
        assert_eq!(plan.filters[1], FilterCondition::eq("rating", 5));
    }

    #[test]
    fn test_default_sort_is_descending_created_at() {
        let plan = plan(&[]);
        assert_eq!(plan.sort, vec![SortKey::desc("created_at")]);
    }

    #[test]
    fn test_sort_tokens() {
        let plan = plan(&[("sort", "-ratings_average,price")]);
        assert_eq!(
            plan.sort,
            vec![SortKey::desc("ratings_average"), SortKey::asc("price")]
        );
        assert_eq!(plan.sort[1].direction, OrderDirection::Ascending);
    }

    #[test]
    fn test_default_projection_excludes_version_field() {
        let plan = plan(&[]);
        assert_eq!(
            plan.projection,
            Projection::Exclude(vec![VERSION_FIELD.to_string()])
        );
    }

    #[test]
    fn test_include_projection() {
        let plan = plan(&[("fields", "name,price")]);
        assert_eq!(
            plan.projection,
            Projection::Include(vec!["name".to_string(), "price".to_string()])
        );
    }

    #[test]
    fn test_exclude_projection_keeps_version_hidden() {
        let plan = plan(&[("fields", "-description")]);
        let Projection::Exclude(fields) = plan.projection else {
            panic!("expected exclusion");
        };
        assert!(fields.contains(&"description".to_string()));
        assert!(fields.contains(&VERSION_FIELD.to_string()));
    }

    #[test]
    fn test_default_pagination() {
        let plan = plan(&[]);
        assert_eq!(plan.pagination, Pagination::new(0, 100));
    }

    #[test]
    fn test_skip_formula() {
        let plan = plan(&[("page", "3"), ("limit", "20")]);
        assert_eq!(plan.pagination, Pagination::new(40, 20));
    }

    #[test]
    fn test_non_numeric_pagination_falls_back() {
        let plan = plan(&[("page", "abc"), ("limit", "lots")]);
        assert_eq!(plan.pagination, Pagination::new(0, 100));
    }

    #[test]
    fn test_non_positive_pagination_clamped() {
        let plan = plan(&[("page", "0"), ("limit", "-5")]);
        assert_eq!(plan.pagination, Pagination::new(0, 1));
    }

    #[test]
    fn test_limit_capped_at_max() {
        let plan = plan(&[("limit", "999999")]);
        assert_eq!(plan.pagination.limit, options().max_limit);
    }

    #[test]
    fn test_value_coercion() {
        assert_eq!(coerce_value("5"), Value::from(5));
        assert_eq!(coerce_value("4.5"), Value::from(4.5));
        assert_eq!(coerce_value("true"), Value::from(true));
        assert_eq!(coerce_value("easy"), Value::from("easy"));
    }

    #[test]
    fn test_scenario_query() {
        // ?difficulty=easy&duration[gte]=5&sort=price&limit=2&page=1
        let plan = plan(&[
            ("difficulty", "easy"),
            ("duration[gte]", "5"),
            ("sort", "price"),
            ("limit", "2"),
            ("page", "1"),
        ]);
        assert_eq!(
            plan.filters,
            vec![
                FilterCondition::eq("difficulty", "easy"),
                FilterCondition::gte("duration", 5),
            ]
        );
        assert_eq!(plan.sort, vec![SortKey::asc("price")]);
        assert_eq!(plan.pagination, Pagination::new(0, 2));
    }
}
