//! In-memory document store
//!
//! Collections of untyped JSON documents keyed by string id. The store owns
//! the bookkeeping fields: it assigns `id` and `created_at` on insert and
//! maintains `updated_at` and the internal `_version` counter on every
//! write. Uniqueness is enforced per field group at write time; everything
//! else (validation, defaulting, visibility) belongs to the entity layer.

mod error;
mod filter;

pub use error::{StoreError, StoreErrorKind, StoreOperation};
pub use filter::{
    compare_values, FilterCondition, FilterOperator, OrderDirection, Pagination, Projection,
    SortKey,
};

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Document identifier field
pub const ID_FIELD: &str = "id";
/// Creation timestamp field (RFC 3339)
pub const CREATED_AT_FIELD: &str = "created_at";
/// Last-write timestamp field (RFC 3339)
pub const UPDATED_AT_FIELD: &str = "updated_at";
/// Internal write counter, excluded from responses by default
pub const VERSION_FIELD: &str = "_version";

type Document = Map<String, Value>;
type Collections = HashMap<String, BTreeMap<String, Document>>;

/// A fully-specified collection query: filter, sort, projection, pagination
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    /// Conditions a document must all satisfy
    pub filters: Vec<FilterCondition>,
    /// Ordering keys, applied in sequence
    pub sort: Vec<SortKey>,
    /// Field subset returned
    pub projection: Projection,
    /// Offset/limit window over the ordered result
    pub pagination: Pagination,
}

impl QueryPlan {
    /// A plan that returns every document matching `filters`, unordered
    /// and unprojected
    pub fn filtered(filters: Vec<FilterCondition>) -> Self {
        Self {
            filters,
            sort: Vec::new(),
            projection: Projection::All,
            pagination: Pagination::new(0, u64::MAX),
        }
    }
}

/// Shared in-memory document store
#[derive(Clone, Default)]
pub struct DocumentStore {
    collections: Arc<RwLock<Collections>>,
}

impl DocumentStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a document, assigning `id`/`created_at` when absent.
    ///
    /// `unique` is a list of field groups that must not collide with any
    /// existing document in the collection.
    pub async fn insert(
        &self,
        collection: &str,
        mut doc: Document,
        unique: &[&[&str]],
    ) -> Result<Document, StoreError> {
        let id = match doc.get(ID_FIELD).and_then(Value::as_str) {
            Some(id) => id.to_string(),
            None => {
                let id = Uuid::new_v4().to_string();
                doc.insert(ID_FIELD.to_string(), Value::String(id.clone()));
                id
            }
        };
        if !doc.contains_key(CREATED_AT_FIELD) {
            doc.insert(
                CREATED_AT_FIELD.to_string(),
                Value::String(Utc::now().to_rfc3339()),
            );
        }
        doc.insert(VERSION_FIELD.to_string(), Value::from(1));

        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();

        for group in unique {
            if Self::group_collides(docs, &doc, group, Some(&id)) {
                return Err(StoreError::already_exists(
                    StoreOperation::Insert,
                    collection,
                    group,
                ));
            }
        }
        if docs.contains_key(&id) {
            return Err(StoreError::already_exists(
                StoreOperation::Insert,
                collection,
                &[ID_FIELD],
            ));
        }

        docs.insert(id, doc.clone());
        Ok(doc)
    }

    /// Fetch a document by id
    pub async fn get(&self, collection: &str, id: &str) -> Option<Document> {
        let collections = self.collections.read().await;
        collections.get(collection)?.get(id).cloned()
    }

    /// Execute a query plan: filter, sort, paginate, project
    pub async fn find(&self, collection: &str, plan: &QueryPlan) -> Vec<Document> {
        let collections = self.collections.read().await;
        let Some(docs) = collections.get(collection) else {
            return Vec::new();
        };

        let mut matched: Vec<&Document> = docs
            .values()
            .filter(|doc| plan.filters.iter().all(|f| f.matches(doc)))
            .collect();

        if !plan.sort.is_empty() {
            matched.sort_by(|a, b| compare_docs(a, b, &plan.sort));
        }

        matched
            .into_iter()
            .skip(usize::try_from(plan.pagination.offset).unwrap_or(usize::MAX))
            .take(usize::try_from(plan.pagination.limit).unwrap_or(usize::MAX))
            .map(|doc| {
                let mut doc = doc.clone();
                plan.projection.apply(&mut doc);
                doc
            })
            .collect()
    }

    /// Replace a document wholesale, bumping `_version` and `updated_at`.
    ///
    /// `id` and `created_at` are preserved from the stored document.
    pub async fn replace(
        &self,
        collection: &str,
        id: &str,
        mut doc: Document,
        unique: &[&[&str]],
    ) -> Result<Document, StoreError> {
        let mut collections = self.collections.write().await;
        let docs = collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::not_found(StoreOperation::Update, collection, id))?;

        let existing = docs
            .get(id)
            .ok_or_else(|| StoreError::not_found(StoreOperation::Update, collection, id))?;

        doc.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
        if let Some(created) = existing.get(CREATED_AT_FIELD) {
            doc.insert(CREATED_AT_FIELD.to_string(), created.clone());
        }
        let version = existing
            .get(VERSION_FIELD)
            .and_then(Value::as_u64)
            .unwrap_or(0);
        doc.insert(VERSION_FIELD.to_string(), Value::from(version + 1));
        doc.insert(
            UPDATED_AT_FIELD.to_string(),
            Value::String(Utc::now().to_rfc3339()),
        );

        for group in unique {
            if Self::group_collides(docs, &doc, group, Some(id)) {
                return Err(StoreError::already_exists(
                    StoreOperation::Update,
                    collection,
                    group,
                ));
            }
        }

        docs.insert(id.to_string(), doc.clone());
        Ok(doc)
    }

    /// Merge individual fields into a document, bypassing entity
    /// validation. A `null` value removes the field.
    pub async fn patch(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
    ) -> Result<Document, StoreError> {
        let mut collections = self.collections.write().await;
        let doc = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| StoreError::not_found(StoreOperation::Update, collection, id))?;

        for (key, value) in fields {
            if key == ID_FIELD || key == CREATED_AT_FIELD || key == VERSION_FIELD {
                continue;
            }
            if value.is_null() {
                doc.remove(&key);
            } else {
                doc.insert(key, value);
            }
        }
        let version = doc.get(VERSION_FIELD).and_then(Value::as_u64).unwrap_or(0);
        doc.insert(VERSION_FIELD.to_string(), Value::from(version + 1));
        doc.insert(
            UPDATED_AT_FIELD.to_string(),
            Value::String(Utc::now().to_rfc3339()),
        );

        Ok(doc.clone())
    }

    /// Remove a document, returning it
    pub async fn delete(&self, collection: &str, id: &str) -> Result<Document, StoreError> {
        let mut collections = self.collections.write().await;
        collections
            .get_mut(collection)
            .and_then(|docs| docs.remove(id))
            .ok_or_else(|| StoreError::not_found(StoreOperation::Delete, collection, id))
    }

    /// Does another document already carry the candidate's values for
    /// every field in `group`?
    fn group_collides(
        docs: &BTreeMap<String, Document>,
        candidate: &Document,
        group: &[&str],
        exclude_id: Option<&str>,
    ) -> bool {
        let values: Vec<(&str, &Value)> = group
            .iter()
            .filter_map(|field| candidate.get(*field).map(|v| (*field, v)))
            .collect();
        if values.len() != group.len() {
            // Candidate doesn't set every field in the group
            return false;
        }

        docs.iter()
            .filter(|(id, _)| Some(id.as_str()) != exclude_id)
            .any(|(_, doc)| values.iter().all(|(field, v)| doc.get(*field) == Some(*v)))
    }
}

/// Order two documents by a sequence of sort keys.
///
/// Missing or incomparable values rank last in ascending order.
fn compare_docs(a: &Document, b: &Document, keys: &[SortKey]) -> Ordering {
    for key in keys {
        let ordering = match (a.get(&key.field), b.get(&key.field)) {
            (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        let ordering = match key.direction {
            OrderDirection::Ascending => ordering,
            OrderDirection::Descending => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}
