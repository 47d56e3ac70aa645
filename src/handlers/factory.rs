//! Generic CRUD handler factory
//!
//! Five handlers parameterized by [`Resource`], registered per entity with
//! a turbofish (`get(get_all::<Tour>)`). Each delegates storage failures
//! and validation errors to the centralized error stage; nothing here
//! renders a failure inline.
//!
//! The `*_resource` functions carry the actual logic so route-specific
//! wrappers (nested reviews, preset aliases, `/users/me`) can reuse it
//! with extra filters or a prefilled document.

use axum::extract::{Path, Query, State};
use axum::Json;
use http::StatusCode;
use serde_json::{Map, Value};

use super::query::QueryBuilder;
use super::response::Envelope;
use crate::error::{Error, Result};
use crate::models::{Relation, Resource};
use crate::state::AppState;
use crate::store::{
    DocumentStore, FilterCondition, Projection, QueryPlan, StoreError, StoreOperation,
    CREATED_AT_FIELD, ID_FIELD, UPDATED_AT_FIELD, VERSION_FIELD,
};

type Document = Map<String, Value>;

/// `POST /{collection}`: 201 with the created document
pub async fn create_one<R: Resource>(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Envelope>)> {
    let doc = body_object(body)?;
    insert_resource::<R>(&state, doc).await
}

/// `GET /{collection}/{id}`: 200, relations expanded inline
pub async fn get_one<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<Envelope>)> {
    let mut doc = fetch_visible::<R>(&state, &id).await?;
    expand_has_many::<R>(&state.store, &mut doc).await;
    expand_belongs_to::<R>(&state.store, &mut doc).await;
    scrub::<R>(&mut doc);
    Ok((StatusCode::OK, Json(Envelope::item(doc))))
}

/// `GET /{collection}`: 200 with result count
pub async fn get_all<R: Resource>(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<(StatusCode, Json<Envelope>)> {
    list_resource::<R>(&state, &params, Vec::new()).await
}

/// `PATCH /{collection}/{id}`: 200 with the updated document
pub async fn update_one<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Envelope>)> {
    let patch = body_object(body)?;
    update_resource::<R>(&state, &id, patch).await
}

/// `DELETE /{collection}/{id}`: 204, empty body
pub async fn delete_one<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let removed = state.store.delete(R::COLLECTION, &id).await?;
    R::after_change(&state.store, &removed).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List documents, with implicit parent filters prepended before the
/// query builder runs (nested routes, preset aliases)
pub async fn list_resource<R: Resource>(
    state: &AppState,
    params: &[(String, String)],
    parent_filters: Vec<FilterCondition>,
) -> Result<(StatusCode, Json<Envelope>)> {
    let mut base = R::scope_filters();
    base.extend(parent_filters);

    let plan = QueryBuilder::new(params, &state.config.query)
        .with_filters(base)
        .filter()?
        .sort()
        .project()
        .paginate()
        .build();
    check_projection::<R>(&plan.projection)?;

    let mut docs = state.store.find(R::COLLECTION, &plan).await;
    for doc in &mut docs {
        expand_belongs_to::<R>(&state.store, doc).await;
        scrub::<R>(doc);
    }

    Ok((StatusCode::OK, Json(Envelope::list(docs))))
}

/// Default, validate, and insert a document
pub async fn insert_resource<R: Resource>(
    state: &AppState,
    mut doc: Document,
) -> Result<(StatusCode, Json<Envelope>)> {
    strip_bookkeeping(&mut doc);
    R::apply_defaults(&mut doc);
    validated::<R>(&doc)?;

    let mut created = state
        .store
        .insert(R::COLLECTION, doc, R::UNIQUE_GROUPS)
        .await?;
    R::after_change(&state.store, &created).await?;

    scrub::<R>(&mut created);
    Ok((StatusCode::CREATED, Json(Envelope::item(created))))
}

/// Patch semantics: merge over the stored document, re-validate the
/// merged result, re-check unique groups
pub async fn update_resource<R: Resource>(
    state: &AppState,
    id: &str,
    mut patch: Document,
) -> Result<(StatusCode, Json<Envelope>)> {
    strip_bookkeeping(&mut patch);

    let previous = state.store.get(R::COLLECTION, id).await.ok_or_else(|| {
        Error::from(StoreError::not_found(
            StoreOperation::Update,
            R::COLLECTION,
            id,
        ))
    })?;
    let mut merged = previous.clone();
    for (key, value) in patch {
        merged.insert(key, value);
    }
    validated::<R>(&merged)?;

    let mut updated = state
        .store
        .replace(R::COLLECTION, id, merged, R::UNIQUE_GROUPS)
        .await?;
    // The pre-update document is reported too, so a reparented child
    // refreshes the aggregates of the owner it left behind
    R::after_change(&state.store, &previous).await?;
    R::after_change(&state.store, &updated).await?;

    scrub::<R>(&mut updated);
    Ok((StatusCode::OK, Json(Envelope::item(updated))))
}

/// Fetch a document by id, treating anything outside the entity's scope
/// filters as absent
pub async fn fetch_visible<R: Resource>(state: &AppState, id: &str) -> Result<Document> {
    state
        .store
        .get(R::COLLECTION, id)
        .await
        .filter(|doc| R::scope_filters().iter().all(|f| f.matches(doc)))
        .ok_or_else(|| {
            Error::from(StoreError::not_found(
                StoreOperation::Get,
                R::COLLECTION,
                id,
            ))
        })
}

/// Interpret a request body as a JSON object
pub fn body_object(body: Value) -> Result<Document> {
    match body {
        Value::Object(doc) => Ok(doc),
        _ => Err(Error::BadRequest("Expected a JSON object body".to_string())),
    }
}

/// An include projection may only name fields the entity declares
fn check_projection<R: Resource>(projection: &Projection) -> Result<()> {
    if let Projection::Include(fields) = projection {
        for field in fields {
            if !R::FIELDS.contains(&field.as_str()) {
                return Err(Error::BadRequest(format!(
                    "Unknown field '{}' for {}",
                    field,
                    R::NAME
                )));
            }
        }
    }
    Ok(())
}

/// Remove the response-invisible fields from an outgoing document
fn scrub<R: Resource>(doc: &mut Document) {
    doc.remove(VERSION_FIELD);
    for field in R::HIDDEN_FIELDS {
        doc.remove(*field);
    }
}

/// Drop store-owned fields from client input
fn strip_bookkeeping(doc: &mut Document) {
    doc.remove(ID_FIELD);
    doc.remove(CREATED_AT_FIELD);
    doc.remove(UPDATED_AT_FIELD);
    doc.remove(VERSION_FIELD);
}

fn validated<R: Resource>(doc: &Document) -> Result<()> {
    R::validate(doc).map_err(|messages| {
        Error::Validation(format!("Invalid input data. {}", messages.join(". ")))
    })
}

async fn expand_has_many<R: Resource>(store: &DocumentStore, doc: &mut Document) {
    let Some(id) = doc.get(ID_FIELD).and_then(Value::as_str).map(String::from) else {
        return;
    };
    for relation in R::RELATIONS {
        let Relation::HasMany {
            name,
            collection,
            foreign_key,
        } = relation
        else {
            continue;
        };
        let plan = QueryPlan::filtered(vec![FilterCondition::eq(*foreign_key, id.clone())]);
        let children: Vec<Value> = store
            .find(collection, &plan)
            .await
            .into_iter()
            .map(|mut child| {
                child.remove(VERSION_FIELD);
                Value::Object(child)
            })
            .collect();
        doc.insert((*name).to_string(), Value::Array(children));
    }
}

async fn expand_belongs_to<R: Resource>(store: &DocumentStore, doc: &mut Document) {
    for relation in R::RELATIONS {
        let Relation::BelongsTo {
            field,
            collection,
            fields,
        } = relation
        else {
            continue;
        };
        let Some(id) = doc.get(*field).and_then(Value::as_str).map(String::from) else {
            continue;
        };
        let Some(referenced) = store.get(collection, &id).await else {
            continue;
        };
        let mut embedded = Map::new();
        embedded.insert(ID_FIELD.to_string(), Value::String(id));
        for name in *fields {
            if let Some(value) = referenced.get(*name) {
                embedded.insert((*name).to_string(), value.clone());
            }
        }
        doc.insert((*field).to_string(), Value::Object(embedded));
    }
}
