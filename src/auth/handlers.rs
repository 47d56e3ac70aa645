//! Account endpoints: signup, login, password recovery, and the
//! `/users/me` self-service routes
//!
//! These sit outside the generic CRUD factory because they touch
//! credentials. Passwords only ever enter the store as Argon2id hashes,
//! and the factory's hidden-field scrub keeps them out of responses.

use axum::extract::{Path, State};
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use http::StatusCode;
use serde_json::{json, Map, Value};

use super::tokens::{hash_reset_token, ResetToken};
use crate::error::{Error, Result};
use crate::handlers::factory::body_object;
use crate::handlers::response::Envelope;
use crate::middleware::CurrentUser;
use crate::models::{Resource, User};
use crate::state::AppState;
use crate::store::{FilterCondition, QueryPlan, VERSION_FIELD};

type Document = Map<String, Value>;

/// Fields an account holder may change through `/users/update-me`
const SELF_SERVICE_FIELDS: &[&str] = &["name", "email"];

/// `POST /users/signup`: create an account and log it in
pub async fn signup(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>)> {
    let mut doc = body_object(body)?;

    let password = take_confirmed_password(&mut doc)?;
    let password_hash = state.hasher.hash(&password)?;

    // The role is never client-assigned at signup
    doc.remove("role");
    doc.remove("active");
    User::apply_defaults(&mut doc);
    doc.insert("password".to_string(), Value::String(password_hash));

    User::validate(&doc)
        .map_err(|messages| Error::Validation(format!("Invalid input data. {}", messages.join(". "))))?;

    let user = state
        .store
        .insert(User::COLLECTION, doc, User::UNIQUE_GROUPS)
        .await?;

    token_response(&state, StatusCode::CREATED, user)
}

/// `POST /users/login`: exchange credentials for a token
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>)> {
    let doc = body_object(body)?;
    let (Some(email), Some(password)) = (
        doc.get("email").and_then(Value::as_str),
        doc.get("password").and_then(Value::as_str),
    ) else {
        return Err(Error::BadRequest(
            "Please provide email and password".to_string(),
        ));
    };

    let incorrect = || Error::Unauthorized("Incorrect email or password".to_string());

    let user = find_active_by(&state, FilterCondition::eq("email", email))
        .await
        .ok_or_else(incorrect)?;
    let hash = user
        .get("password")
        .and_then(Value::as_str)
        .ok_or_else(incorrect)?;
    if !state.hasher.verify(password, hash)? {
        return Err(incorrect());
    }

    token_response(&state, StatusCode::OK, user)
}

/// `POST /users/forgot-password`: issue a reset token.
///
/// Outbound mail is out of scope here, so the plain token rides back in
/// the response body for the caller to deliver.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>> {
    let doc = body_object(body)?;
    let email = doc
        .get("email")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::BadRequest("Please provide an email address".to_string()))?;

    let user = find_active_by(&state, FilterCondition::eq("email", email))
        .await
        .ok_or_else(|| {
            Error::NotFound("There is no user with that email address".to_string())
        })?;
    let id = user_id(&user)?;

    let reset = ResetToken::generate(state.config.auth.reset_token_ttl_secs);
    let fields = doc_from(json!({
        "password_reset_token": reset.hash,
        "password_reset_expires": reset.expires_at.to_rfc3339(),
    }));
    state.store.patch(User::COLLECTION, &id, fields).await?;

    Ok(Json(json!({
        "status": "success",
        "message": "Token sent to email",
        "reset_token": reset.token,
    })))
}

/// `PATCH /users/reset-password/{token}`: set a new password with a
/// valid reset token and log the account in
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>)> {
    let mut doc = body_object(body)?;
    let password = take_confirmed_password(&mut doc)?;

    let invalid = || Error::BadRequest("Token is invalid or has expired".to_string());

    let hashed = hash_reset_token(&token);
    let user = find_active_by(&state, FilterCondition::eq("password_reset_token", hashed))
        .await
        .ok_or_else(invalid)?;

    let expires = user
        .get("password_reset_expires")
        .and_then(Value::as_str)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .ok_or_else(invalid)?;
    if expires < Utc::now() {
        return Err(invalid());
    }

    let id = user_id(&user)?;
    let user = rotate_password(&state, &id, &password).await?;

    token_response(&state, StatusCode::OK, user)
}

/// `PATCH /users/update-my-password`: change the password of the
/// logged-in account
pub async fn update_password(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>)> {
    let mut doc = body_object(body)?;
    let current_password = doc
        .get("password_current")
        .and_then(Value::as_str)
        .map(String::from)
        .ok_or_else(|| Error::BadRequest("Please provide your current password".to_string()))?;
    let password = take_confirmed_password(&mut doc)?;

    let id = current.id()?;
    // Read back the stored hash rather than trusting the extension copy
    let user = state
        .store
        .get(User::COLLECTION, &id)
        .await
        .ok_or_else(|| Error::Unauthorized("Incorrect email or password".to_string()))?;
    let hash = user
        .get("password")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Internal("Account has no stored password".to_string()))?;
    if !state.hasher.verify(&current_password, hash)? {
        return Err(Error::Unauthorized(
            "Your current password is wrong".to_string(),
        ));
    }

    let user = rotate_password(&state, &id, &password).await?;
    token_response(&state, StatusCode::OK, user)
}

/// `GET /users/me`: the logged-in account's own document
pub async fn get_me(
    Extension(current): Extension<CurrentUser>,
) -> Result<(StatusCode, Json<Envelope>)> {
    let mut doc = current.0;
    scrub_user(&mut doc);
    Ok((StatusCode::OK, Json(Envelope::item(doc))))
}

/// `PATCH /users/update-me`: change name or email; anything
/// credential-shaped is rejected outright
pub async fn update_me(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Envelope>)> {
    let patch = body_object(body)?;
    if patch.contains_key("password") || patch.contains_key("password_confirm") {
        return Err(Error::BadRequest(
            "This route is not for password updates. Please use /update-my-password".to_string(),
        ));
    }

    let id = current.id()?;
    let mut merged = state
        .store
        .get(User::COLLECTION, &id)
        .await
        .ok_or_else(|| Error::NotFound("No document found with that ID".to_string()))?;
    for (key, value) in patch {
        if SELF_SERVICE_FIELDS.contains(&key.as_str()) {
            merged.insert(key, value);
        }
    }
    User::validate(&merged)
        .map_err(|messages| Error::Validation(format!("Invalid input data. {}", messages.join(". "))))?;

    let mut updated = state
        .store
        .replace(User::COLLECTION, &id, merged, User::UNIQUE_GROUPS)
        .await?;
    scrub_user(&mut updated);
    Ok((StatusCode::OK, Json(Envelope::item(updated))))
}

/// `DELETE /users/delete-me`: soft-delete the logged-in account
pub async fn delete_me(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<StatusCode> {
    let id = current.id()?;
    let fields = doc_from(json!({"active": false}));
    state.store.patch(User::COLLECTION, &id, fields).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /users` is deliberately not a thing
pub async fn create_user_not_defined() -> Result<StatusCode> {
    Err(Error::BadRequest(
        "This route is not defined. Please use /signup instead".to_string(),
    ))
}

/// Pull `password`/`password_confirm` out of the body, checking they
/// agree
fn take_confirmed_password(doc: &mut Document) -> Result<String> {
    let password = doc
        .remove("password")
        .and_then(|v| v.as_str().map(String::from))
        .ok_or_else(|| Error::BadRequest("Please provide a password".to_string()))?;
    let confirm = doc
        .remove("password_confirm")
        .and_then(|v| v.as_str().map(String::from))
        .ok_or_else(|| Error::BadRequest("Please confirm your password".to_string()))?;
    if password != confirm {
        return Err(Error::BadRequest("Passwords do not match".to_string()));
    }
    Ok(password)
}

/// Store a fresh hash and stamp `password_changed_at`, invalidating
/// every previously issued token
async fn rotate_password(state: &AppState, id: &str, password: &str) -> Result<Document> {
    let password_hash = state.hasher.hash(password)?;
    // Backdate a second so a token issued in the same second stays valid
    let changed_at = Utc::now().timestamp() - 1;
    let fields = doc_from(json!({
        "password": password_hash,
        "password_changed_at": changed_at,
        "password_reset_token": null,
        "password_reset_expires": null,
    }));
    let user = state.store.patch(User::COLLECTION, id, fields).await?;
    Ok(user)
}

/// Find the one active user matching `condition`
async fn find_active_by(state: &AppState, condition: FilterCondition) -> Option<Document> {
    let mut filters = User::scope_filters();
    filters.push(condition);
    state
        .store
        .find(User::COLLECTION, &QueryPlan::filtered(filters))
        .await
        .into_iter()
        .next()
}

/// 200/201 with a freshly signed token and the scrubbed user document
fn token_response(
    state: &AppState,
    status: StatusCode,
    mut user: Document,
) -> Result<(StatusCode, Json<Value>)> {
    let id = user_id(&user)?;
    let token = state.tokens.sign(&id)?;
    scrub_user(&mut user);
    Ok((
        status,
        Json(json!({
            "status": "success",
            "token": token,
            "data": { "user": user },
        })),
    ))
}

fn user_id(user: &Document) -> Result<String> {
    user.get(crate::store::ID_FIELD)
        .and_then(Value::as_str)
        .map(String::from)
        .ok_or_else(|| Error::Internal("Stored user document has no id".to_string()))
}

fn scrub_user(doc: &mut Document) {
    doc.remove(VERSION_FIELD);
    for field in User::HIDDEN_FIELDS {
        doc.remove(*field);
    }
}

fn doc_from(value: Value) -> Document {
    match value {
        Value::Object(doc) => doc,
        _ => Document::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn state() -> AppState {
        AppState::new(Config::default()).expect("test state")
    }

    fn signup_body(email: &str) -> Value {
        json!({
            "name": "Ada Lovelace",
            "email": email,
            "password": "pass1234",
            "password_confirm": "pass1234",
        })
    }

    async fn signed_up(state: &AppState, email: &str) -> Value {
        let (_, Json(body)) = signup(State(state.clone()), Json(signup_body(email)))
            .await
            .unwrap();
        body
    }

    #[tokio::test]
    async fn test_signup_hides_credentials_and_issues_token() {
        let state = state();
        let body = signed_up(&state, "ada@example.com").await;

        assert_eq!(body["status"], json!("success"));
        assert!(body["token"].as_str().is_some());
        let user = &body["data"]["user"];
        assert_eq!(user["role"], json!("user"));
        assert!(user.get("password").is_none());
        assert!(user.get("active").is_none());

        // The stored document carries the hash, not the plain password
        let id = user["id"].as_str().unwrap();
        let stored = state.store.get("users", id).await.unwrap();
        let hash = stored["password"].as_str().unwrap();
        assert!(hash.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn test_signup_ignores_client_role() {
        let state = state();
        let mut body = signup_body("ada@example.com");
        body["role"] = json!("admin");
        let (_, Json(body)) = signup(State(state), Json(body)).await.unwrap();
        assert_eq!(body["data"]["user"]["role"], json!("user"));
    }

    #[tokio::test]
    async fn test_signup_password_mismatch() {
        let state = state();
        let mut body = signup_body("ada@example.com");
        body["password_confirm"] = json!("different1");
        let err = signup(State(state), Json(body)).await.unwrap_err();
        assert!(matches!(err, Error::BadRequest(ref m) if m == "Passwords do not match"));
    }

    #[tokio::test]
    async fn test_signup_duplicate_email_conflicts() {
        let state = state();
        signed_up(&state, "ada@example.com").await;
        let err = signup(State(state), Json(signup_body("ada@example.com")))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn test_login_happy_path_and_rejections() {
        let state = state();
        signed_up(&state, "ada@example.com").await;

        let (status, Json(body)) = login(
            State(state.clone()),
            Json(json!({"email": "ada@example.com", "password": "pass1234"})),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::OK);
        assert!(body["token"].as_str().is_some());

        let err = login(
            State(state.clone()),
            Json(json!({"email": "ada@example.com", "password": "wrong123"})),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));

        let err = login(
            State(state.clone()),
            Json(json!({"email": "nobody@example.com", "password": "pass1234"})),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));

        let err = login(State(state), Json(json!({"email": "ada@example.com"})))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_forgot_then_reset_password() {
        let state = state();
        signed_up(&state, "ada@example.com").await;

        let Json(body) = forgot_password(
            State(state.clone()),
            Json(json!({"email": "ada@example.com"})),
        )
        .await
        .unwrap();
        let token = body["reset_token"].as_str().unwrap().to_string();

        let (status, Json(body)) = reset_password(
            State(state.clone()),
            Path(token.clone()),
            Json(json!({"password": "newpass99", "password_confirm": "newpass99"})),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::OK);
        assert!(body["token"].as_str().is_some());

        // Token is single use
        let err = reset_password(
            State(state.clone()),
            Path(token),
            Json(json!({"password": "another99", "password_confirm": "another99"})),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));

        // Old password no longer works, new one does
        assert!(login(
            State(state.clone()),
            Json(json!({"email": "ada@example.com", "password": "pass1234"})),
        )
        .await
        .is_err());
        assert!(login(
            State(state),
            Json(json!({"email": "ada@example.com", "password": "newpass99"})),
        )
        .await
        .is_ok());
    }

    #[tokio::test]
    async fn test_forgot_password_unknown_email() {
        let state = state();
        let err = forgot_password(State(state), Json(json!({"email": "nobody@example.com"})))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(ref m) if m.contains("no user")));
    }

    #[tokio::test]
    async fn test_update_password_requires_current() {
        let state = state();
        let body = signed_up(&state, "ada@example.com").await;
        let id = body["data"]["user"]["id"].as_str().unwrap();
        let stored = state.store.get("users", id).await.unwrap();
        let current = CurrentUser(stored);

        let err = update_password(
            State(state.clone()),
            Extension(current.clone()),
            Json(json!({
                "password_current": "wrong999",
                "password": "newpass99",
                "password_confirm": "newpass99",
            })),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Unauthorized(ref m) if m.contains("current password")));

        let (status, _) = update_password(
            State(state),
            Extension(current),
            Json(json!({
                "password_current": "pass1234",
                "password": "newpass99",
                "password_confirm": "newpass99",
            })),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_update_me_rejects_password_and_filters_fields() {
        let state = state();
        let body = signed_up(&state, "ada@example.com").await;
        let id = body["data"]["user"]["id"].as_str().unwrap().to_string();
        let stored = state.store.get("users", &id).await.unwrap();
        let current = CurrentUser(stored);

        let err = update_me(
            State(state.clone()),
            Extension(current.clone()),
            Json(json!({"password": "sneaky999"})),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::BadRequest(ref m) if m.contains("update-my-password")));

        let (_, Json(envelope)) = update_me(
            State(state.clone()),
            Extension(current),
            Json(json!({"name": "Countess Ada", "role": "admin"})),
        )
        .await
        .unwrap();
        let updated = serde_json::to_value(&envelope).unwrap()["data"]["data"].clone();
        assert_eq!(updated["name"], json!("Countess Ada"));
        // Role change ignored rather than applied
        assert_eq!(updated["role"], json!("user"));
    }

    #[tokio::test]
    async fn test_delete_me_soft_deletes() {
        let state = state();
        let body = signed_up(&state, "ada@example.com").await;
        let id = body["data"]["user"]["id"].as_str().unwrap().to_string();
        let stored = state.store.get("users", &id).await.unwrap();

        let status = delete_me(State(state.clone()), Extension(CurrentUser(stored)))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);

        // Gone from logins, still present in the store
        assert!(login(
            State(state.clone()),
            Json(json!({"email": "ada@example.com", "password": "pass1234"})),
        )
        .await
        .is_err());
        assert!(state.store.get("users", &id).await.is_some());
    }
}
