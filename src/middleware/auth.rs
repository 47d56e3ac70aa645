//! Bearer-token verification and role gates
//!
//! `protect` runs as a `route_layer` on everything behind a login: it
//! verifies the token, re-reads the account from the store, and parks the
//! document in request extensions as [`CurrentUser`]. The role gates run
//! after it and only read that extension.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use serde_json::{Map, Value};

use crate::auth::extract_bearer;
use crate::error::{Error, Result};
use crate::models::{Resource, User};
use crate::state::AppState;
use crate::store::ID_FIELD;

/// The verified account document for this request
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Map<String, Value>);

impl CurrentUser {
    /// The account's document id
    pub fn id(&self) -> Result<String> {
        self.0
            .get(ID_FIELD)
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| Error::Internal("Current user document has no id".to_string()))
    }

    /// The account's role
    pub fn role(&self) -> &str {
        self.0.get("role").and_then(Value::as_str).unwrap_or("user")
    }
}

/// Require a valid bearer token issued to a live account
pub async fn protect(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response> {
    let token = extract_bearer(req.headers())?;
    let claims = state.tokens.verify(token)?;

    let user = state
        .store
        .get(User::COLLECTION, &claims.sub)
        .await
        .filter(|doc| doc.get("active") != Some(&Value::Bool(false)))
        .ok_or_else(|| {
            Error::Unauthorized(
                "The user belonging to this token no longer exists".to_string(),
            )
        })?;

    // A password change after issuance revokes the token
    if let Some(changed_at) = user.get("password_changed_at").and_then(Value::as_i64) {
        if changed_at > claims.iat {
            return Err(Error::Unauthorized(
                "Password was recently changed. Please log in again".to_string(),
            ));
        }
    }

    req.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(req).await)
}

/// Reject the request unless the current user's role is one of `roles`
pub async fn require_role(roles: &[&str], req: Request, next: Next) -> Result<Response> {
    let current = req
        .extensions()
        .get::<CurrentUser>()
        .ok_or_else(|| Error::Internal("Role gate ran without a current user".to_string()))?;
    if !roles.contains(&current.role()) {
        return Err(Error::Forbidden(
            "You do not have permission to perform this action".to_string(),
        ));
    }
    Ok(next.run(req).await)
}

/// Gate for `admin` only
pub async fn admin_only(req: Request, next: Next) -> Result<Response> {
    require_role(&["admin"], req, next).await
}

/// Gate for tour management: `admin` and `lead-guide`
pub async fn staff_only(req: Request, next: Next) -> Result<Response> {
    require_role(&["admin", "lead-guide"], req, next).await
}

/// Gate for planning views: staff plus plain `guide`
pub async fn guides_and_staff(req: Request, next: Next) -> Result<Response> {
    require_role(&["admin", "lead-guide", "guide"], req, next).await
}

/// Gate for review authorship: plain `user` accounts
pub async fn users_only(req: Request, next: Next) -> Result<Response> {
    require_role(&["user"], req, next).await
}

/// Gate for review edits: the authoring role plus `admin`
pub async fn users_and_admins(req: Request, next: Next) -> Result<Response> {
    require_role(&["user", "admin"], req, next).await
}
