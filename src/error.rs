//! Error types and HTTP response conversion
//!
//! Every failure in the request pipeline funnels into [`Error`] and is
//! rendered by one `IntoResponse` impl. Client errors (4xx) report
//! `status: "fail"`, server errors (5xx) report `status: "error"` and hide
//! their detail unless the development posture was enabled at startup.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use once_cell::sync::OnceCell;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Result type alias using the application error
pub type Result<T> = std::result::Result<T, Error>;

/// Whether 5xx responses carry the underlying message (development posture).
static EXPOSE_INTERNAL: OnceCell<bool> = OnceCell::new();

/// Set once at startup, before serving requests. Defaults to hidden.
pub fn set_error_exposure(expose: bool) {
    let _ = EXPOSE_INTERNAL.set(expose);
}

fn expose_internal() -> bool {
    *EXPOSE_INTERNAL.get().unwrap_or(&false)
}

/// Main error type for the application
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JWT error
    #[error("JWT error: {0}")]
    Jwt(Box<jsonwebtoken::errors::Error>),

    /// Authentication error
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// Authorization error
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Resource conflict (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Validation error (400)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Internal server error
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Error response body
///
/// The envelope every failure renders as: `status` is `fail` for client
/// errors and `error` for server errors.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Envelope status: `fail` (4xx) or `error` (5xx)
    pub status: &'static str,

    /// Human-readable message
    pub message: String,
}

impl ErrorBody {
    /// Create an error body for the given status code
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status: if status.is_server_error() {
                "error"
            } else {
                "fail"
            },
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthorized(_) | Error::Jwt(_) => StatusCode::UNAUTHORIZED,
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::BadRequest(_) | Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::Config(_) | Error::Io(_) | Error::Internal(_) | Error::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn client_message(&self) -> String {
        match self {
            // Token failures all read the same to the client
            Error::Jwt(_) => "Invalid token. Please log in again".to_string(),
            Error::Unauthorized(msg)
            | Error::Forbidden(msg)
            | Error::NotFound(msg)
            | Error::BadRequest(msg)
            | Error::Conflict(msg)
            | Error::Validation(msg) => msg.clone(),
            // Server errors hide detail unless exposure was enabled
            other => {
                if expose_internal() {
                    other.to_string()
                } else {
                    "Something went very wrong".to_string()
                }
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "request failed");
        }

        let body = ErrorBody::new(status, self.client_message());
        (status, Json(body)).into_response()
    }
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}

impl From<jsonwebtoken::errors::Error> for Error {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Error::Jwt(Box::new(err))
    }
}
