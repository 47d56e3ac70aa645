//! Access tokens (HS256 JWT) and password-reset tokens
//!
//! Reset tokens are single-use random values mailed (in principle) to the
//! account holder; only their blake3 hash is persisted.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use http::HeaderMap;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Access token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user's document id
    pub sub: String,
    /// Issued-at, unix seconds
    pub iat: i64,
    /// Expiry, unix seconds
    pub exp: i64,
}

/// Signs and verifies access tokens
#[derive(Clone)]
pub struct TokenSigner {
    encoding_key: Arc<EncodingKey>,
    decoding_key: Arc<DecodingKey>,
    validation: Validation,
    ttl_secs: u64,
}

impl TokenSigner {
    /// Create a signer over an HS256 secret
    pub fn new(secret: &str, ttl_secs: u64) -> Self {
        Self {
            encoding_key: Arc::new(EncodingKey::from_secret(secret.as_bytes())),
            decoding_key: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
            validation: Validation::new(Algorithm::HS256),
            ttl_secs,
        }
    }

    /// Issue a token for the given user id
    pub fn sign(&self, user_id: &str) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now,
            exp: now + self.ttl_secs as i64,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        Ok(token)
    }

    /// Verify a token and return its claims
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(token_data.claims)
    }
}

/// Pull the bearer token out of the Authorization header
pub fn extract_bearer(headers: &HeaderMap) -> Result<&str> {
    let unauthorized =
        || Error::Unauthorized("You are not logged in. Please log in to get access".to_string());

    let header = headers
        .get(http::header::AUTHORIZATION)
        .ok_or_else(unauthorized)?
        .to_str()
        .map_err(|_| unauthorized())?;

    header.strip_prefix("Bearer ").ok_or_else(unauthorized)
}

/// A freshly generated password-reset token: the plain value for the
/// account holder, the hash and expiry for the store
#[derive(Debug, Clone)]
pub struct ResetToken {
    /// Plain token handed to the account holder
    pub token: String,
    /// blake3 hash persisted on the user document
    pub hash: String,
    /// When the token stops being honored
    pub expires_at: DateTime<Utc>,
}

impl ResetToken {
    /// Generate a reset token valid for `ttl_secs`
    pub fn generate(ttl_secs: u64) -> Self {
        let token = Uuid::new_v4().simple().to_string();
        Self {
            hash: hash_reset_token(&token),
            expires_at: Utc::now() + Duration::seconds(ttl_secs as i64),
            token,
        }
    }
}

/// Hash a plain reset token the way it is persisted
pub fn hash_reset_token(token: &str) -> String {
    blake3::hash(token.as_bytes()).to_hex().to_string()
}
