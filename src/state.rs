//! Shared application state

use std::sync::Arc;

use crate::auth::{PasswordHasher, TokenSigner};
use crate::config::Config;
use crate::error::Result;
use crate::store::DocumentStore;

/// State handed to every handler
#[derive(Clone)]
pub struct AppState {
    /// The document store backing all four collections
    pub store: DocumentStore,
    /// Loaded configuration
    pub config: Arc<Config>,
    /// Argon2id password hasher
    pub hasher: PasswordHasher,
    /// JWT signer/verifier
    pub tokens: TokenSigner,
}

impl AppState {
    /// Build state from configuration
    pub fn new(config: Config) -> Result<Self> {
        let hasher = PasswordHasher::new(config.auth.min_password_length);
        let tokens = TokenSigner::new(&config.auth.jwt_secret, config.auth.token_ttl_secs);

        Ok(Self {
            store: DocumentStore::new(),
            config: Arc::new(config),
            hasher,
            tokens,
        })
    }
}
