//! Password hashing using Argon2id
//!
//! PHC string format hashes; verification is constant-time.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as Argon2Hasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::error::{Error, Result};

/// Password hasher using Argon2id with the library's recommended
/// parameters
#[derive(Clone)]
pub struct PasswordHasher {
    min_password_length: usize,
}

impl PasswordHasher {
    /// Create a hasher enforcing the given minimum password length
    pub fn new(min_password_length: usize) -> Self {
        Self {
            min_password_length,
        }
    }

    /// Hash a password into PHC string format
    pub fn hash(&self, password: &str) -> Result<String> {
        if password.chars().count() < self.min_password_length {
            return Err(Error::Validation(format!(
                "Password must be at least {} characters",
                self.min_password_length
            )));
        }

        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| Error::Internal(format!("Failed to hash password: {}", e)))?;

        Ok(hash.to_string())
    }

    /// Verify a password against a stored hash
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| Error::Internal(format!("Invalid password hash format: {}", e)))?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(Error::Internal(format!(
                "Password verification failed: {}",
                e
            ))),
        }
    }
}
