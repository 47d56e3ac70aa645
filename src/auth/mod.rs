//! Authentication: password hashing, token signing, and the account
//! endpoints

pub mod handlers;
mod password;
mod tokens;

pub use password::PasswordHasher;
pub use tokens::{extract_bearer, hash_reset_token, Claims, ResetToken, TokenSigner};
