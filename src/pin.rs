//! PIN hashing and verification
//!
//! Argon2id PHC strings. Verification runs in constant time with respect
//! to the candidate PIN, so a mismatch cannot be distinguished by timing.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PinError {
    #[error("Failed to hash PIN: {0}")]
    Hash(String),

    #[error("Stored PIN hash is malformed: {0}")]
    MalformedHash(String),
}

/// Hash a PIN for storage on the account record
pub fn hash_pin(pin: &str) -> Result<String, PinError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(pin.as_bytes(), &salt)
        .map_err(|e| PinError::Hash(e.to_string()))?;
    Ok(hash.to_string())
}

/// Verify a candidate PIN against a stored PHC hash string.
///
/// Returns `Ok(false)` on mismatch; `Err` only if the stored hash itself
/// cannot be parsed.
pub fn verify_pin(pin: &str, pin_hash: &str) -> Result<bool, PinError> {
    let parsed = PasswordHash::new(pin_hash).map_err(|e| PinError::MalformedHash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(pin.as_bytes(), &parsed)
        .is_ok())
}
