//! Private-access secret hashing and verification using Argon2.
//!
//! Uses the argon2id variant with default parameters. The stored hash is a
//! PHC-formatted string carrying its own salt and parameters; a public
//! consensus stores the empty string instead.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::types::ConclaveError;

/// Hash an access secret, returning the PHC-formatted hash string.
pub fn hash_secret(secret: &str) -> Result<String, ConclaveError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(secret.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ConclaveError::Crypto(format!("Failed to hash secret: {e}")))
}

/// Verify a supplied secret against a stored hash.
///
/// An empty stored hash (public consensus) never verifies.
pub fn verify_secret(secret: &str, hash: &str) -> Result<bool, ConclaveError> {
    if hash.is_empty() {
        return Ok(false);
    }

    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| ConclaveError::Crypto(format!("Invalid secret hash format: {e}")))?;

    Ok(Argon2::default()
        .verify_password(secret.as_bytes(), &parsed_hash)
        .is_ok())
}
