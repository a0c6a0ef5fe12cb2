//! Argon2id password hashing.

use crate::error::{NotesError, NotesResult};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};

const SALT_LEN: usize = 16;

/// Hash a password into a PHC string with a fresh random salt
pub fn hash_password(password: &SecretString) -> NotesResult<String> {
    let mut salt_bytes = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt_bytes);
    let salt =
        SaltString::encode_b64(&salt_bytes).map_err(|e| NotesError::Hashing(e.to_string()))?;

    Argon2::default()
        .hash_password(password.expose_secret().as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| NotesError::Hashing(e.to_string()))
}

/// Check a password against a stored PHC string.
///
/// An unparseable stored hash never verifies.
pub fn verify_password(password: &SecretString, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.expose_secret().as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!("stored password hash is unreadable: {}", e);
            false
        }
    }
}
