use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

use crate::error::AppError;

const MAX_PASSWORD_BYTES: usize = 1024;

/// Reject passwords we refuse to hash at all.
pub fn check_password_input(raw: &str) -> Result<(), AppError> {
    if raw.is_empty() {
        return Err(AppError::InvalidArgument("Password is required.".into()));
    }
    if raw.len() > MAX_PASSWORD_BYTES {
        return Err(AppError::InvalidArgument("Password is too long.".into()));
    }
    Ok(())
}

/// Argon2id hash with a fresh random salt, in PHC string form.
pub fn hash_password(raw: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(raw.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            AppError::Internal(anyhow::anyhow!("hash password: {e}"))
        })?
        .to_string();
    Ok(hash)
}

/// Constant-time check of `raw` against a stored PHC hash.
///
/// A stored value that does not parse as a PHC string is an internal error,
/// never a match.
pub fn verify_password(raw: &str, stored_hash: &str) -> Result<bool, AppError> {
    let parsed = PasswordHash::new(stored_hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        AppError::Internal(anyhow::anyhow!("parse stored hash: {e}"))
    })?;
    Ok(Argon2::default()
        .verify_password(raw.as_bytes(), &parsed)
        .is_ok())
}
