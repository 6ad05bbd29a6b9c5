//! bcrypt password hashes for account stores built on Keel.

use bcrypt::HashParts;

use super::AuthError;

pub const DEFAULT_COST: u32 = 10;

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    hash_with_cost(password, DEFAULT_COST)
}

/// `cost` must lie in bcrypt's 4..=31 range.
pub fn hash_with_cost(password: &str, cost: u32) -> Result<String, AuthError> {
    bcrypt::hash(password, cost).map_err(|e| AuthError::Internal(format!("password hash: {e}")))
}

/// A stored hash that cannot be parsed is an error, not a mismatch.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, AuthError> {
    bcrypt::verify(password, stored)
        .map_err(|e| AuthError::Internal(format!("password verify: {e}")))
}

/// True when `stored` was hashed below [`DEFAULT_COST`] and should be
/// replaced after the next successful login.
pub fn needs_rehash(stored: &str) -> Result<bool, AuthError> {
    let parts: HashParts = stored
        .parse()
        .map_err(|e| AuthError::Internal(format!("password hash parse: {e}")))?;
    Ok(parts.get_cost() < DEFAULT_COST)
}
