use std::sync::OnceLock;

use argon2::Argon2;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("failed to gather salt entropy")]
    Entropy,
    #[error("failed to hash password: {0}")]
    Hash(String),
}

/// Hash a new password into an Argon2id PHC string with a random 128-bit salt.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let mut bytes = [0u8; 16];
    getrandom::fill(&mut bytes).map_err(|_| PasswordError::Entropy)?;
    let salt = SaltString::encode_b64(&bytes).map_err(|e| PasswordError::Hash(e.to_string()))?;

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::Hash(e.to_string()))?;
    Ok(hash.to_string())
}

/// Check a login password against a stored Argon2 PHC string.
///
/// An unparsable stored hash counts as a mismatch.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let parsed = match PasswordHash::new(stored_hash) {
        Ok(parsed) => parsed,
        Err(err) => {
            tracing::warn!(error = %err, "stored password hash is not a valid PHC string");
            return false;
        }
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Spend one full verification on a login that has no stored hash (unknown
/// username), so it costs the same as a wrong password. Always `false`.
pub fn verify_without_account(password: &str) -> bool {
    static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();

    match DUMMY_HASH.get_or_init(|| hash_password("no-such-account").ok()) {
        Some(hash) => {
            let _ = verify_password(password, hash);
        }
        None => tracing::error!("could not prepare dummy password hash"),
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::default_password_hash;

    #[test]
    fn accepts_matching_password() {
        assert!(verify_password("password", default_password_hash()));
    }

    #[test]
    fn rejects_wrong_password() {
        assert!(!verify_password("Password", default_password_hash()));
        assert!(!verify_password("", default_password_hash()));
    }

    #[test]
    fn rejects_garbage_hash() {
        assert!(!verify_password("password", "plaintext"));
    }

    #[test]
    fn new_hashes_are_salted_and_verifiable() {
        let first = hash_password("s3cret!").unwrap();
        let second = hash_password("s3cret!").unwrap();

        assert!(first.starts_with("$argon2id$"));
        assert_ne!(first, second);
        assert!(verify_password("s3cret!", &first));
        assert!(!verify_password("s3cret?", &second));
    }

    #[test]
    fn account_less_verification_never_succeeds() {
        assert!(!verify_without_account("no-such-account"));
        assert!(!verify_without_account("password"));
    }
}
