use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use tracing::warn;

use super::CredentialError;

/// Argon2id PHC string with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, CredentialError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(CredentialError::Hash)
}

/// A stored value that is not a valid PHC string never matches.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let parsed = match PasswordHash::new(stored_hash) {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!(error = %err, "stored password hash is malformed");
            return false;
        }
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::{hash_password, verify_password};

    #[test]
    fn same_password_gets_distinct_hashes_that_both_verify() {
        let first = hash_password("hunter2").unwrap();
        let second = hash_password("hunter2").unwrap();

        assert_ne!(first, second);
        assert!(verify_password("hunter2", &first));
        assert!(verify_password("hunter2", &second));
    }

    #[test]
    fn different_passwords_never_share_a_hash() {
        let a = hash_password("alpha").unwrap();
        let b = hash_password("bravo").unwrap();

        assert_ne!(a, b);
        assert!(!verify_password("alpha", &b));
    }

    #[test]
    fn hash_does_not_contain_plaintext() {
        let hash = hash_password("plaintext-password").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(!hash.contains("plaintext-password"));
    }

    #[test]
    fn malformed_stored_hash_never_verifies() {
        assert!(!verify_password("pw", "not-a-phc-string"));
        assert!(!verify_password("pw", ""));
    }
}
