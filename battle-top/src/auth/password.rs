//! Password and security-answer hashing using Argon2id

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::error::ApiError;

/// Hash a password using Argon2id
///
/// Returns the PHC-formatted hash string that includes the salt and parameters.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Auth(format!("Failed to hash password: {e}")))
}

/// Verify a password against a stored hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool, ApiError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| ApiError::Auth(format!("Invalid password hash format: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

fn normalize_answer(answer: &str) -> String {
    answer.trim().to_lowercase()
}

/// Security answers are compared case-insensitively, ignoring surrounding space
pub fn hash_security_answer(answer: &str) -> Result<String, ApiError> {
    hash_password(&normalize_answer(answer))
}

pub fn verify_security_answer(answer: &str, hash: &str) -> Result<bool, ApiError> {
    verify_password(&normalize_answer(answer), hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let password = "correct-horse-battery-staple";
        let hash = hash_password(password).unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(password, &hash).unwrap());
        assert!(!verify_password("wrong-password", &hash).unwrap());
    }

    #[test]
    fn test_different_salts() {
        let hash1 = hash_password("same-password").unwrap();
        let hash2 = hash_password("same-password").unwrap();
        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_invalid_hash_format() {
        assert!(verify_password("password", "not-a-valid-hash").is_err());
    }

    #[test]
    fn test_security_answer_normalized() {
        let hash = hash_security_answer("  Fluffy ").unwrap();
        assert!(verify_security_answer("fluffy", &hash).unwrap());
        assert!(verify_security_answer("FLUFFY", &hash).unwrap());
        assert!(!verify_security_answer("rex", &hash).unwrap());
    }
}
