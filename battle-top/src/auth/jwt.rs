//! Session tokens
//!
//! Login hands back an HS256 token carrying the user id and role. The server
//! keeps no session table; a token is good until it expires.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use super::Role;
use crate::error::ApiError;

/// Payload stored in a session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Input for creating a new token
#[derive(Debug, Clone)]
pub struct TokenInput {
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
}

/// Result of token validation
#[derive(Debug)]
pub struct TokenValidationResult {
    pub valid: bool,
    pub claims: Option<Claims>,
    pub error: Option<String>,
}

impl TokenValidationResult {
    pub fn valid(claims: Claims) -> Self {
        Self {
            valid: true,
            claims: Some(claims),
            error: None,
        }
    }

    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            claims: None,
            error: Some(error.into()),
        }
    }
}

/// Signs and verifies session tokens
#[derive(Clone)]
pub struct JwtValidator {
    secret: String,
    expiry_seconds: u64,
}

impl JwtValidator {
    /// Returns an error if the secret is empty or shorter than 32 characters
    pub fn new(secret: String, expiry_seconds: u64) -> Result<Self, ApiError> {
        if secret.is_empty() {
            return Err(ApiError::Config(
                "auth.jwt_secret is required unless dev_mode is set".into(),
            ));
        }

        if secret.len() < 32 {
            return Err(ApiError::Config(
                "auth.jwt_secret must be at least 32 characters".into(),
            ));
        }

        Ok(Self {
            secret,
            expiry_seconds,
        })
    }

    /// Validator with a fixed secret, for local development only
    pub fn new_dev() -> Self {
        Self {
            secret: "dev-mode-secret-not-for-production-use-battle-top".into(),
            expiry_seconds: 7 * 24 * 60 * 60,
        }
    }

    pub fn expiry_seconds(&self) -> u64 {
        self.expiry_seconds
    }

    /// Sign a token for a logged-in user. Returns the token and its expiry.
    pub fn generate_token(&self, input: TokenInput) -> Result<(String, u64), ApiError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| ApiError::Auth(format!("System time error: {}", e)))?
            .as_secs();

        let claims = Claims {
            sub: input.user_id,
            email: input.email,
            name: input.name,
            role: input.role,
            iat: now,
            exp: now + self.expiry_seconds,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ApiError::Auth(format!("Failed to generate token: {}", e)))?;

        Ok((token, claims.exp))
    }

    /// Verify and decode a token
    pub fn verify_token(&self, token: &str) -> TokenValidationResult {
        match decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        ) {
            Ok(token_data) => TokenValidationResult::valid(token_data.claims),
            Err(err) => {
                use jsonwebtoken::errors::ErrorKind;
                let error_msg = match err.kind() {
                    ErrorKind::ExpiredSignature => "Token expired",
                    ErrorKind::InvalidToken => "Invalid token",
                    ErrorKind::InvalidSignature => "Invalid signature",
                    _ => "Token validation failed",
                };
                TokenValidationResult::invalid(error_msg)
            }
        }
    }
}

/// Extract token from Authorization header.
/// Supports "Bearer <token>" format and raw tokens.
pub fn extract_token_from_header(auth_header: Option<&str>) -> Option<&str> {
    let header = auth_header?;

    if let Some(token) = header.strip_prefix("Bearer ") {
        let token = token.trim();
        if !token.is_empty() {
            return Some(token);
        }
    }

    if !header.contains(' ') {
        let token = header.trim();
        if !token.is_empty() {
            return Some(token);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_validator() -> JwtValidator {
        JwtValidator::new("test-secret-that-is-at-least-32-characters-long".into(), 3600).unwrap()
    }

    fn input() -> TokenInput {
        TokenInput {
            user_id: "user-123".into(),
            email: "ada@example.com".into(),
            name: "ada".into(),
            role: Role::User,
        }
    }

    #[test]
    fn test_generate_and_verify_token() {
        let validator = test_validator();
        let (token, exp) = validator.generate_token(input()).unwrap();
        assert!(!token.is_empty());

        let result = validator.verify_token(&token);
        assert!(result.valid);

        let claims = result.claims.unwrap();
        assert_eq!(claims.sub, "user-123");
        assert_eq!(claims.role, Role::User);
        assert_eq!(claims.exp, exp);
    }

    #[test]
    fn test_invalid_token() {
        let result = test_validator().verify_token("invalid-token");
        assert!(!result.valid);
        assert!(result.error.is_some());
    }

    #[test]
    fn test_wrong_secret() {
        let other =
            JwtValidator::new("different-secret-that-is-at-least-32-characters".into(), 3600)
                .unwrap();
        let (token, _) = test_validator().generate_token(input()).unwrap();
        assert!(!other.verify_token(&token).valid);
    }

    #[test]
    fn test_extract_token_from_header() {
        assert_eq!(extract_token_from_header(Some("Bearer abc123")), Some("abc123"));
        assert_eq!(extract_token_from_header(Some("abc123")), Some("abc123"));
        assert_eq!(extract_token_from_header(None), None);
        assert_eq!(extract_token_from_header(Some("")), None);
        assert_eq!(extract_token_from_header(Some("Bearer ")), None);
        assert_eq!(extract_token_from_header(Some("Basic abc123")), None);
    }

    #[test]
    fn test_secret_validation() {
        assert!(JwtValidator::new("short".into(), 3600).is_err());
        assert!(JwtValidator::new("".into(), 3600).is_err());
        assert!(JwtValidator::new("this-secret-is-at-least-32-chars-long".into(), 3600).is_ok());
    }
}
