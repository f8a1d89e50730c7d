//! Axum extractors for the calling user

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;

use super::{extract_token_from_header, Claims, Role};
use crate::error::ApiError;
use crate::state::AppState;

/// Caller with a valid session token. Rejects with 401 otherwise.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub role: Role,
    pub claims: Claims,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role.allows(Role::Admin)
    }

    /// 403 unless the caller is an admin
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Admin access required".into()))
        }
    }
}

/// Caller if a valid token was sent, anonymous otherwise
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<AuthUser>);

impl MaybeUser {
    pub fn id(&self) -> Option<&str> {
        self.0.as_ref().map(|u| u.id.as_str())
    }
}

fn authenticate(parts: &Parts, state: &AppState) -> Result<Option<AuthUser>, ApiError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let Some(token) = extract_token_from_header(header) else {
        return Ok(None);
    };

    let result = state.jwt.verify_token(token);
    match result.claims {
        Some(claims) if result.valid => Ok(Some(AuthUser {
            id: claims.sub.clone(),
            role: claims.role,
            claims,
        })),
        _ => {
            let reason = result.error.unwrap_or_else(|| "Invalid token".into());
            warn!(reason = %reason, "Rejected session token");
            Err(ApiError::Unauthorized(reason))
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        authenticate(parts, state)?.ok_or_else(ApiError::unauthenticated)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // A bad token on a public endpoint is treated as anonymous
        Ok(MaybeUser(authenticate(parts, state).unwrap_or(None)))
    }
}
