//! Body and query extractors that reject with the JSON envelope
//!
//! axum's own `Json` and `Query` answer malformed input with a plain-text
//! body; these wrap them and turn the rejection into a 400 `ApiError`.

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// JSON request body
#[derive(Debug, Clone, Copy, Default)]
pub struct Body<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for Body<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
        Ok(Body(value))
    }
}

/// URL query string
#[derive(Debug, Clone, Copy, Default)]
pub struct Params<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for Params<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
        Ok(Params(value))
    }
}
