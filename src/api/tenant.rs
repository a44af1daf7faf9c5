//! Path extractors for the tenant segment and entity ids.
//!
//! `/api/{library_id}/...` carries the tenant; it must be a positive integer
//! or the request is rejected with 400 before any handler runs.

use std::collections::HashMap;

use async_trait::async_trait;
use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;

use super::error::ApiError;

/// The library every repository call of the request is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tenant(pub i32);

/// The `{id}` segment of a single-entity route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityId(pub i32);

/// The `{book_id}` segment of the reservation offer route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookId(pub i32);

async fn positive_param<S: Send + Sync>(
    parts: &mut Parts,
    state: &S,
    name: &str,
    message: &str,
) -> Result<i32, ApiError> {
    let Path(params) = Path::<HashMap<String, String>>::from_request_parts(parts, state)
        .await
        .map_err(|_| ApiError::bad_request(message))?;

    match params.get(name).map(|raw| raw.parse::<i32>()) {
        Some(Ok(value)) if value > 0 => Ok(value),
        _ => Err(ApiError::bad_request(message)),
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Tenant {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        positive_param(parts, state, "library_id", "ID de biblioteca inválido")
            .await
            .map(Tenant)
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for EntityId {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        positive_param(parts, state, "id", "ID inválido")
            .await
            .map(EntityId)
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for BookId {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        positive_param(parts, state, "book_id", "ID de libro inválido")
            .await
            .map(BookId)
    }
}
