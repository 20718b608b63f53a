//! Route and identifier extractors for resource handlers.
//!
//! `RoutePath` is the full request path the client used (before any
//! `Router::nest` stripping), trimmed of trailing slashes. It is the base for
//! `Location` and pagination links only; tags are keyed by
//! `ResourceState::row_key`, which normalizes the id.

use axum::{
    async_trait,
    extract::{FromRequestParts, OriginalUri, Path},
    http::request::Parts,
};

use crate::error::ApiError;

/// Full request path without trailing slash, e.g. `/items/7`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePath(pub String);

impl RoutePath {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Normalize a request path into a route key.
pub(crate) fn route_key(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RoutePath
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let path = match parts.extensions.get::<OriginalUri>() {
            Some(OriginalUri(uri)) => uri.path().to_string(),
            None => parts.uri.path().to_string(),
        };
        Ok(RoutePath(route_key(&path)))
    }
}

/// Raw `:id` path segment; blank identifiers are rejected with 400.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityId(pub String);

impl EntityId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for EntityId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id): Path<String> = Path::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::missing_field("id"))?;

        let id = id.trim();
        if id.is_empty() {
            return Err(ApiError::missing_field("id"));
        }
        Ok(EntityId(id.to_string()))
    }
}
