//! Actor extraction for audit attribution
//!
//! Authorization lives in an external collaborator; this extractor only
//! records who asked, for the movement log and order history. The identity
//! arrives as an `x-actor` header set by the upstream gateway.

use axum::{extract::FromRequestParts, http::request::Parts};
use std::convert::Infallible;

/// The acting identity threaded through pipeline and stock operations
#[derive(Debug, Clone, Default)]
pub struct Actor(pub Option<String>);

impl Actor {
    pub fn name(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let actor = parts
            .headers
            .get("x-actor")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(|v| v.to_string());
        Ok(Actor(actor))
    }
}
