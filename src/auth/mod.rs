//! Authentication: credential hashing, bearer tokens, and the
//! request extractor that resolves the requesting user.

mod password;
mod token;

pub use password::{hash_password, verify_password};
pub use token::{Claims, TokenKeys};

use axum::{async_trait, extract::FromRequestParts, http::header, http::request::Parts};

use crate::error::AppError;

/// Shared auth state, layered onto protected routers as an Extension
#[derive(Clone)]
pub struct AuthContext {
    keys: TokenKeys,
}

impl AuthContext {
    pub fn new(keys: TokenKeys) -> Self {
        Self { keys }
    }

    pub fn keys(&self) -> &TokenKeys {
        &self.keys
    }
}

/// The authenticated requesting user, extracted from the
/// `Authorization: Bearer` header
///
/// Every owner-scoped operation derives its owner id from this, never
/// from the request body.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ctx = parts
            .extensions
            .get::<AuthContext>()
            .ok_or_else(|| AppError::Internal("Auth context not configured".to_string()))?;

        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;

        let token = header_value
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthorized("Malformed authorization header".to_string()))?;

        let claims = ctx.keys.verify(token)?;

        Ok(AuthUser { id: claims.sub })
    }
}
