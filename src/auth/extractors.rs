use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use tracing::warn;

use super::jwt::{Claims, JwtKeys};
use crate::error::ApiError;

/// Pulls the bearer token out of `Authorization` and verifies it.
pub fn bearer_claims(headers: &HeaderMap, keys: &JwtKeys) -> Result<Claims, ApiError> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer ")))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(ApiError::Unauthorized)?;

    keys.verify(token).map_err(|_| {
        warn!("invalid or expired token");
        ApiError::Unauthorized
    })
}

/// Claims of the caller. Reuses what the gate middleware already decoded,
/// otherwise verifies the header itself.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(claims) = parts.extensions.get::<Claims>() {
            return Ok(AuthUser(claims.clone()));
        }
        let keys = JwtKeys::from_ref(state);
        bearer_claims(&parts.headers, &keys).map(AuthUser)
    }
}
