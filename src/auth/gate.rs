//! Route protection: authenticate, then check the role allow-list.
//!
//! `unauthenticated -> authenticated -> authorized`; a failed step answers
//! 401 or 403 and the handler never runs.

use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    Router,
};
use tracing::warn;

use super::{extractors::bearer_claims, jwt::Claims, jwt::JwtKeys};
use crate::{accounts::Role, error::ApiError, state::AppState};

pub const MEMBER: &[Role] = &[Role::Member];
pub const STAFF: &[Role] = &[Role::Admin, Role::Owner];
pub const OWNER: &[Role] = &[Role::Owner];

/// Verifies the bearer token and stores the claims on the request.
pub async fn authenticate(
    State(keys): State<JwtKeys>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = bearer_claims(req.headers(), &keys)?;
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

#[derive(Debug, Clone, Copy)]
pub struct RoleGate {
    allowed: &'static [Role],
}

impl RoleGate {
    pub const fn new(allowed: &'static [Role]) -> Self {
        Self { allowed }
    }

    pub fn check(&self, claims: Option<&Claims>) -> Result<(), ApiError> {
        let claims = claims.ok_or(ApiError::Unauthorized)?;
        if self.allowed.contains(&claims.role) {
            Ok(())
        } else {
            warn!(account_id = %claims.sub, role = ?claims.role, "role not allowed");
            Err(ApiError::Forbidden)
        }
    }
}

async fn enforce(gate: RoleGate, req: Request, next: Next) -> Result<Response, ApiError> {
    gate.check(req.extensions().get::<Claims>())?;
    Ok(next.run(req).await)
}

/// Puts every route of `router` behind authentication and `allowed`.
pub fn protect(
    router: Router<AppState>,
    state: &AppState,
    allowed: &'static [Role],
) -> Router<AppState> {
    let gate = RoleGate::new(allowed);
    router
        .route_layer(middleware::from_fn(move |req: Request, next: Next| {
            enforce(gate, req, next)
        }))
        .route_layer(middleware::from_fn_with_state(
            state.jwt.clone(),
            authenticate,
        ))
}
