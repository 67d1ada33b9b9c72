use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use avia_core::{bearer_token, AdminAuthorizer, AuthError, User};

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// Request identity
// ============================================================================

/// The authenticated account, inserted by [`require_user`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Raw bearer token of the current request; logout revokes it.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

// ============================================================================
// User Authentication Middleware
// ============================================================================

pub async fn require_user(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = req.headers().get(AUTHORIZATION).and_then(|h| h.to_str().ok());
    let token = bearer_token(header)?.to_string();

    let user_id = state.auth.authenticate(&token).await?;
    let user = state.users.find_by_id(user_id).await?.ok_or(AuthError::UnknownUser)?;

    req.extensions_mut().insert(CurrentUser(user));
    req.extensions_mut().insert(BearerToken(token));

    Ok(next.run(req).await)
}

// ============================================================================
// Admin Authorization Middleware
// ============================================================================

/// Runs after [`require_user`]; a request that reaches it without a user is
/// treated as unauthenticated.
pub async fn require_admin(req: Request, next: Next) -> Result<Response, AppError> {
    let CurrentUser(user) = req
        .extensions()
        .get::<CurrentUser>()
        .ok_or(AuthError::MissingCredentials)?;

    AdminAuthorizer::authorize(user)?;
    Ok(next.run(req).await)
}
