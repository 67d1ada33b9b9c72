use axum::{
    extract::State,
    http::StatusCode,
    routing::post,
    Extension, Json, Router,
};
use avia_core::{hash_password, verify_password, IssuedToken, NewUser, Role};
use avia_shared::{Masked, StoreError};
use validator::Validate;

use crate::account::{LoginRequest, RegisterRequest};
use crate::extract::ApiJson;
use crate::middleware::BearerToken;
use crate::{error::AppError, state::AppState};

/// Routes reachable without a token.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

/// Routes that need an authenticated session.
pub fn session_routes() -> Router<AppState> {
    Router::new().route("/auth/logout", post(logout))
}

async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<StatusCode, AppError> {
    request.check_password()?;

    let fields = request.fields();
    fields.validate()?;

    if state.users.find_by_phone(&fields.phone).await?.is_some() {
        return Err(AppError::ConflictError("Phone already in use".to_string()));
    }

    let new_user = NewUser {
        first_name: fields.first_name,
        last_name: fields.last_name,
        phone: fields.phone,
        document_number: fields.document_number,
        password_hash: hash_password(&request.password)?,
        role: Role::User,
    };

    let user = state.users.create(new_user).await.map_err(|e| match e {
        StoreError::Duplicate(_) => AppError::ConflictError("Phone already in use".to_string()),
        other => other.into(),
    })?;

    tracing::info!(user_id = user.id, phone = %Masked(&user.phone), "User registered");
    Ok(StatusCode::NO_CONTENT)
}

async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<IssuedToken>, AppError> {
    request.check_present()?;

    let invalid = || AppError::AuthenticationError("Invalid credentials".to_string());

    let user = state.users.find_by_phone(request.phone.trim()).await?.ok_or_else(invalid)?;
    if !verify_password(&request.password, &user.password_hash)? {
        tracing::debug!(user_id = user.id, "Password mismatch");
        return Err(invalid());
    }

    let token = state.auth.issue(user.id)?;
    tracing::info!(user_id = user.id, "User logged in");
    Ok(Json(token))
}

async fn logout(
    State(state): State<AppState>,
    Extension(BearerToken(token)): Extension<BearerToken>,
) -> Result<StatusCode, AppError> {
    state.auth.revoke(&token).await?;
    Ok(StatusCode::NO_CONTENT)
}
