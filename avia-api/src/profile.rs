use axum::{
    extract::State,
    routing::get,
    Extension, Json, Router,
};
use avia_core::{ProfileUpdate, UserProfile};
use avia_shared::StoreError;
use chrono::Utc;
use serde::Serialize;
use validator::Validate;

use crate::account::{AccountFields, ProfilePatch};
use crate::extract::ApiJson;
use crate::middleware::CurrentUser;
use crate::{error::AppError, state::AppState};

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub profile: UserProfile,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/profile", get(show_profile).patch(update_profile))
}

async fn show_profile(Extension(CurrentUser(user)): Extension<CurrentUser>) -> Json<ProfileResponse> {
    Json(ProfileResponse { profile: user.profile() })
}

async fn update_profile(
    State(state): State<AppState>,
    Extension(CurrentUser(mut user)): Extension<CurrentUser>,
    ApiJson(patch): ApiJson<ProfilePatch>,
) -> Result<Json<ProfileResponse>, AppError> {
    let update = ProfileUpdate::from(patch);
    let phone_changed = update.phone.as_ref().is_some_and(|phone| *phone != user.phone);

    update.apply(&mut user, Utc::now());
    AccountFields::from(&user).validate()?;

    if phone_changed {
        let taken = state
            .users
            .find_by_phone(&user.phone)
            .await?
            .is_some_and(|other| other.id != user.id);
        if taken {
            return Err(AppError::field("phone", "Already in use"));
        }
    }

    let user = state.users.update_profile(&user).await.map_err(|e| match e {
        StoreError::Duplicate(_) => AppError::field("phone", "Already in use"),
        other => other.into(),
    })?;
    tracing::info!(user_id = user.id, "Profile updated");
    Ok(Json(ProfileResponse { profile: user.profile() }))
}
