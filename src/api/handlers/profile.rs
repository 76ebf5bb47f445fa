use crate::{
    api::{extract::FlexibleBody, handlers::required},
    auth::middleware::CurrentPrincipal,
    db::UserUpdate,
    types::{AppError, MessageResponse, PublicProfile, Result, UpdateProfileRequest},
    AppState,
};
use axum::{extract::State, Json};

/// Empty strings clear an optional field.
fn optional(value: String) -> Option<String> {
    Some(value).filter(|v| !v.trim().is_empty())
}

/// Profile of the signed-in user
#[utoipa::path(
    get,
    path = "/api/admin/profile",
    responses(
        (status = 200, description = "Own profile", body = PublicProfile),
        (status = 401, description = "Missing or stale credential", body = MessageResponse)
    ),
    tag = "profile"
)]
pub async fn get_profile(CurrentPrincipal(principal): CurrentPrincipal) -> Json<PublicProfile> {
    Json(principal.user.profile())
}

/// Update own name, bio, avatar or password
///
/// Role and email are not editable here.
#[utoipa::path(
    put,
    path = "/api/admin/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated profile", body = PublicProfile),
        (status = 400, description = "Invalid input", body = MessageResponse),
        (status = 401, description = "Missing or stale credential", body = MessageResponse)
    ),
    tag = "profile"
)]
pub async fn update_profile(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    FlexibleBody(payload): FlexibleBody<UpdateProfileRequest>,
) -> Result<Json<PublicProfile>> {
    let user = principal.user;
    let mut update = UserUpdate::from(&user);

    if let Some(name) = payload.name {
        if name.trim().is_empty() {
            return Err(AppError::InvalidInput("Name must not be empty".to_string()));
        }
        update.name = name;
    }
    if let Some(bio) = payload.bio {
        update.bio = optional(bio);
    }
    if let Some(avatar) = payload.avatar {
        update.avatar = optional(avatar);
    }

    // Hash before writing anything so a rejected password leaves the profile untouched.
    let password_hash = match payload.password {
        Some(password) => Some(state.hasher.hash(&required(Some(password), "Password")?).await?),
        None => None,
    };

    if !state.users.update_user(&user.id, update).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }
    if let Some(hash) = password_hash {
        state.users.update_password(&user.id, &hash).await?;
        tracing::info!(user_id = %user.id, "password changed");
    }

    let updated = state
        .users
        .get_user_by_id(&user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(updated.profile()))
}
