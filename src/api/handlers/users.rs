use crate::{
    api::{extract::FlexibleBody, handlers::required},
    auth::{middleware::CurrentPrincipal, AuthError, LoadedPrincipal},
    db::{NewUser, UserQuery, UserUpdate},
    types::{
        AppError, CreateUserRequest, CreateUserResponse, MessageResponse, Pagination,
        PublicProfile, Result, Role, UpdateUserRequest, UserListResponse,
    },
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

const DEFAULT_PAGE_SIZE: u32 = 10;
const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListUsersQuery {
    /// `admin`, `author`, `user`, or `all` (default)
    pub role: Option<String>,
    /// 1-based page number
    pub page: Option<u32>,
    /// Page size, at most 100
    pub limit: Option<u32>,
}

impl ListUsersQuery {
    fn into_query(self) -> Result<UserQuery> {
        let role = match self.role.as_deref() {
            None | Some("") | Some("all") => None,
            Some(role) => Some(role.parse::<Role>()?),
        };

        Ok(UserQuery {
            role,
            page: self.page.unwrap_or(1).max(1),
            limit: self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        })
    }
}

fn require_current_admin(principal: &LoadedPrincipal) -> Result<()> {
    if principal.is_current_admin() {
        Ok(())
    } else {
        tracing::info!(user_id = %principal.user.id, "user management denied");
        Err(AuthError::Forbidden.into())
    }
}

fn not_found() -> AppError {
    AppError::NotFound("User not found".to_string())
}

/// List users, optionally filtered by role
#[utoipa::path(
    get,
    path = "/api/admin/users",
    params(ListUsersQuery),
    responses(
        (status = 200, description = "One page of users", body = UserListResponse),
        (status = 400, description = "Unknown role filter", body = MessageResponse),
        (status = 401, description = "Missing or stale credential", body = MessageResponse),
        (status = 403, description = "Admin role required", body = MessageResponse)
    ),
    tag = "users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<ListUsersQuery>,
) -> Result<Json<UserListResponse>> {
    let query = params.into_query()?;
    let (users, total) = state.users.list_users(query).await?;

    let total_pages = total.div_ceil(u64::from(query.limit));

    Ok(Json(UserListResponse {
        users: users.iter().map(|u| u.summary()).collect(),
        pagination: Pagination {
            current_page: query.page,
            total_pages: u32::try_from(total_pages).unwrap_or(u32::MAX),
            total_users: total,
            users_per_page: query.limit,
        },
    }))
}

/// Create a user
#[utoipa::path(
    post,
    path = "/api/admin/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = CreateUserResponse),
        (status = 400, description = "Missing fields or duplicate email", body = MessageResponse),
        (status = 401, description = "Missing or stale credential", body = MessageResponse),
        (status = 403, description = "Admin role required", body = MessageResponse)
    ),
    tag = "users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    CurrentPrincipal(admin): CurrentPrincipal,
    FlexibleBody(payload): FlexibleBody<CreateUserRequest>,
) -> Result<(StatusCode, Json<CreateUserResponse>)> {
    let name = required(payload.name, "Name")?;
    let email = required(payload.email, "Email")?;
    let password = required(payload.password, "Password")?;

    let password_hash = state.hasher.hash(&password).await?;

    let user = state
        .users
        .create_user(NewUser {
            name,
            email,
            password_hash,
            role: payload.role.unwrap_or(Role::Reader),
            avatar: None,
            bio: payload.bio,
        })
        .await?;

    tracing::info!(user_id = %user.id, role = %user.role, created_by = %admin.user.id, "user created");

    Ok((
        StatusCode::CREATED,
        Json(CreateUserResponse {
            message: "User created".to_string(),
            user_id: user.id,
        }),
    ))
}

/// Fetch one user
///
/// Admins may read any account; authors only their own.
#[utoipa::path(
    get,
    path = "/api/admin/users/{id}",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "The user", body = PublicProfile),
        (status = 401, description = "Missing or stale credential", body = MessageResponse),
        (status = 403, description = "Not the owner", body = MessageResponse),
        (status = 404, description = "No such user", body = MessageResponse)
    ),
    tag = "users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(id): Path<String>,
) -> Result<Json<PublicProfile>> {
    if !principal.can_manage(&id) {
        tracing::info!(user_id = %principal.user.id, target = %id, "user read denied");
        return Err(AuthError::Forbidden.into());
    }

    let user = state.users.get_user_by_id(&id).await?.ok_or_else(not_found)?;

    Ok(Json(user.profile()))
}

/// Replace a user's name, email, role and bio
///
/// An omitted role keeps the current one.
#[utoipa::path(
    put,
    path = "/api/admin/users/{id}",
    params(("id" = String, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = MessageResponse),
        (status = 400, description = "Missing fields or duplicate email", body = MessageResponse),
        (status = 401, description = "Missing or stale credential", body = MessageResponse),
        (status = 403, description = "Admin role required", body = MessageResponse),
        (status = 404, description = "No such user", body = MessageResponse)
    ),
    tag = "users"
)]
pub async fn update_user(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(id): Path<String>,
    FlexibleBody(payload): FlexibleBody<UpdateUserRequest>,
) -> Result<Json<MessageResponse>> {
    require_current_admin(&principal)?;

    let name = required(payload.name, "Name")?;
    let email = required(payload.email, "Email")?;

    let existing = state.users.get_user_by_id(&id).await?.ok_or_else(not_found)?;

    let update = UserUpdate {
        name,
        email,
        role: payload.role.unwrap_or(existing.role),
        avatar: existing.avatar,
        bio: payload.bio,
    };

    if !state.users.update_user(&id, update).await? {
        return Err(not_found());
    }

    tracing::info!(user_id = %id, updated_by = %principal.user.id, "user updated");

    Ok(Json(MessageResponse::new("User updated")))
}

/// Delete a user
#[utoipa::path(
    delete,
    path = "/api/admin/users/{id}",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 400, description = "Attempt to delete own account", body = MessageResponse),
        (status = 401, description = "Missing or stale credential", body = MessageResponse),
        (status = 403, description = "Admin role required", body = MessageResponse),
        (status = 404, description = "No such user", body = MessageResponse)
    ),
    tag = "users"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    require_current_admin(&principal)?;

    if principal.user.id == id {
        return Err(AppError::InvalidInput(
            "You cannot delete your own account".to_string(),
        ));
    }

    if !state.users.delete_user(&id).await? {
        return Err(not_found());
    }

    tracing::info!(user_id = %id, deleted_by = %principal.user.id, "user deleted");

    Ok(Json(MessageResponse::new("User deleted")))
}
