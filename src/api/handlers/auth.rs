use crate::{
    api::{extract::FlexibleBody, handlers::required},
    auth::middleware::AuthUser,
    types::{
        AppError, AuthActionRequest, LoginRequest, LoginResponse, MessageResponse, Result,
        SessionResponse, VerifyRequest, VerifyResponse,
    },
    AppState,
};
use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};

async fn issue(state: &AppState, email: Option<String>, password: Option<String>) -> Result<LoginResponse> {
    let email = required(email, "Email")?;
    let password = required(password, "Password")?;

    let session = state.issuer.authenticate(&email, &password).await?;

    Ok(LoginResponse {
        message: "Login successful".to_string(),
        token: session.token,
        expires_at: session.claims.exp,
        user: session.user,
    })
}

async fn check(state: &AppState, token: Option<String>) -> Result<VerifyResponse> {
    let token = required(token, "Token")?;

    let principal = state
        .verifier
        .verify_and_load_principal(&token, state.principals.as_ref())
        .await?;

    Ok(VerifyResponse {
        valid: true,
        user: principal.user.profile(),
    })
}

/// Login with email and password
///
/// Accepts JSON, urlencoded and multipart bodies.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Email or password missing", body = MessageResponse),
        (status = 401, description = "Invalid credentials", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    FlexibleBody(payload): FlexibleBody<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    issue(&state, payload.email, payload.password).await.map(Json)
}

/// Verify a session token and return its current holder
#[utoipa::path(
    post,
    path = "/api/auth/verify",
    request_body = VerifyRequest,
    responses(
        (status = 200, description = "Token is valid", body = VerifyResponse),
        (status = 400, description = "Token missing", body = MessageResponse),
        (status = 401, description = "Token invalid, expired, or holder no longer privileged", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn verify(
    State(state): State<AppState>,
    FlexibleBody(payload): FlexibleBody<VerifyRequest>,
) -> Result<Json<VerifyResponse>> {
    check(&state, payload.token).await.map(Json)
}

/// Admin console auth endpoint, dispatched on `action`
#[utoipa::path(
    post,
    path = "/api/admin/auth",
    request_body = AuthActionRequest,
    responses(
        (status = 200, description = "`login` returns LoginResponse, `verify` returns VerifyResponse", body = LoginResponse),
        (status = 400, description = "Missing or unknown action", body = MessageResponse),
        (status = 401, description = "Authentication failed", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn dispatch(
    State(state): State<AppState>,
    FlexibleBody(payload): FlexibleBody<AuthActionRequest>,
) -> Result<Response> {
    match payload.action.as_deref() {
        Some("login") => {
            let response = issue(&state, payload.email, payload.password).await?;
            Ok(Json(response).into_response())
        }
        Some("verify") => {
            let response = check(&state, payload.token).await?;
            Ok(Json(response).into_response())
        }
        Some(other) => {
            tracing::debug!(action = %other, "unknown auth action");
            Err(AppError::InvalidInput("Invalid action".to_string()))
        }
        None => Err(AppError::InvalidInput("Action is required".to_string())),
    }
}

/// Claims of the presented token
#[utoipa::path(
    get,
    path = "/api/admin/session",
    responses(
        (status = 200, description = "Current session", body = SessionResponse),
        (status = 401, description = "Missing or invalid token", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn session(AuthUser(claims): AuthUser) -> Json<SessionResponse> {
    Json(SessionResponse {
        user_id: claims.sub,
        email: claims.email,
        role: claims.role,
        expires_at: claims.exp,
    })
}
