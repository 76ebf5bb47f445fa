use crate::auth::error::AuthError;
use crate::auth::token::Claims;
use crate::auth::verifier::{bearer_token, LoadedPrincipal};
use crate::types::{AppError, Role};
use crate::AppState;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};

fn authorization(headers: &HeaderMap) -> Result<&str, AuthError> {
    bearer_token(
        headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok()),
    )
}

/// Any valid, unexpired, correctly signed token. No storage access.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = state.verifier.verify(authorization(req.headers())?)?;

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Valid token whose holder still exists with a privileged role.
pub async fn require_current_principal(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = authorization(req.headers())?.to_owned();
    let principal = state
        .verifier
        .verify_and_load_principal(&token, state.principals.as_ref())
        .await?;

    req.extensions_mut().insert(principal.claims.clone());
    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}

/// Admin token, and the stored account must still be an admin.
///
/// The role claim is checked before the store is read, so author tokens are
/// turned away without a lookup.
pub async fn require_current_admin(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = authorization(req.headers())?.to_owned();
    let claims = state.verifier.verify_and_require_role(&token, Role::Admin)?;
    let principal = state
        .verifier
        .load_principal(claims, state.principals.as_ref())
        .await?;

    if !principal.is_current_admin() {
        tracing::info!(user_id = %principal.user.id, "admin token held by demoted account");
        return Err(AuthError::Forbidden.into());
    }

    req.extensions_mut().insert(principal.claims.clone());
    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}

/// Claims placed in the request by one of the middlewares above.
pub struct AuthUser(pub Claims);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| AuthError::MissingToken.into())
    }
}

/// Verified claims plus the freshly loaded user.
pub struct CurrentPrincipal(pub LoadedPrincipal);

impl<S> FromRequestParts<S> for CurrentPrincipal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<LoadedPrincipal>()
            .cloned()
            .map(CurrentPrincipal)
            .ok_or_else(|| AuthError::MissingToken.into())
    }
}
