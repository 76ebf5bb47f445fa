use crate::{
    api::handlers::{auth, health, profile, users},
    auth::middleware::{require_auth, require_current_admin, require_current_principal},
    AppState,
};
use axum::{
    middleware,
    routing::{get, post},
    Json, Router,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(title = "Quill API", description = "Blog CMS authentication and admin API"),
    paths(
        health::health_check,
        auth::login,
        auth::verify,
        auth::dispatch,
        auth::session,
        profile::get_profile,
        profile::update_profile,
        users::list_users,
        users::create_user,
        users::get_user,
        users::update_user,
        users::delete_user,
    ),
    tags(
        (name = "auth", description = "Login and token verification"),
        (name = "profile", description = "Own profile"),
        (name = "users", description = "User management"),
        (name = "health", description = "Liveness")
    )
)]
pub struct ApiDoc;

/// Routes mounted under `/api`.
pub fn create_router(state: AppState) -> Router<AppState> {
    let public_routes = Router::new()
        // Public routes (no auth required)
        .route("/auth/login", post(auth::login))
        .route("/auth/verify", post(auth::verify))
        .route("/admin/auth", post(auth::dispatch))
        .route("/openapi.json", get(|| async { Json(ApiDoc::openapi()) }));

    let session_routes = Router::new()
        .route("/admin/session", get(auth::session))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let principal_routes = Router::new()
        .route(
            "/admin/profile",
            get(profile::get_profile).put(profile::update_profile),
        )
        .route(
            "/admin/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_current_principal,
        ));

    let admin_routes = Router::new()
        .route(
            "/admin/users",
            get(users::list_users).post(users::create_user),
        )
        .layer(middleware::from_fn_with_state(state, require_current_admin));

    public_routes
        .merge(session_routes)
        .merge(principal_routes)
        .merge(admin_routes)
}

/// Full application: `/health` plus the API under `/api`, with tracing,
/// permissive CORS and the configured body limit.
pub fn app(state: AppState) -> Router {
    let body_limit = state.config.server.body_limit_bytes;

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", create_router(state.clone()))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
