//! # Quill
//!
//! Authentication core and admin API for a small blog CMS.
//!
//! ## Overview
//!
//! Quill can be used in two ways:
//!
//! 1. **As a standalone server** - Run the `quill-server` binary
//! 2. **As a library** - Mount [`api::routes::create_router`] in your own axum app
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,ignore
//! use quill::{AppState, QuillConfig, TursoClient};
//! use std::sync::Arc;
//!
//! let config = QuillConfig::load("quill.toml")?;
//! let secret = config.token_secret()?;
//! let db = Arc::new(TursoClient::new_memory().await?);
//!
//! let state = AppState::new(config, &secret, db);
//! let app = axum::Router::new()
//!     .nest("/api", quill::api::routes::create_router(state.clone()))
//!     .with_state(state);
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `local-db` | Local SQLite database (default) |
//! | `turso` | Remote Turso database |
//!
//! ## Modules
//!
//! - [`api`] - REST API handlers and routes
//! - [`auth`] - Password hashing, session tokens and middleware
//! - [`db`] - Principal storage (SQLite, Turso)
//! - [`types`] - Common types and error handling
//! - [`utils`] - Configuration loading

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

/// HTTP API handlers and routes.
pub mod api;
/// Password hashing, session tokens and middleware.
pub mod auth;
/// Command-line interface.
pub mod cli;
/// Principal storage (Turso/SQLite).
pub mod db;
/// Core types (requests, responses, errors).
pub mod types;
/// Configuration utilities (TOML).
pub mod utils;

// Re-export commonly used types
pub use auth::{CredentialIssuer, HashingPool, TokenCodec, TokenVerifier};
pub use db::{PrincipalStore, TursoClient, UserRepository};
pub use types::{AppError, Result};
pub use utils::toml_config::QuillConfig;

use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Configuration as loaded at startup
    pub config: Arc<QuillConfig>,
    /// Full user management
    pub users: Arc<dyn UserRepository>,
    /// Read-only principal lookups used by the auth core
    pub principals: Arc<dyn PrincipalStore>,
    /// Bounded password hashing
    pub hasher: HashingPool,
    /// Login
    pub issuer: Arc<CredentialIssuer>,
    /// Token verification
    pub verifier: Arc<TokenVerifier>,
}

impl AppState {
    /// Wires the auth core over a single store.
    ///
    /// `secret` is the already validated token signing key.
    pub fn new<D>(config: QuillConfig, secret: &str, db: Arc<D>) -> Self
    where
        D: UserRepository + 'static,
    {
        let codec = Arc::new(TokenCodec::new(secret, config.auth.token_ttl_secs));
        let hasher = HashingPool::new(config.hashing.params(), config.hashing.max_concurrent);
        let principals: Arc<dyn PrincipalStore> = db.clone();

        Self {
            issuer: Arc::new(CredentialIssuer::new(
                principals.clone(),
                hasher.clone(),
                codec.clone(),
            )),
            verifier: Arc::new(TokenVerifier::new(codec)),
            config: Arc::new(config),
            users: db,
            principals,
            hasher,
        }
    }
}
