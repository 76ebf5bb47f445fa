//! Authentication core
//!
//! Everything needed to turn an email and password into a signed session
//! token, and a presented token back into a trusted identity.
//!
//! # Module Structure
//!
//! - [`auth::password`](crate::auth::password) - Argon2id hashing and verification
//! - [`auth::token`](crate::auth::token) - Claims and the signed token codec
//! - [`auth::issuer`](crate::auth::issuer) - Login: credentials in, session token out
//! - [`auth::verifier`](crate::auth::verifier) - Token checks, role gates, principal reload
//! - [`auth::middleware`](crate::auth::middleware) - Axum layers and extractors
//! - [`auth::error`](crate::auth::error) - The closed set of auth failures
//!
//! # Tokens
//!
//! Tokens are HS256-signed and carry `sub`, `email`, `role`, `iat` and `exp`.
//! They are stateless: nothing is recorded at issuance, and a token stays
//! valid until it expires. Endpoints that must see role changes immediately
//! reload the principal through [`TokenVerifier::verify_and_load_principal`].
//!
//! ```ignore
//! use quill::auth::{CredentialIssuer, TokenVerifier};
//!
//! let session = issuer.authenticate("admin@blog.com", "password").await?;
//! let claims = verifier.verify(&session.token)?;
//! ```
//!
//! # Configuration
//!
//! Configure via `quill.toml`:
//! ```toml
//! [auth]
//! token_secret_env = "QUILL_TOKEN_SECRET"  # at least 32 bytes
//! token_ttl_secs = 86400
//! ```

/// Authentication failure taxonomy.
pub mod error;
/// Credential issuance (login).
pub mod issuer;
/// Authentication middleware and extractors for protected routes.
pub mod middleware;
/// Password hashing and verification.
pub mod password;
/// Token claims and signing.
pub mod token;
/// Token verification and authorization checks.
pub mod verifier;

pub use error::AuthError;
pub use issuer::{CredentialIssuer, IssuedSession};
pub use password::{HashParams, HashingPool};
pub use token::{Claims, TokenCodec};
pub use verifier::{LoadedPrincipal, TokenVerifier};
