//! HTTP API Handlers and Routes
//!
//! The REST layer of Quill, built on the Axum web framework.
//!
//! # Module Structure
//!
//! - [`api::extract`](crate::api::extract) - Body extractor for JSON and form posts
//! - [`api::handlers`](crate::api::handlers) - Request handlers for each endpoint
//! - [`api::routes`](crate::api::routes) - Route definitions and router configuration
//!
//! # API Endpoints
//!
//! ## Authentication
//! - `POST /api/auth/login` - Exchange email and password for a session token
//! - `POST /api/auth/verify` - Check a token and return its holder
//! - `POST /api/admin/auth` - Admin console variant, `{"action": "login" | "verify"}`
//! - `GET /api/admin/session` - Claims of the presented token
//!
//! ## Profile
//! - `GET /api/admin/profile` - Own profile
//! - `PUT /api/admin/profile` - Update own name, bio, avatar or password
//!
//! ## Users (admin)
//! - `GET /api/admin/users` - List users (`?role=&page=&limit=`)
//! - `POST /api/admin/users` - Create a user
//! - `GET /api/admin/users/{id}` - Read a user (authors: own account only)
//! - `PUT /api/admin/users/{id}` - Update a user
//! - `DELETE /api/admin/users/{id}` - Delete a user
//!
//! ## Misc
//! - `GET /health` - Health check endpoint
//! - `GET /api/openapi.json` - OpenAPI document
//!
//! # Authentication
//!
//! Protected endpoints require a session token in the `Authorization` header:
//! ```text
//! Authorization: Bearer <token>
//! ```

/// Request body extraction.
pub mod extract;
/// Request and response handlers for all API endpoints.
pub mod handlers;
/// Router configuration and route definitions.
pub mod routes;
