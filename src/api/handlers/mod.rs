//! API request handlers.
//!
//! This module contains all HTTP request handlers organized by functionality.

use crate::types::{AppError, Result};

/// Login, token verification and session handlers.
pub mod auth;
/// Health check.
pub mod health;
/// Own-profile handlers for signed-in principals.
pub mod profile;
/// Admin user management handlers.
pub mod users;

/// Unwraps a field the client must send, treating an empty string as absent.
pub(crate) fn required(value: Option<String>, field: &str) -> Result<String> {
    match value {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(AppError::InvalidInput(format!("{} is required", field))),
    }
}
