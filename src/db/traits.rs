//! Database abstraction traits
//!
//! The auth core only ever reads principals, through [`PrincipalStore`]. The
//! admin user-management handlers need the wider [`UserRepository`].
//!
//! # Example
//!
//! ```rust,ignore
//! use quill::db::{DatabaseProvider, UserRepository};
//!
//! // Use in-memory database (default for development/testing)
//! let db = DatabaseProvider::Memory.create_client().await?;
//!
//! // Use file-based SQLite
//! let db = DatabaseProvider::SQLite { path: "data/quill.db".into() }.create_client().await?;
//! ```

use super::turso::{NewUser, TursoClient, User, UserUpdate};
use crate::types::{Result, Role};
use async_trait::async_trait;

/// Database provider configuration
#[derive(Debug, Clone, Default)]
pub enum DatabaseProvider {
    /// In-memory SQLite database (ephemeral, lost on restart)
    #[default]
    Memory,
    /// File-based SQLite database
    SQLite {
        /// Path to the SQLite database file
        path: String,
    },
    /// Remote Turso database (requires network access)
    #[cfg(feature = "turso")]
    Turso {
        /// The Turso database URL (e.g., `libsql://your-db.turso.io`)
        url: String,
        /// Authentication token for the Turso database
        auth_token: String,
    },
}

impl DatabaseProvider {
    /// Create a database client from this provider configuration
    pub async fn create_client(&self) -> Result<TursoClient> {
        match self {
            DatabaseProvider::Memory => TursoClient::new_memory().await,
            DatabaseProvider::SQLite { path } => TursoClient::new_local(path).await,
            #[cfg(feature = "turso")]
            DatabaseProvider::Turso { url, auth_token } => {
                TursoClient::new_remote(url.clone(), auth_token.clone()).await
            }
        }
    }

    /// Pick a provider from a configured URL: `:memory:` or a file path.
    pub fn from_url(url: &str) -> Self {
        if url.is_empty() || url == ":memory:" {
            DatabaseProvider::Memory
        } else {
            DatabaseProvider::SQLite {
                path: url.to_string(),
            }
        }
    }
}

/// Read access to principals for authentication.
///
/// Both lookups only return users whose role is admin or author; any other
/// user is indistinguishable from a missing one.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PrincipalStore: Send + Sync {
    /// Exact, case-sensitive match on the stored email.
    async fn find_privileged_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn find_privileged_by_id(&self, id: &str) -> Result<Option<User>>;
}

/// Filter for listing users.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserQuery {
    /// `None` lists every role
    pub role: Option<Role>,
    /// 1-based page number
    pub page: u32,
    pub limit: u32,
}

/// Full user management, used by admin endpoints and the CLI.
#[async_trait]
pub trait UserRepository: PrincipalStore {
    async fn create_user(&self, user: NewUser) -> Result<User>;

    async fn get_user_by_id(&self, id: &str) -> Result<Option<User>>;

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Returns the page of users and the total matching count.
    async fn list_users(&self, query: UserQuery) -> Result<(Vec<User>, u64)>;

    /// Returns `false` when no user has this id.
    async fn update_user(&self, id: &str, update: UserUpdate) -> Result<bool>;

    async fn update_password(&self, id: &str, password_hash: &str) -> Result<bool>;

    async fn delete_user(&self, id: &str) -> Result<bool>;
}
