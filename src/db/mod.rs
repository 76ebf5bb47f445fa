//! Relational storage for principals.
//!
//! Backed by libsql: an in-memory or file-based SQLite database by default,
//! or a remote Turso database with the `turso` feature.

pub mod traits;
pub mod turso;

pub use traits::{DatabaseProvider, PrincipalStore, UserQuery, UserRepository};
pub use turso::{NewUser, TursoClient, User, UserUpdate};
