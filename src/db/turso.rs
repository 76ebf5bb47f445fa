use super::traits::{PrincipalStore, UserQuery, UserRepository};
use crate::types::{AppError, PublicProfile, Result, Role, UserSummary};
use async_trait::async_trait;
use chrono::Utc;
use libsql::{Builder, Connection, Database, Row, Value};

const DUPLICATE_EMAIL: &str = "A user with that email already exists";

const USER_COLUMNS: &str =
    "id, name, email, password_hash, role, avatar, bio, created_at, updated_at";

/// libsql-backed user store (in-memory, local file, or remote Turso).
pub struct TursoClient {
    _db: Database,
    conn: Connection,
}

impl TursoClient {
    /// Ephemeral database; everything is lost when the client is dropped.
    pub async fn new_memory() -> Result<Self> {
        Self::new_local(":memory:").await
    }

    pub async fn new_local(path: &str) -> Result<Self> {
        let db = Builder::new_local(path)
            .build()
            .await
            .map_err(|e| AppError::Database(format!("Failed to open database: {}", e)))?;

        Self::from_database(db).await
    }

    #[cfg(feature = "turso")]
    pub async fn new_remote(url: String, auth_token: String) -> Result<Self> {
        let db = Builder::new_remote(url, auth_token)
            .build()
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Turso: {}", e)))?;

        Self::from_database(db).await
    }

    async fn from_database(db: Database) -> Result<Self> {
        // One shared connection: an in-memory database lives only as long as
        // the connection that created it.
        let conn = db
            .connect()
            .map_err(|e| AppError::Database(format!("Failed to get connection: {}", e)))?;

        let client = Self { _db: db, conn };
        client.initialize_schema().await?;

        Ok(client)
    }

    pub fn connection(&self) -> Result<Connection> {
        Ok(self.conn.clone())
    }

    async fn initialize_schema(&self) -> Result<()> {
        let conn = self.connection()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'user'
                    CHECK (role IN ('admin', 'author', 'user')),
                avatar TEXT,
                bio TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            (),
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to create users table: {}", e)))?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_users_role ON users(role)",
            (),
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to create users index: {}", e)))?;

        Ok(())
    }

    async fn query_one(&self, sql: &str, param: &str) -> Result<Option<User>> {
        let conn = self.connection()?;

        let mut rows = conn
            .query(sql, [param])
            .await
            .map_err(|e| AppError::Database(format!("Failed to query user: {}", e)))?;

        match rows
            .next()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        {
            Some(row) => Ok(Some(User::from_row(&row)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl PrincipalStore for TursoClient {
    async fn find_privileged_by_email(&self, email: &str) -> Result<Option<User>> {
        self.query_one(
            &format!(
                "SELECT {USER_COLUMNS} FROM users
                 WHERE email = ? AND role IN ('admin', 'author')"
            ),
            email,
        )
        .await
    }

    async fn find_privileged_by_id(&self, id: &str) -> Result<Option<User>> {
        self.query_one(
            &format!(
                "SELECT {USER_COLUMNS} FROM users
                 WHERE id = ? AND role IN ('admin', 'author')"
            ),
            id,
        )
        .await
    }
}

#[async_trait]
impl UserRepository for TursoClient {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        if self.get_user_by_email(&user.email).await?.is_some() {
            return Err(AppError::InvalidInput(DUPLICATE_EMAIL.to_string()));
        }

        let conn = self.connection()?;
        let now = Utc::now().timestamp();
        let id = uuid::Uuid::new_v4().to_string();

        conn.execute(
            "INSERT INTO users (id, name, email, password_hash, role, avatar, bio, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            (
                id.as_str(),
                user.name.as_str(),
                user.email.as_str(),
                user.password_hash.as_str(),
                user.role.as_str(),
                user.avatar.as_deref(),
                user.bio.as_deref(),
                now,
                now,
            ),
        )
        .await
        .map_err(|e| write_error("Failed to create user", e))?;

        Ok(User {
            id,
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            avatar: user.avatar,
            bio: user.bio,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_user_by_id(&self, id: &str) -> Result<Option<User>> {
        self.query_one(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"), id)
            .await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.query_one(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"),
            email,
        )
        .await
    }

    async fn list_users(&self, query: UserQuery) -> Result<(Vec<User>, u64)> {
        let conn = self.connection()?;
        let role = query.role.map(|r| r.as_str());
        let limit = i64::from(query.limit.max(1));
        let offset = i64::from(query.page.max(1) - 1) * limit;

        let mut rows = conn
            .query(
                &format!(
                    "SELECT {USER_COLUMNS} FROM users
                     WHERE (?1 IS NULL OR role = ?1)
                     ORDER BY created_at DESC, id ASC
                     LIMIT ?2 OFFSET ?3"
                ),
                (role, limit, offset),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to list users: {}", e)))?;

        let mut users = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        {
            users.push(User::from_row(&row)?);
        }

        let mut count_rows = conn
            .query(
                "SELECT COUNT(*) FROM users WHERE (?1 IS NULL OR role = ?1)",
                [role],
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to count users: {}", e)))?;

        let total: i64 = match count_rows
            .next()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        {
            Some(row) => row.get(0).map_err(|e| AppError::Database(e.to_string()))?,
            None => 0,
        };

        Ok((users, total.max(0) as u64))
    }

    async fn update_user(&self, id: &str, update: UserUpdate) -> Result<bool> {
        if let Some(existing) = self.get_user_by_email(&update.email).await? {
            if existing.id != id {
                return Err(AppError::InvalidInput(DUPLICATE_EMAIL.to_string()));
            }
        }

        let conn = self.connection()?;
        let now = Utc::now().timestamp();

        let affected = conn
            .execute(
                "UPDATE users
                 SET name = ?, email = ?, role = ?, avatar = ?, bio = ?, updated_at = ?
                 WHERE id = ?",
                (
                    update.name.as_str(),
                    update.email.as_str(),
                    update.role.as_str(),
                    update.avatar.as_deref(),
                    update.bio.as_deref(),
                    now,
                    id,
                ),
            )
            .await
            .map_err(|e| write_error("Failed to update user", e))?;

        Ok(affected > 0)
    }

    async fn update_password(&self, id: &str, password_hash: &str) -> Result<bool> {
        let conn = self.connection()?;
        let now = Utc::now().timestamp();

        let affected = conn
            .execute(
                "UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?",
                (password_hash, now, id),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to update password: {}", e)))?;

        Ok(affected > 0)
    }

    async fn delete_user(&self, id: &str) -> Result<bool> {
        let conn = self.connection()?;

        let affected = conn
            .execute("DELETE FROM users WHERE id = ?", [id])
            .await
            .map_err(|e| AppError::Database(format!("Failed to delete user: {}", e)))?;

        Ok(affected > 0)
    }
}

/// Stored user record. Only ever leaves the server through [`User::profile`]
/// or [`User::summary`].
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl User {
    fn from_row(row: &Row) -> Result<Self> {
        let role: String = row.get(4).map_err(|e| AppError::Database(e.to_string()))?;

        Ok(User {
            id: row.get(0).map_err(|e| AppError::Database(e.to_string()))?,
            name: row.get(1).map_err(|e| AppError::Database(e.to_string()))?,
            email: row.get(2).map_err(|e| AppError::Database(e.to_string()))?,
            password_hash: row.get(3).map_err(|e| AppError::Database(e.to_string()))?,
            role: role
                .parse()
                .map_err(|_| AppError::Database(format!("Unknown role in users table: {}", role)))?,
            avatar: optional_text(row, 5)?,
            bio: optional_text(row, 6)?,
            created_at: row.get(7).map_err(|e| AppError::Database(e.to_string()))?,
            updated_at: row.get(8).map_err(|e| AppError::Database(e.to_string()))?,
        })
    }

    pub fn profile(&self) -> PublicProfile {
        PublicProfile {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            avatar: self.avatar.clone(),
            bio: self.bio.clone(),
        }
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            avatar: self.avatar.clone(),
            bio: self.bio.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// A concurrent writer can take an email between the existence check and the
/// write; the `UNIQUE` constraint then reports it.
fn write_error(context: &str, err: libsql::Error) -> AppError {
    if err.to_string().contains("UNIQUE constraint failed: users.email") {
        AppError::InvalidInput(DUPLICATE_EMAIL.to_string())
    } else {
        AppError::Database(format!("{}: {}", context, err))
    }
}

fn optional_text(row: &Row, idx: i32) -> Result<Option<String>> {
    match row
        .get_value(idx)
        .map_err(|e| AppError::Database(e.to_string()))?
    {
        Value::Null => Ok(None),
        Value::Text(text) => Ok(Some(text)),
        other => Err(AppError::Database(format!(
            "Expected text in column {}, found {:?}",
            idx, other
        ))),
    }
}

/// Fields for inserting a user; the id and timestamps are assigned on insert.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub avatar: Option<String>,
    pub bio: Option<String>,
}

/// Replacement values for a user's editable fields. The password is changed
/// separately through [`UserRepository::update_password`].
#[derive(Debug, Clone)]
pub struct UserUpdate {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub avatar: Option<String>,
    pub bio: Option<String>,
}

impl From<&User> for UserUpdate {
    fn from(user: &User) -> Self {
        Self {
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            avatar: user.avatar.clone(),
            bio: user.bio.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unique_violation_maps_to_invalid_input() {
        let client = TursoClient::new_memory().await.unwrap();
        let conn = client.connection().unwrap();
        let insert = "INSERT INTO users (id, name, email, password_hash, role, created_at, updated_at)
                      VALUES (?, 'Ana', 'ana@blog.com', 'hash', 'author', 0, 0)";

        conn.execute(insert, ["first"]).await.unwrap();
        // a second writer that skipped the existence check
        let err = conn.execute(insert, ["second"]).await.unwrap_err();

        match write_error("Failed to create user", err) {
            AppError::InvalidInput(msg) => assert_eq!(msg, DUPLICATE_EMAIL),
            other => panic!("expected InvalidInput, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_other_write_errors_stay_database_errors() {
        let client = TursoClient::new_memory().await.unwrap();
        let conn = client.connection().unwrap();

        let err = conn
            .execute(
                "INSERT INTO users (id, name, email, password_hash, role, created_at, updated_at)
                 VALUES ('x', 'X', 'x@blog.com', 'hash', 'root', 0, 0)",
                (),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            write_error("Failed to create user", err),
            AppError::Database(_)
        ));
    }
}
