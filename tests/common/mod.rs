//! Shared fixtures for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use axum_test::TestServer;
use quill::{
    api::routes,
    auth::password::{hash_password, HashParams},
    db::{NewUser, PrincipalStore, TursoClient, User, UserQuery, UserRepository, UserUpdate},
    types::{Result, Role},
    AppState, QuillConfig, TokenCodec,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const SECRET: &str = "integration-test-secret-at-least-32-bytes";
pub const PASSWORD: &str = "password";

pub const ADMIN_EMAIL: &str = "admin@blog.com";
pub const AUTHOR_EMAIL: &str = "autor@blog.com";
pub const READER_EMAIL: &str = "lector@blog.com";

/// Cheapest parameters argon2 accepts.
pub fn fast_params() -> HashParams {
    HashParams {
        memory_kib: 8,
        iterations: 1,
        parallelism: 1,
    }
}

pub fn test_config() -> QuillConfig {
    let mut config = QuillConfig::default();
    config.database.url = ":memory:".to_string();
    config.hashing.memory_kib = 8;
    config.hashing.iterations = 1;
    config.hashing.parallelism = 1;
    config
}

pub fn codec() -> TokenCodec {
    TokenCodec::new(SECRET, test_config().auth.token_ttl_secs)
}

pub struct Seeded {
    pub admin: User,
    pub author: User,
    pub reader: User,
}

pub async fn insert_user<R: UserRepository + ?Sized>(
    repo: &R,
    name: &str,
    email: &str,
    role: Role,
) -> User {
    repo.create_user(NewUser {
        name: name.to_string(),
        email: email.to_string(),
        password_hash: hash_password(PASSWORD, &fast_params()).expect("hash"),
        role,
        avatar: None,
        bio: None,
    })
    .await
    .expect("Failed to seed user")
}

pub async fn seed<R: UserRepository + ?Sized>(repo: &R) -> Seeded {
    Seeded {
        admin: insert_user(repo, "Administrador", ADMIN_EMAIL, Role::Admin).await,
        author: insert_user(repo, "Autor Demo", AUTHOR_EMAIL, Role::Author).await,
        reader: insert_user(repo, "Lector", READER_EMAIL, Role::Reader).await,
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub db: Arc<TursoClient>,
    pub users: Seeded,
}

/// Full application over a fresh in-memory database with three seeded users.
pub async fn test_app() -> TestApp {
    let db = Arc::new(
        TursoClient::new_memory()
            .await
            .expect("Failed to create in-memory database"),
    );
    let users = seed(db.as_ref()).await;

    let state = AppState::new(test_config(), SECRET, db.clone());
    let server = TestServer::new(routes::app(state)).expect("Failed to create test server");

    TestApp { server, db, users }
}

/// Logs in through the API and returns the token.
pub async fn login(server: &TestServer, email: &str) -> String {
    let response = server
        .post("/api/auth/login")
        .json(&json!({ "email": email, "password": PASSWORD }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    body["token"]
        .as_str()
        .expect("login response carries a token")
        .to_string()
}

/// Delegates to a real store and counts principal lookups.
pub struct CountingStore {
    pub inner: TursoClient,
    pub lookups: AtomicUsize,
}

impl CountingStore {
    pub async fn new() -> Self {
        Self {
            inner: TursoClient::new_memory().await.expect("in-memory database"),
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PrincipalStore for CountingStore {
    async fn find_privileged_by_email(&self, email: &str) -> Result<Option<User>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.find_privileged_by_email(email).await
    }

    async fn find_privileged_by_id(&self, id: &str) -> Result<Option<User>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.find_privileged_by_id(id).await
    }
}

#[async_trait]
impl UserRepository for CountingStore {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        self.inner.create_user(user).await
    }

    async fn get_user_by_id(&self, id: &str) -> Result<Option<User>> {
        self.inner.get_user_by_id(id).await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.inner.get_user_by_email(email).await
    }

    async fn list_users(&self, query: UserQuery) -> Result<(Vec<User>, u64)> {
        self.inner.list_users(query).await
    }

    async fn update_user(&self, id: &str, update: UserUpdate) -> Result<bool> {
        self.inner.update_user(id, update).await
    }

    async fn update_password(&self, id: &str, password_hash: &str) -> Result<bool> {
        self.inner.update_password(id, password_hash).await
    }

    async fn delete_user(&self, id: &str) -> Result<bool> {
        self.inner.delete_user(id).await
    }
}
