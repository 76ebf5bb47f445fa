//! TOML-based configuration for Quill
//!
//! Infrastructure settings live in `quill.toml`. Secrets never appear in the
//! file: the config names the environment variable that holds them, and the
//! value is read once at startup.

use crate::auth::password::HashParams;
use crate::auth::token::{DEFAULT_TOKEN_TTL_SECS, MAX_TOKEN_TTL_SECS};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Shortest accepted token signing secret, in bytes.
pub const MIN_SECRET_BYTES: usize = 32;

/// Root configuration structure loaded from quill.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuillConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub hashing: HashingConfig,
}

// ============= Server Configuration =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Largest accepted request body
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_body_limit() -> usize {
    64 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

// ============= Authentication Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Environment variable name containing the token signing secret
    #[serde(default = "default_token_secret_env")]
    pub token_secret_env: String,

    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: i64,
}

fn default_token_secret_env() -> String {
    "QUILL_TOKEN_SECRET".to_string()
}

fn default_token_ttl() -> i64 {
    DEFAULT_TOKEN_TTL_SECS
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_secret_env: default_token_secret_env(),
            token_ttl_secs: default_token_ttl(),
        }
    }
}

// ============= Database Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Local database path, or `:memory:`
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Environment variable for Turso URL (optional cloud config)
    pub turso_url_env: Option<String>,

    /// Environment variable for Turso auth token
    pub turso_token_env: Option<String>,
}

fn default_database_url() -> String {
    "./data/quill.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            turso_url_env: None,
            turso_token_env: None,
        }
    }
}

// ============= Password Hashing Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashingConfig {
    #[serde(default = "default_memory_kib")]
    pub memory_kib: u32,

    #[serde(default = "default_iterations")]
    pub iterations: u32,

    #[serde(default = "default_parallelism")]
    pub parallelism: u32,

    /// Upper bound on hashes computed at the same time
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

fn default_memory_kib() -> u32 {
    HashParams::default().memory_kib
}

fn default_iterations() -> u32 {
    HashParams::default().iterations
}

fn default_parallelism() -> u32 {
    HashParams::default().parallelism
}

fn default_max_concurrent() -> usize {
    4
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            memory_kib: default_memory_kib(),
            iterations: default_iterations(),
            parallelism: default_parallelism(),
            max_concurrent: default_max_concurrent(),
        }
    }
}

impl HashingConfig {
    pub fn params(&self) -> HashParams {
        HashParams {
            memory_kib: self.memory_kib,
            iterations: self.iterations,
            parallelism: self.parallelism,
        }
    }
}

// ============= Configuration Loading & Validation =============

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' referenced in config is not set")]
    MissingEnvVar(String),
}

impl QuillConfig {
    /// Load and validate configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::read(path)?;

        config.validate()?;

        Ok(config)
    }

    /// Parse a TOML file without validating it. Offline commands use this so
    /// they work without the signing secret in the environment.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Check value ranges and that every referenced env var is set
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.token_secret()?;

        if self.auth.token_ttl_secs <= 0 || self.auth.token_ttl_secs > MAX_TOKEN_TTL_SECS {
            return Err(ConfigError::ValidationError(format!(
                "auth.token_ttl_secs must be between 1 and {}",
                MAX_TOKEN_TTL_SECS
            )));
        }

        if self.hashing.max_concurrent == 0 {
            return Err(ConfigError::ValidationError(
                "hashing.max_concurrent must be at least 1".to_string(),
            ));
        }

        if self.hashing.params().argon2().is_err() {
            return Err(ConfigError::ValidationError(format!(
                "hashing parameters rejected by argon2 (memory_kib={}, iterations={}, parallelism={})",
                self.hashing.memory_kib, self.hashing.iterations, self.hashing.parallelism
            )));
        }

        if let Some(ref env) = self.database.turso_url_env {
            self.validate_env_var(env)?;
        }
        if let Some(ref env) = self.database.turso_token_env {
            self.validate_env_var(env)?;
        }

        Ok(())
    }

    fn validate_env_var(&self, name: &str) -> Result<(), ConfigError> {
        std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))?;
        Ok(())
    }

    /// Get a resolved value from an env var reference
    pub fn resolve_env(&self, env_name: &str) -> Option<String> {
        std::env::var(env_name).ok()
    }

    /// Get the token signing secret from the environment
    pub fn token_secret(&self) -> Result<String, ConfigError> {
        let secret = self
            .resolve_env(&self.auth.token_secret_env)
            .ok_or_else(|| ConfigError::MissingEnvVar(self.auth.token_secret_env.clone()))?;

        if secret.len() < MIN_SECRET_BYTES {
            return Err(ConfigError::ValidationError(format!(
                "{} must be at least {} bytes",
                self.auth.token_secret_env, MIN_SECRET_BYTES
            )));
        }

        Ok(secret)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
