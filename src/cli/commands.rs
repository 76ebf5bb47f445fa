//! Implementations of the offline subcommands.

use crate::auth::password::{hash_password, HashParams};
use crate::db::{DatabaseProvider, NewUser, TursoClient, User, UserRepository};
use crate::types::Role;
use crate::utils::toml_config::{ConfigError, QuillConfig};
use anyhow::{bail, Context};
use rand::RngCore;
use std::io::BufRead;
use std::path::Path;

/// Reads a password from the first line of `reader`, without its line ending.
pub fn read_password<R: BufRead>(mut reader: R) -> anyhow::Result<String> {
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .context("Failed to read password from stdin")?;

    let password = line.trim_end_matches(['\r', '\n']);
    if password.is_empty() {
        bail!("Password must not be empty");
    }

    Ok(password.to_string())
}

/// `bytes` random bytes, hex encoded.
pub fn generate_secret(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::rng().fill_bytes(&mut buf);
    hex::encode(buf)
}

/// The config file if present, otherwise defaults. Never validated.
pub fn read_config_or_default(path: &Path) -> anyhow::Result<QuillConfig> {
    match QuillConfig::read(path) {
        Ok(config) => Ok(config),
        Err(ConfigError::FileNotFound(_)) => {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(QuillConfig::default())
        }
        Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
    }
}

/// Picks the backend: remote Turso when both env vars resolve and the
/// `turso` feature is on, otherwise the configured local URL.
pub fn database_provider(config: &QuillConfig) -> DatabaseProvider {
    #[cfg(feature = "turso")]
    {
        let url = config.database.turso_url_env.as_deref().and_then(|e| config.resolve_env(e));
        let token = config.database.turso_token_env.as_deref().and_then(|e| config.resolve_env(e));
        if let (Some(url), Some(auth_token)) = (url, token) {
            return DatabaseProvider::Turso { url, auth_token };
        }
    }

    DatabaseProvider::from_url(&config.database.url)
}

pub async fn open_database(config: &QuillConfig) -> anyhow::Result<TursoClient> {
    let provider = database_provider(config);

    if let DatabaseProvider::SQLite { path } = &provider {
        if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    Ok(provider.create_client().await?)
}

/// Hashes `password` and inserts the user.
pub async fn create_user<R>(
    repo: &R,
    params: &HashParams,
    email: &str,
    name: &str,
    role: Role,
    password: &str,
) -> anyhow::Result<User>
where
    R: UserRepository + ?Sized,
{
    if email.trim().is_empty() || name.trim().is_empty() {
        bail!("Email and name must not be empty");
    }

    let password_hash = hash_password(password, params)?;

    let user = repo
        .create_user(NewUser {
            name: name.to_string(),
            email: email.to_string(),
            password_hash,
            role,
            avatar: None,
            bio: None,
        })
        .await?;

    Ok(user)
}
