//! Password hashing and verification.
//!
//! Hashes are Argon2id PHC strings (`$argon2id$v=19$m=...,t=...,p=...$salt$hash`),
//! so the salt and cost parameters travel with the hash and verification needs
//! nothing else. Both operations are CPU-heavy; request handlers should
//! go through [`HashingPool`] rather than calling them on an async worker.

use crate::types::{AppError, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Longest accepted plaintext. Longer input is rejected, never truncated.
pub const MAX_PASSWORD_BYTES: usize = 1024;

/// Argon2id cost parameters used for new hashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashParams {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub iterations: u32,
    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for HashParams {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

impl HashParams {
    /// Builds the hasher, failing when argon2 rejects the parameters.
    pub fn argon2(&self) -> Result<Argon2<'static>> {
        let params = Params::new(self.memory_kib, self.iterations, self.parallelism, None)
            .map_err(|e| AppError::Internal(format!("Invalid Argon2 parameters: {}", e)))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

/// Hashes a password with a fresh random salt.
///
/// Returns `InvalidInput` when the plaintext exceeds [`MAX_PASSWORD_BYTES`].
pub fn hash_password(plaintext: &str, params: &HashParams) -> Result<String> {
    if plaintext.len() > MAX_PASSWORD_BYTES {
        return Err(AppError::InvalidInput(format!(
            "Password must not exceed {} bytes",
            MAX_PASSWORD_BYTES
        )));
    }

    let salt = SaltString::generate(&mut OsRng);

    params
        .argon2()?
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

/// Checks a password against a stored PHC hash.
///
/// Never errors: a wrong password, an over-long password and an unparseable
/// stored hash all yield `false`.
pub fn verify_password(plaintext: &str, stored_hash: &str) -> bool {
    if plaintext.len() > MAX_PASSWORD_BYTES {
        return false;
    }

    let parsed = match PasswordHash::new(stored_hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(error = %e, "stored password hash is not a valid PHC string");
            return false;
        }
    };

    Argon2::default()
        .verify_password(plaintext.as_bytes(), &parsed)
        .is_ok()
}

/// Runs hashing on tokio's blocking pool with a cap on concurrent computations,
/// so a burst of logins cannot occupy every blocking thread.
#[derive(Debug, Clone)]
pub struct HashingPool {
    params: HashParams,
    permits: Arc<Semaphore>,
}

impl HashingPool {
    pub fn new(params: HashParams, max_concurrent: usize) -> Self {
        Self {
            params,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    pub fn params(&self) -> &HashParams {
        &self.params
    }

    pub async fn hash(&self, plaintext: &str) -> Result<String> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| AppError::Internal(format!("Hashing pool closed: {}", e)))?;

        let plaintext = plaintext.to_owned();
        let params = self.params;
        tokio::task::spawn_blocking(move || hash_password(&plaintext, &params))
            .await
            .map_err(|e| AppError::Internal(format!("Hashing task failed: {}", e)))?
    }

    pub async fn verify(&self, plaintext: &str, stored_hash: &str) -> bool {
        let _permit = match self.permits.acquire().await {
            Ok(permit) => permit,
            Err(e) => {
                tracing::error!(error = %e, "hashing pool closed");
                return false;
            }
        };

        let plaintext = plaintext.to_owned();
        let stored_hash = stored_hash.to_owned();
        match tokio::task::spawn_blocking(move || verify_password(&plaintext, &stored_hash)).await
        {
            Ok(valid) => valid,
            Err(e) => {
                tracing::error!(error = %e, "password verification task failed");
                false
            }
        }
    }
}

#[cfg(test)]
pub(crate) fn fast_params() -> HashParams {
    HashParams {
        memory_kib: 8,
        iterations: 1,
        parallelism: 1,
    }
}
