use crate::auth::error::AuthError;
use crate::auth::password::{hash_password, HashingPool};
use crate::auth::token::{fingerprint, Claims, TokenCodec};
use crate::db::PrincipalStore;
use crate::types::{AppError, PublicProfile, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// A freshly minted session token and the profile it was issued for.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub claims: Claims,
    pub user: PublicProfile,
}

/// Exchanges an email and password for a signed session token.
pub struct CredentialIssuer {
    store: Arc<dyn PrincipalStore>,
    hasher: HashingPool,
    codec: Arc<TokenCodec>,
    // Verified against when no user matches, so both failure paths cost the same.
    decoy_hash: OnceCell<String>,
}

impl CredentialIssuer {
    pub fn new(store: Arc<dyn PrincipalStore>, hasher: HashingPool, codec: Arc<TokenCodec>) -> Self {
        Self {
            store,
            hasher,
            codec,
            decoy_hash: OnceCell::new(),
        }
    }

    pub async fn authenticate(&self, email: &str, password: &str) -> Result<IssuedSession> {
        self.authenticate_at(email, password, Utc::now()).await
    }

    /// Same as [`CredentialIssuer::authenticate`] with an explicit issuance time.
    ///
    /// Every failure surfaces as `InvalidCredentials`; the specific reason is
    /// only logged.
    pub async fn authenticate_at(
        &self,
        email: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<IssuedSession> {
        let Some(user) = self.store.find_privileged_by_email(email).await? else {
            let decoy = self.decoy_hash().await?;
            let _ = self.hasher.verify(password, decoy).await;
            tracing::info!(email = %email, reason = "no privileged user", "login rejected");
            return Err(AuthError::InvalidCredentials.into());
        };

        if !self.hasher.verify(password, &user.password_hash).await {
            tracing::info!(email = %email, user_id = %user.id, reason = "wrong password", "login rejected");
            return Err(AuthError::InvalidCredentials.into());
        }

        let claims = self.codec.claims_for(&user, now)?;
        let token = self.codec.encode(&claims)?;

        tracing::info!(
            user_id = %user.id,
            role = %user.role,
            token = %fingerprint(&token),
            "session token issued"
        );

        Ok(IssuedSession {
            token,
            claims,
            user: user.profile(),
        })
    }

    async fn decoy_hash(&self) -> Result<&String> {
        let params = *self.hasher.params();
        self.decoy_hash
            .get_or_try_init(|| async move {
                tokio::task::spawn_blocking(move || {
                    hash_password("decoy-password-never-matches", &params)
                })
                .await
                .map_err(|e| AppError::Internal(format!("Hashing task failed: {}", e)))?
            })
            .await
    }
}
