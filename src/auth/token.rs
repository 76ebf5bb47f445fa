//! Session token claims and their signed wire encoding.
//!
//! Tokens are compact HS256 JWS strings:
//! `base64url(header) "." base64url(claims) "." base64url(hmac_sha256)`.
//! Nothing is stored server-side; a token is valid until its `exp` passes.

use crate::auth::error::AuthError;
use crate::db::User;
use crate::types::{AppError, Result, Role};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Token lifetime used when the configuration does not override it.
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 24 * 60 * 60;

/// Longest token lifetime the configuration accepts (one year).
pub const MAX_TOKEN_TTL_SECS: i64 = 365 * 24 * 60 * 60;

/// Claims carried inside a session token.
///
/// `role` and `email` are a snapshot taken at issuance; later changes to the
/// stored user are not reflected until a new token is issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Claims {
    /// Subject: the user's id
    pub sub: String,
    pub email: String,
    pub role: Role,
    /// Issued-at, unix seconds
    pub iat: i64,
    /// Expiry, unix seconds. Absent only on hand-built tokens, which verify as expired.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

impl Claims {
    /// True when the expiry is present and strictly after `now`.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.exp, Some(exp) if exp > now.timestamp())
    }
}

/// Signs and decodes session tokens with a process-wide HMAC secret.
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: i64,
}

impl TokenCodec {
    /// # Arguments
    /// * `secret` - HMAC key (at least 32 bytes; enforced by config validation)
    /// * `ttl_secs` - Token validity in seconds
    pub fn new(secret: &str, ttl_secs: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_secs,
        }
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    /// Claims for `user` issued at `now`, expiring exactly one TTL later.
    ///
    /// Fails with `Internal` when the expiry is not representable.
    pub fn claims_for(&self, user: &User, now: DateTime<Utc>) -> Result<Claims> {
        let exp = Duration::try_seconds(self.ttl_secs)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| {
                AppError::Internal(format!("Token TTL of {}s overflows expiry", self.ttl_secs))
            })?;

        Ok(Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: Some(exp.timestamp()),
        })
    }

    pub fn encode(&self, claims: &Claims) -> Result<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("Failed to generate token: {}", e)))
    }

    /// Parses the token structure and claims without checking the signature.
    ///
    /// The result must not be trusted until [`TokenCodec::verify_signature`]
    /// succeeds on the same token.
    pub fn decode_unverified(&self, token: &str) -> std::result::Result<Claims, AuthError> {
        let mut validation = base_validation();
        validation.insecure_disable_signature_validation();

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "token failed structural decode");
                AuthError::MalformedToken
            })
    }

    /// Recomputes the HMAC over header and claims and compares it to the
    /// presented signature.
    pub fn verify_signature(&self, token: &str) -> std::result::Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding, &base_validation())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    AuthError::InvalidSignature
                }
                _ => AuthError::MalformedToken,
            })
    }
}

/// HS256 only; expiry is checked by the verifier so that a missing or past
/// `exp` is reported before the signature.
fn base_validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.required_spec_claims.clear();
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.leeway = 0;
    validation
}

/// Short SHA-256 prefix identifying a token in logs without revealing it.
pub fn fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex::encode(&digest[..6])
}
