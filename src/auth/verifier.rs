use crate::auth::error::AuthError;
use crate::auth::token::{fingerprint, Claims, TokenCodec};
use crate::db::{PrincipalStore, User};
use crate::types::{Result, Role};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Claims of a verified token together with the user as currently stored.
#[derive(Debug, Clone)]
pub struct LoadedPrincipal {
    pub claims: Claims,
    pub user: User,
}

impl LoadedPrincipal {
    /// Both the token and the stored account say admin.
    pub fn is_current_admin(&self) -> bool {
        self.claims.role == Role::Admin && self.user.role == Role::Admin
    }

    /// Current admins may act on any account; everyone else only on their own.
    pub fn can_manage(&self, owner_id: &str) -> bool {
        self.is_current_admin() || self.user.id == owner_id
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
///
/// The scheme is matched case-insensitively. A missing header or an empty
/// token is `MissingToken`; any other scheme is `MalformedToken`.
pub fn bearer_token(header: Option<&str>) -> std::result::Result<&str, AuthError> {
    let value = header.map(str::trim).unwrap_or_default();
    if value.is_empty() {
        return Err(AuthError::MissingToken);
    }

    let (scheme, token) = value.split_once(' ').unwrap_or((value, ""));
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::MalformedToken);
    }

    match token.trim() {
        "" => Err(AuthError::MissingToken),
        token => Ok(token),
    }
}

/// Stateless session token verification.
pub struct TokenVerifier {
    codec: Arc<TokenCodec>,
}

impl TokenVerifier {
    pub fn new(codec: Arc<TokenCodec>) -> Self {
        Self { codec }
    }

    pub fn verify(&self, token: &str) -> std::result::Result<Claims, AuthError> {
        self.verify_at(token, Utc::now())
    }

    /// Decode, then expiry, then signature. The first failing step decides the error.
    pub fn verify_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> std::result::Result<Claims, AuthError> {
        let claims = self.codec.decode_unverified(token).inspect_err(|_| {
            tracing::debug!(token = %fingerprint(token), "rejected malformed token");
        })?;

        if !claims.is_live_at(now) {
            tracing::debug!(token = %fingerprint(token), exp = ?claims.exp, "rejected expired token");
            return Err(AuthError::Expired);
        }

        self.codec.verify_signature(token).inspect_err(|err| {
            tracing::warn!(token = %fingerprint(token), error = %err, "rejected token signature");
        })
    }

    pub fn verify_and_require_role(
        &self,
        token: &str,
        required: Role,
    ) -> std::result::Result<Claims, AuthError> {
        self.verify_and_require_any(token, &[required])
    }

    /// Like [`TokenVerifier::verify`], additionally requiring the token's role
    /// to be one of `allowed`.
    pub fn verify_and_require_any(
        &self,
        token: &str,
        allowed: &[Role],
    ) -> std::result::Result<Claims, AuthError> {
        let claims = self.verify(token)?;

        if !allowed.contains(&claims.role) {
            tracing::info!(
                user_id = %claims.sub,
                role = %claims.role,
                "role not permitted"
            );
            return Err(AuthError::Forbidden);
        }

        Ok(claims)
    }

    /// Verifies the token, then re-reads the user so that deleted or demoted
    /// accounts are rejected even while their token is unexpired.
    ///
    /// The store is only consulted once the token itself is valid.
    pub async fn verify_and_load_principal<S>(&self, token: &str, store: &S) -> Result<LoadedPrincipal>
    where
        S: PrincipalStore + ?Sized,
    {
        let claims = self.verify(token)?;
        self.load_principal(claims, store).await
    }

    /// Looks up the holder of already verified claims.
    pub async fn load_principal<S>(&self, claims: Claims, store: &S) -> Result<LoadedPrincipal>
    where
        S: PrincipalStore + ?Sized,
    {
        match store.find_privileged_by_id(&claims.sub).await? {
            Some(user) => Ok(LoadedPrincipal { claims, user }),
            None => {
                tracing::info!(user_id = %claims.sub, "token holder no longer privileged");
                Err(AuthError::StaleCredential.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token::DEFAULT_TOKEN_TTL_SECS;
    use crate::db::traits::MockPrincipalStore;
    use crate::types::AppError;
    use chrono::Duration;
    use rstest::rstest;

    const SECRET: &str = "verifier-test-secret-with-32-plus-bytes";

    fn codec() -> Arc<TokenCodec> {
        Arc::new(TokenCodec::new(SECRET, DEFAULT_TOKEN_TTL_SECS))
    }

    fn user(role: Role) -> User {
        User {
            id: "user-7".to_string(),
            name: "Autor".to_string(),
            email: "autor@blog.com".to_string(),
            password_hash: "unused".to_string(),
            role,
            avatar: None,
            bio: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn token_for(role: Role, issued: DateTime<Utc>) -> String {
        let codec = codec();
        codec.encode(&codec.claims_for(&user(role), issued).unwrap()).unwrap()
    }

    #[rstest]
    #[case(Some("Bearer abc.def.ghi"), Ok("abc.def.ghi"))]
    #[case(Some("bearer abc"), Ok("abc"))]
    #[case(Some("  Bearer   abc  "), Ok("abc"))]
    #[case(None, Err(AuthError::MissingToken))]
    #[case(Some(""), Err(AuthError::MissingToken))]
    #[case(Some("Bearer "), Err(AuthError::MissingToken))]
    #[case(Some("Basic dXNlcjpwdw=="), Err(AuthError::MalformedToken))]
    #[case(Some("abc.def.ghi"), Err(AuthError::MalformedToken))]
    fn test_bearer_token(
        #[case] header: Option<&str>,
        #[case] expected: std::result::Result<&str, AuthError>,
    ) {
        assert_eq!(bearer_token(header), expected);
    }

    #[test]
    fn test_valid_token_verifies() {
        let verifier = TokenVerifier::new(codec());
        let claims = verifier
            .verify(&token_for(Role::Author, Utc::now()))
            .expect("fresh token should verify");

        assert_eq!(claims.sub, "user-7");
        assert_eq!(claims.role, Role::Author);
    }

    #[test]
    fn test_verify_is_idempotent() {
        let verifier = TokenVerifier::new(codec());
        let token = token_for(Role::Admin, Utc::now());

        assert_eq!(verifier.verify(&token), verifier.verify(&token));
        assert!(verifier.verify(&token).is_ok());
    }

    #[test]
    fn test_token_expired_one_second_ago() {
        let codec = codec();
        let now = Utc::now();
        let mut claims = codec.claims_for(&user(Role::Admin), now).unwrap();
        claims.exp = Some((now - Duration::seconds(1)).timestamp());
        let token = codec.encode(&claims).unwrap();

        assert_eq!(
            TokenVerifier::new(codec).verify_at(&token, now),
            Err(AuthError::Expired)
        );
    }

    #[test]
    fn test_token_expires_after_ttl() {
        let verifier = TokenVerifier::new(codec());
        let issued = Utc::now();
        let token = token_for(Role::Admin, issued);

        let just_before = issued + Duration::seconds(DEFAULT_TOKEN_TTL_SECS - 1);
        let at_expiry = issued + Duration::seconds(DEFAULT_TOKEN_TTL_SECS);

        assert!(verifier.verify_at(&token, just_before).is_ok());
        assert_eq!(verifier.verify_at(&token, at_expiry), Err(AuthError::Expired));
    }

    #[test]
    fn test_missing_expiry_is_expired() {
        let codec = codec();
        let mut claims = codec.claims_for(&user(Role::Admin), Utc::now()).unwrap();
        claims.exp = None;
        let token = codec.encode(&claims).unwrap();

        assert_eq!(
            TokenVerifier::new(codec).verify(&token),
            Err(AuthError::Expired)
        );
    }

    #[test]
    fn test_expired_wins_over_bad_signature() {
        let issued = Utc::now() - Duration::days(2);
        let foreign = TokenCodec::new("some-other-secret-also-32-bytes-long", 60);
        let token = foreign
            .encode(&foreign.claims_for(&user(Role::Admin), issued).unwrap())
            .unwrap();

        assert_eq!(
            TokenVerifier::new(codec()).verify(&token),
            Err(AuthError::Expired)
        );
    }

    #[test]
    fn test_foreign_signature_rejected() {
        let foreign = TokenCodec::new("some-other-secret-also-32-bytes-long", 3600);
        let token = foreign
            .encode(&foreign.claims_for(&user(Role::Admin), Utc::now()).unwrap())
            .unwrap();

        assert_eq!(
            TokenVerifier::new(codec()).verify(&token),
            Err(AuthError::InvalidSignature)
        );
    }

    #[test]
    fn test_garbage_is_malformed() {
        let verifier = TokenVerifier::new(codec());

        assert_eq!(verifier.verify("not-a-token"), Err(AuthError::MalformedToken));
    }

    #[rstest]
    #[case(Role::Admin, Role::Admin, true)]
    #[case(Role::Author, Role::Admin, false)]
    #[case(Role::Author, Role::Author, true)]
    #[case(Role::Admin, Role::Author, false)]
    fn test_verify_and_require_role(
        #[case] held: Role,
        #[case] required: Role,
        #[case] allowed: bool,
    ) {
        let verifier = TokenVerifier::new(codec());
        let result = verifier.verify_and_require_role(&token_for(held, Utc::now()), required);

        if allowed {
            assert_eq!(result.map(|c| c.role), Ok(held));
        } else {
            assert_eq!(result, Err(AuthError::Forbidden));
        }
    }

    #[test]
    fn test_require_any_accepts_allowed_set() {
        let verifier = TokenVerifier::new(codec());
        let token = token_for(Role::Author, Utc::now());

        assert!(verifier
            .verify_and_require_any(&token, &Role::PRIVILEGED)
            .is_ok());
    }

    #[test]
    fn test_role_gate_does_not_mask_token_errors() {
        let verifier = TokenVerifier::new(codec());

        assert_eq!(
            verifier.verify_and_require_role("garbage", Role::Admin),
            Err(AuthError::MalformedToken)
        );
    }

    #[tokio::test]
    async fn test_load_principal_returns_current_user() {
        let mut store = MockPrincipalStore::new();
        store
            .expect_find_privileged_by_id()
            .times(1)
            .returning(|id| {
                assert_eq!(id, "user-7");
                Ok(Some(user(Role::Author)))
            });

        let verifier = TokenVerifier::new(codec());
        let loaded = verifier
            .verify_and_load_principal(&token_for(Role::Author, Utc::now()), &store)
            .await
            .expect("user still exists");

        assert_eq!(loaded.user.id, "user-7");
        assert_eq!(loaded.claims.role, Role::Author);
    }

    #[tokio::test]
    async fn test_deleted_or_demoted_user_is_stale() {
        let mut store = MockPrincipalStore::new();
        store
            .expect_find_privileged_by_id()
            .returning(|_| Ok(None));

        let verifier = TokenVerifier::new(codec());
        let result = verifier
            .verify_and_load_principal(&token_for(Role::Admin, Utc::now()), &store)
            .await;

        assert!(matches!(
            result,
            Err(AppError::Auth(AuthError::StaleCredential))
        ));
    }

    #[rstest]
    #[case(Role::Admin, Role::Admin, "someone-else", true)]
    #[case(Role::Admin, Role::Author, "someone-else", false)]
    #[case(Role::Author, Role::Author, "user-7", true)]
    #[case(Role::Author, Role::Author, "someone-else", false)]
    fn test_can_manage(
        #[case] token_role: Role,
        #[case] stored_role: Role,
        #[case] owner: &str,
        #[case] expected: bool,
    ) {
        let codec = codec();
        let principal = LoadedPrincipal {
            claims: codec.claims_for(&user(token_role), Utc::now()).unwrap(),
            user: user(stored_role),
        };

        assert_eq!(principal.can_manage(owner), expected);
    }

    #[tokio::test]
    async fn test_invalid_token_never_touches_store() {
        let mut store = MockPrincipalStore::new();
        store.expect_find_privileged_by_id().never();

        let verifier = TokenVerifier::new(codec());
        let expired = token_for(Role::Admin, Utc::now() - Duration::days(3));

        let result = verifier.verify_and_load_principal(&expired, &store).await;
        assert!(matches!(result, Err(AppError::Auth(AuthError::Expired))));

        let result = verifier.verify_and_load_principal("junk", &store).await;
        assert!(matches!(
            result,
            Err(AppError::Auth(AuthError::MalformedToken))
        ));
    }
}
