use axum::http::StatusCode;

/// Why a request failed to authenticate or authorize.
///
/// Every variant is terminal: none of them is retried server-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("no bearer token presented")]
    MissingToken,

    #[error("token could not be decoded")]
    MalformedToken,

    #[error("token expired or carries no expiry")]
    Expired,

    #[error("token signature does not match")]
    InvalidSignature,

    #[error("role not permitted for this operation")]
    Forbidden,

    #[error("account no longer exists or lost its privileges")]
    StaleCredential,

    #[error("invalid credentials")]
    InvalidCredentials,
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    /// Message placed in the response body. All login failures share one message.
    pub fn client_message(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "Authorization token required",
            AuthError::MalformedToken => "Invalid token",
            AuthError::Expired => "Token expired",
            AuthError::InvalidSignature => "Invalid token signature",
            AuthError::Forbidden => "Insufficient permissions",
            AuthError::StaleCredential => "Credential no longer valid",
            AuthError::InvalidCredentials => "Invalid credentials",
        }
    }
}
