use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::{AccessToken, TwoFactor, User};

// =============================================================================
// STORE TRAITS
// =============================================================================

pub type Result<T> = std::result::Result<T, AuthError>;

/// External user store. The core only reads and writes the fields named
/// here; everything else on the user record is somebody else's business.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, user: &User) -> Result<()>;
    async fn find_by_id(&self, id: &str) -> Result<Option<User>>;
    /// Lookup by already-normalized email.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    /// Persist a new enrollment state. Must be an atomic write of both
    /// underlying columns.
    async fn set_two_factor(&self, user_id: &str, state: &TwoFactor) -> Result<()>;
    /// Record login metadata on full login success only.
    async fn record_login(
        &self,
        user_id: &str,
        at: DateTime<Utc>,
        ip: Option<&str>,
    ) -> Result<()>;
}

/// External bearer-token store, indexed by token hash.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Persist a freshly issued token. A hash collision with an existing row
    /// must come back as `AuthError::TokenCollision`.
    async fn create(&self, token: &AccessToken) -> Result<()>;
    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<AccessToken>>;
    async fn touch(&self, token_id: &str, at: DateTime<Utc>) -> Result<()>;
    /// Delete by hash. Revoking an unknown hash is a no-op, not an error.
    async fn revoke(&self, token_hash: &str) -> Result<()>;
}

// =============================================================================
// ERROR TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Unknown email and wrong password collapse into this one variant so
    /// callers cannot tell them apart.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid two-factor code")]
    InvalidTwoFactorCode,

    /// Submitted code is not exactly six digits; rejected before any
    /// cryptographic work.
    #[error("Code must be exactly 6 digits")]
    MalformedCode,

    /// Confirm/disable called without a provisioned secret.
    #[error("Two-factor authentication has not been set up")]
    NotProvisioned,

    #[error("Email already exists")]
    EmailAlreadyExists,

    #[error("Unauthenticated")]
    Unauthenticated,

    /// Randomness was unavailable. Fatal for the request, never retried
    /// silently and never detailed to the client.
    #[error("Entropy source failure: {0}")]
    EntropySource(String),

    /// Token value collided with an existing row even after a retry.
    #[error("Token generation collision")]
    TokenCollision,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Hashing error: {0}")]
    Hashing(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::InvalidTwoFactorCode => StatusCode::UNAUTHORIZED,
            Self::MalformedCode => StatusCode::BAD_REQUEST,
            Self::NotProvisioned => StatusCode::BAD_REQUEST,
            Self::EmailAlreadyExists => StatusCode::CONFLICT,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::EntropySource(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::TokenCollision => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Hashing(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to put in a response body. Server-side failures are
    /// collapsed into one opaque line; rejection messages stay generic so
    /// they leak nothing about which check failed first.
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "Invalid credentials",
            Self::InvalidTwoFactorCode => "Invalid or expired two-factor code",
            Self::MalformedCode => "Code must be exactly 6 digits",
            Self::NotProvisioned => "Two-factor authentication has not been set up",
            Self::EmailAlreadyExists => "Email already exists",
            Self::Unauthenticated => "Unauthenticated",
            Self::EntropySource(_)
            | Self::TokenCollision
            | Self::Database(_)
            | Self::Hashing(_)
            | Self::Internal(_) => "Internal server error",
        }
    }
}

impl From<crate::services::totp::TotpError> for AuthError {
    fn from(err: crate::services::totp::TotpError) -> Self {
        use crate::services::totp::TotpError;
        match err {
            TotpError::Entropy(e) => AuthError::EntropySource(e),
            TotpError::MalformedCode => AuthError::MalformedCode,
            TotpError::InvalidSecret => {
                AuthError::Internal("stored two-factor secret is unreadable".into())
            }
        }
    }
}

impl From<crate::services::token::TokenError> for AuthError {
    fn from(err: crate::services::token::TokenError) -> Self {
        match err {
            crate::services::token::TokenError::Entropy(e) => AuthError::EntropySource(e),
        }
    }
}

impl From<argon2::password_hash::Error> for AuthError {
    fn from(err: argon2::password_hash::Error) -> Self {
        AuthError::Hashing(err.to_string())
    }
}
