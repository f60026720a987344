use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Second-factor enrollment state.
///
/// The two underlying columns (`two_factor_secret`, `two_factor_enabled`) are
/// only ever read and written through this enum, so "enabled without a
/// secret" cannot be produced by normal code paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TwoFactor {
    /// No secret has been issued.
    Unprovisioned,
    /// A secret exists but has not been confirmed with a valid code yet.
    /// Repeated setup calls in this state return the same secret.
    Provisioned { secret: String },
    /// A valid code has been verified; login requires a code from now on.
    Enabled { secret: String },
}

impl TwoFactor {
    pub fn is_enabled(&self) -> bool {
        matches!(self, TwoFactor::Enabled { .. })
    }

    pub fn secret(&self) -> Option<&str> {
        match self {
            TwoFactor::Unprovisioned => None,
            TwoFactor::Provisioned { secret } | TwoFactor::Enabled { secret } => Some(secret),
        }
    }

    /// Reconstruct the state from the raw columns. An enabled flag with no
    /// secret violates the store invariant; it is treated as unprovisioned
    /// rather than letting the impossible combination propagate.
    pub fn from_columns(secret: Option<String>, enabled: bool) -> Self {
        match (secret, enabled) {
            (Some(secret), true) => TwoFactor::Enabled { secret },
            (Some(secret), false) => TwoFactor::Provisioned { secret },
            (None, true) => {
                tracing::warn!("two_factor_enabled set without a secret, treating as unprovisioned");
                TwoFactor::Unprovisioned
            }
            (None, false) => TwoFactor::Unprovisioned,
        }
    }

    /// The raw column values this state persists as.
    pub fn to_columns(&self) -> (Option<&str>, bool) {
        match self {
            TwoFactor::Unprovisioned => (None, false),
            TwoFactor::Provisioned { secret } => (Some(secret), false),
            TwoFactor::Enabled { secret } => (Some(secret), true),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub two_factor_secret: Option<String>,
    pub two_factor_enabled: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub last_login_ip: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn two_factor(&self) -> TwoFactor {
        TwoFactor::from_columns(self.two_factor_secret.clone(), self.two_factor_enabled)
    }
}

/// Opaque bearer token row. `token_hash` is the SHA-256 of the plaintext
/// value; the plaintext itself is returned once at issuance and never stored.
#[derive(Debug, Clone, FromRow)]
pub struct AccessToken {
    pub id: String,
    pub user_id: String,
    pub token_hash: String,
    /// JSON array of ability scopes, e.g. `["*"]`.
    pub abilities: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}
