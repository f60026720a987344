use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use super::interface::{AuthError, Result, TokenStore, UserStore};
use super::model::{AccessToken, TwoFactor, User};
use crate::services::{hashing, token, totp};

/// Tunables for the authentication core. Everything here comes from
/// `Config::from_env`.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    /// Issuer shown in authenticator apps and embedded in the otpauth URI.
    pub issuer: String,
    /// Accepted clock drift in time steps on either side of now.
    pub totp_window: u64,
    /// Keep the secret when 2FA is disabled so the user can re-enable
    /// without scanning a new QR code.
    pub retain_secret_on_disable: bool,
    /// Token lifetime; `None` means tokens never expire passively.
    pub token_ttl: Option<Duration>,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            issuer: "Auth API".to_string(),
            totp_window: totp::DEFAULT_WINDOW,
            retain_secret_on_disable: true,
            token_ttl: None,
        }
    }
}

/// Terminal outcomes of one login request.
///
/// `ChallengeRequired` is an expected intermediate result, not a failure:
/// the client holds valid credentials and must resubmit them together with
/// a code. Rejections travel as `AuthError`.
pub enum LoginOutcome {
    Complete { token: String, user: User },
    ChallengeRequired,
}

/// Result of a setup call: secret plus the URI a collaborator renders as a
/// QR code.
pub struct TwoFactorSetup {
    pub secret: String,
    pub otpauth_url: String,
}

/// The login state machine, enrollment operations, and token issuance over
/// the external stores. Stateless across requests: every call re-reads what
/// it needs and writes at most once.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    tokens: Arc<dyn TokenStore>,
    settings: AuthSettings,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        tokens: Arc<dyn TokenStore>,
        settings: AuthSettings,
    ) -> Self {
        Self {
            users,
            tokens,
            settings,
        }
    }

    pub fn settings(&self) -> &AuthSettings {
        &self.settings
    }

    // =========================================================================
    // REGISTRATION (plumbing; the core protocol starts at login)
    // =========================================================================

    pub async fn register(&self, email: &str, password: &str) -> Result<User> {
        let email = normalize_email(email);

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailAlreadyExists);
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            email,
            password_hash: hashing::hash_password(password)?,
            two_factor_secret: None,
            two_factor_enabled: false,
            last_login_at: None,
            last_login_ip: None,
            created_at: now,
            updated_at: now,
        };

        self.users.create(&user).await?;
        Ok(user)
    }

    // =========================================================================
    // CREDENTIAL VERIFIER
    // =========================================================================

    /// Look the user up by normalized email and check the password.
    ///
    /// Unknown email and wrong password produce the same error, and the
    /// unknown-email path burns an equivalent hashing cost so the two are
    /// indistinguishable by latency as well.
    async fn verify_credentials(&self, email: &str, password: &str) -> Result<User> {
        let user = match self.users.find_by_email(&normalize_email(email)).await? {
            Some(user) => user,
            None => {
                let _ = hashing::hash_password(password);
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !hashing::verify_password(password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(user)
    }

    // =========================================================================
    // SECOND-FACTOR POLICY
    // =========================================================================

    /// Decide whether this attempt still owes a second factor.
    ///
    /// Returns `true` when satisfied, `false` when a challenge is required.
    /// A present-but-wrong code is a rejection, never a challenge.
    fn evaluate_second_factor(&self, state: &TwoFactor, code: Option<&str>) -> Result<bool> {
        let TwoFactor::Enabled { secret } = state else {
            return Ok(true);
        };

        let Some(code) = code else {
            return Ok(false);
        };

        // In the login flow a malformed code is just a failed code: the
        // shape check still runs before any HMAC work, but the caller sees
        // one rejection reason.
        match totp::verify(secret, code, self.settings.totp_window) {
            Ok(true) => Ok(true),
            Ok(false) => Err(AuthError::InvalidTwoFactorCode),
            Err(totp::TotpError::MalformedCode) => Err(AuthError::InvalidTwoFactorCode),
            Err(e) => Err(e.into()),
        }
    }

    // =========================================================================
    // LOGIN ORCHESTRATOR
    // =========================================================================

    /// Drive one login attempt through the state machine:
    ///
    /// credentials bad            -> rejected (InvalidCredentials)
    /// 2FA off                    -> token issued
    /// 2FA on, no code            -> challenge required (nothing mutated)
    /// 2FA on, bad code           -> rejected (InvalidTwoFactorCode)
    /// 2FA on, good code          -> token issued
    ///
    /// Login metadata is only recorded when a token is actually issued.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        code: Option<&str>,
        ip: Option<&str>,
    ) -> Result<LoginOutcome> {
        let user = self.verify_credentials(email, password).await?;

        if !self.evaluate_second_factor(&user.two_factor(), code)? {
            tracing::debug!(user_id = %user.id, "login pending second factor");
            return Ok(LoginOutcome::ChallengeRequired);
        }

        let token = self.issue_token(&user.id).await?;

        let now = Utc::now();
        self.users.record_login(&user.id, now, ip).await?;

        tracing::info!(user_id = %user.id, "login succeeded");

        Ok(LoginOutcome::Complete { token, user })
    }

    /// Revoke the presented token. Unknown or already-revoked values succeed
    /// quietly.
    pub async fn logout(&self, token_value: &str) -> Result<()> {
        self.tokens.revoke(&token::hash_value(token_value)).await
    }

    // =========================================================================
    // TOKEN ISSUER
    // =========================================================================

    /// Mint an opaque token and persist its hash. A collision on the unique
    /// hash index gets one fresh attempt before giving up.
    async fn issue_token(&self, user_id: &str) -> Result<String> {
        for attempt in 0..2 {
            let value = token::generate_value()?;
            let now = Utc::now();

            let record = AccessToken {
                id: Uuid::new_v4().to_string(),
                user_id: user_id.to_string(),
                token_hash: token::hash_value(&value),
                abilities: "[\"*\"]".to_string(),
                expires_at: self.settings.token_ttl.map(|ttl| now + ttl),
                last_used_at: None,
                created_at: now,
            };

            match self.tokens.create(&record).await {
                Ok(()) => return Ok(value),
                Err(AuthError::TokenCollision) if attempt == 0 => {
                    tracing::warn!(user_id, "token hash collision, regenerating");
                }
                Err(e) => return Err(e),
            }
        }

        Err(AuthError::TokenCollision)
    }

    /// Resolve a presented bearer value to its user, enforcing passive
    /// expiry and stamping `last_used_at`.
    pub async fn authenticate(&self, token_value: &str) -> Result<User> {
        let hash = token::hash_value(token_value);

        let Some(record) = self.tokens.find_by_hash(&hash).await? else {
            return Err(AuthError::Unauthenticated);
        };

        let now = Utc::now();
        if record.is_expired(now) {
            return Err(AuthError::Unauthenticated);
        }

        let Some(user) = self.users.find_by_id(&record.user_id).await? else {
            return Err(AuthError::Unauthenticated);
        };

        self.tokens.touch(&record.id, now).await?;

        Ok(user)
    }

    // =========================================================================
    // ENROLLMENT
    // =========================================================================

    /// Issue (or re-issue) the secret for this user.
    ///
    /// Idempotent while unconfirmed: calling setup twice returns the same
    /// secret, so a user who navigates away mid-setup can pick up where they
    /// left off. Never touches the enabled flag.
    pub async fn setup_two_factor(&self, user: &User) -> Result<TwoFactorSetup> {
        // Re-read so a concurrent confirm/disable is not overwritten with
        // stale state.
        let current = self
            .users
            .find_by_id(&user.id)
            .await?
            .ok_or(AuthError::Unauthenticated)?;

        let secret = match current.two_factor() {
            TwoFactor::Provisioned { secret } | TwoFactor::Enabled { secret } => secret,
            TwoFactor::Unprovisioned => {
                let secret = totp::generate_secret()?;
                self.users
                    .set_two_factor(&current.id, &TwoFactor::Provisioned { secret: secret.clone() })
                    .await?;
                secret
            }
        };

        let otpauth_url = totp::provisioning_uri(&self.settings.issuer, &current.email, &secret);

        Ok(TwoFactorSetup { secret, otpauth_url })
    }

    /// Confirm enrollment with a live code, flipping the state to enabled.
    pub async fn confirm_two_factor(&self, user: &User, code: &str) -> Result<()> {
        let current = self
            .users
            .find_by_id(&user.id)
            .await?
            .ok_or(AuthError::Unauthenticated)?;

        let state = current.two_factor();
        let Some(secret) = state.secret() else {
            return Err(AuthError::NotProvisioned);
        };

        if !totp::verify(secret, code, self.settings.totp_window)? {
            return Err(AuthError::InvalidTwoFactorCode);
        }

        self.users
            .set_two_factor(&current.id, &TwoFactor::Enabled { secret: secret.to_string() })
            .await?;

        tracing::info!(user_id = %current.id, "two-factor enabled");
        Ok(())
    }

    /// Disable 2FA after checking a live code. Already-disabled users get a
    /// quiet success so the operation is idempotent.
    pub async fn disable_two_factor(&self, user: &User, code: &str) -> Result<()> {
        let current = self
            .users
            .find_by_id(&user.id)
            .await?
            .ok_or(AuthError::Unauthenticated)?;

        let TwoFactor::Enabled { secret } = current.two_factor() else {
            return Ok(());
        };

        if !totp::verify(&secret, code, self.settings.totp_window)? {
            return Err(AuthError::InvalidTwoFactorCode);
        }

        let next = if self.settings.retain_secret_on_disable {
            TwoFactor::Provisioned { secret }
        } else {
            TwoFactor::Unprovisioned
        };

        self.users.set_two_factor(&current.id, &next).await?;

        tracing::info!(user_id = %current.id, "two-factor disabled");
        Ok(())
    }
}
