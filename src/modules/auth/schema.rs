use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

// =============================================================================
// REGISTER
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user: UserResponse,
}

// =============================================================================
// LOGIN
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// 6-digit TOTP code; required on the second step when 2FA is enabled.
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: &'static str,
    pub user: UserResponse,
}

/// Signal that credentials were accepted but a code is still owed. The
/// client resubmits email and password together with the code.
#[derive(Debug, Serialize)]
pub struct LoginPendingResponse {
    pub status: &'static str,
    pub message: &'static str,
}

impl LoginPendingResponse {
    pub fn new() -> Self {
        Self {
            status: "PENDING_2FA",
            message: "Two-factor authentication required. Please provide a 6-digit code.",
        }
    }
}

impl Default for LoginPendingResponse {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// LOGOUT
// =============================================================================

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub message: &'static str,
}

// =============================================================================
// ME (Current User)
// =============================================================================

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub two_factor_enabled: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&crate::modules::auth::model::User> for UserResponse {
    fn from(user: &crate::modules::auth::model::User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            two_factor_enabled: user.two_factor_enabled,
            last_login_at: user.last_login_at,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

// =============================================================================
// TWO-FACTOR ENROLLMENT
// =============================================================================

#[derive(Debug, Serialize)]
pub struct TwoFactorSetupResponse {
    pub secret: String,
    /// otpauth:// URI for the client to render as a QR code.
    pub otpauth_url: String,
}

#[derive(Debug, Deserialize)]
pub struct TwoFactorCodeRequest {
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct TwoFactorStatusResponse {
    pub message: &'static str,
    pub two_factor_enabled: bool,
}

// =============================================================================
// ERROR RESPONSE
// =============================================================================

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: None,
        }
    }
}
