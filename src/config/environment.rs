use std::env;

use chrono::Duration;

use crate::modules::auth::service::AuthSettings;
use crate::services::totp;

/// Environment configuration
/// Loads and validates environment variables
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub issuer: String,
    pub totp_window: u64,
    pub retain_secret_on_disable: bool,
    pub token_ttl_days: Option<i64>,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        dotenvy::dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set".to_string())?;

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let issuer = env::var("APP_NAME").unwrap_or_else(|_| "Auth API".to_string());

        let totp_window = match env::var("TOTP_WINDOW") {
            Ok(v) => v
                .parse::<u64>()
                .map_err(|_| "TOTP_WINDOW must be a non-negative integer".to_string())?,
            Err(_) => totp::DEFAULT_WINDOW,
        };

        let retain_secret_on_disable = match env::var("TWO_FACTOR_RETAIN_SECRET") {
            Ok(v) => v
                .parse::<bool>()
                .map_err(|_| "TWO_FACTOR_RETAIN_SECRET must be true or false".to_string())?,
            Err(_) => true,
        };

        // Unset or empty means tokens never expire passively.
        let token_ttl_days = match env::var("TOKEN_TTL_DAYS") {
            Ok(v) if v.trim().is_empty() => None,
            Ok(v) => Some(
                v.parse::<i64>()
                    .map_err(|_| "TOKEN_TTL_DAYS must be an integer".to_string())?,
            ),
            Err(_) => None,
        };

        Ok(Self {
            database_url,
            bind_addr,
            issuer,
            totp_window,
            retain_secret_on_disable,
            token_ttl_days,
        })
    }

    pub fn auth_settings(&self) -> AuthSettings {
        AuthSettings {
            issuer: self.issuer.clone(),
            totp_window: self.totp_window,
            retain_secret_on_disable: self.retain_secret_on_disable,
            token_ttl: self.token_ttl_days.map(Duration::days),
        }
    }
}
