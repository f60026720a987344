use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::interface::{AuthError, Result, TokenStore, UserStore};
use super::model::{AccessToken, TwoFactor, User};

/// HashMap-backed user store. Suitable for tests and local development;
/// everything is lost on restart.
#[derive(Clone, Default)]
pub struct InMemoryUserStore {
    users: Arc<RwLock<HashMap<String, User>>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn create(&self, user: &User) -> Result<()> {
        let mut users = self.users.write().await;

        if users.values().any(|u| u.email == user.email) {
            return Err(AuthError::EmailAlreadyExists);
        }

        users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn set_two_factor(&self, user_id: &str, state: &TwoFactor) -> Result<()> {
        let mut users = self.users.write().await;

        if let Some(user) = users.get_mut(user_id) {
            let (secret, enabled) = state.to_columns();
            user.two_factor_secret = secret.map(String::from);
            user.two_factor_enabled = enabled;
            user.updated_at = Utc::now();
        }

        Ok(())
    }

    async fn record_login(
        &self,
        user_id: &str,
        at: DateTime<Utc>,
        ip: Option<&str>,
    ) -> Result<()> {
        let mut users = self.users.write().await;

        if let Some(user) = users.get_mut(user_id) {
            user.last_login_at = Some(at);
            user.last_login_ip = ip.map(String::from);
            user.updated_at = at;
        }

        Ok(())
    }
}

/// HashMap-backed token store keyed by token hash.
#[derive(Clone, Default)]
pub struct InMemoryTokenStore {
    tokens: Arc<RwLock<HashMap<String, AccessToken>>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live tokens; handy for asserting issuance in tests.
    pub async fn count(&self) -> usize {
        self.tokens.read().await.len()
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn create(&self, token: &AccessToken) -> Result<()> {
        let mut tokens = self.tokens.write().await;

        if tokens.contains_key(&token.token_hash) {
            return Err(AuthError::TokenCollision);
        }

        tokens.insert(token.token_hash.clone(), token.clone());
        Ok(())
    }

    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<AccessToken>> {
        Ok(self.tokens.read().await.get(token_hash).cloned())
    }

    async fn touch(&self, token_id: &str, at: DateTime<Utc>) -> Result<()> {
        let mut tokens = self.tokens.write().await;

        if let Some(token) = tokens.values_mut().find(|t| t.id == token_id) {
            token.last_used_at = Some(at);
        }

        Ok(())
    }

    async fn revoke(&self, token_hash: &str) -> Result<()> {
        // Unknown hash is fine: revocation is idempotent.
        self.tokens.write().await.remove(token_hash);
        Ok(())
    }
}
