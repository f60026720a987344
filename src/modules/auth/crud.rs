use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySql, Pool};

use super::interface::{AuthError, Result, TokenStore, UserStore};
use super::model::{AccessToken, TwoFactor, User};

/// MySQL-backed user store.
#[derive(Clone)]
pub struct MySqlUserStore {
    pool: Pool<MySql>,
}

impl MySqlUserStore {
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl UserStore for MySqlUserStore {
    async fn create(&self, user: &User) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO users
                (id, email, password_hash, two_factor_secret, two_factor_enabled,
                 last_login_at, last_login_ip, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.two_factor_secret)
        .bind(user.two_factor_enabled)
        .bind(user.last_login_at)
        .bind(&user.last_login_ip)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            // Unique index on email backs up the pre-insert existence check
            Err(e) if is_unique_violation(&e) => Err(AuthError::EmailAlreadyExists),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        Ok(sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn set_two_factor(&self, user_id: &str, state: &TwoFactor) -> Result<()> {
        let (secret, enabled) = state.to_columns();

        sqlx::query(
            r#"
            UPDATE users
            SET two_factor_secret = ?, two_factor_enabled = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(secret)
        .bind(enabled)
        .bind(Utc::now())
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn record_login(
        &self,
        user_id: &str,
        at: DateTime<Utc>,
        ip: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET last_login_at = ?, last_login_ip = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(at)
        .bind(ip)
        .bind(at)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// MySQL-backed token store. `token_hash` carries a unique index; inserting
/// a duplicate surfaces as `TokenCollision` so the issuer can retry with a
/// fresh value.
#[derive(Clone)]
pub struct MySqlTokenStore {
    pool: Pool<MySql>,
}

impl MySqlTokenStore {
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenStore for MySqlTokenStore {
    async fn create(&self, token: &AccessToken) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO access_tokens
                (id, user_id, token_hash, abilities, expires_at, last_used_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&token.id)
        .bind(&token.user_id)
        .bind(&token.token_hash)
        .bind(&token.abilities)
        .bind(token.expires_at)
        .bind(token.last_used_at)
        .bind(token.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(AuthError::TokenCollision),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<AccessToken>> {
        Ok(sqlx::query_as::<_, AccessToken>(
            "SELECT * FROM access_tokens WHERE token_hash = ?",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn touch(&self, token_id: &str, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE access_tokens SET last_used_at = ? WHERE id = ?")
            .bind(at)
            .bind(token_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn revoke(&self, token_hash: &str) -> Result<()> {
        // Zero rows affected means the token was already gone; still success.
        sqlx::query("DELETE FROM access_tokens WHERE token_hash = ?")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
