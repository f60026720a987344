mod common;

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use axum_test::TestServer;
use chrono::{DateTime, Duration, Utc};
use serde_json::json;

use auth_api::modules::auth::interface::{AuthError, Result as StoreResult, TokenStore};
use auth_api::modules::auth::memory::InMemoryUserStore;
use auth_api::modules::auth::model::AccessToken;
use auth_api::modules::auth::service::AuthSettings;
use common::{test_email, test_password, TestContext};

async fn register_and_login(ctx: &TestContext) -> (String, String) {
    let email = test_email();

    ctx.server
        .post("/auth/register")
        .json(&json!({
            "email": &email,
            "password": test_password(),
            "password_confirm": test_password()
        }))
        .await
        .assert_status(StatusCode::CREATED);

    let login = ctx
        .server
        .post("/auth/login")
        .json(&json!({
            "email": &email,
            "password": test_password()
        }))
        .await;
    login.assert_status(StatusCode::OK);

    let body: serde_json::Value = login.json();
    (email, body["token"].as_str().unwrap().to_string())
}

#[tokio::test]
async fn me_returns_the_authenticated_user() {
    let ctx = TestContext::new().await;
    let (email, token) = register_and_login(&ctx).await;

    let response = ctx.server.get("/auth/me").authorization_bearer(&token).await;

    response.assert_status(StatusCode::OK);

    let body: serde_json::Value = response.json();
    assert_eq!(body["email"], email);
}

#[tokio::test]
async fn me_without_token_is_rejected() {
    let ctx = TestContext::new().await;

    let response = ctx.server.get("/auth/me").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn me_with_garbage_token_is_rejected() {
    let ctx = TestContext::new().await;
    register_and_login(&ctx).await;

    let response = ctx
        .server
        .get("/auth/me")
        .authorization_bearer("deadbeefdeadbeefdeadbeefdeadbeef")
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_revokes_the_token() {
    let ctx = TestContext::new().await;
    let (_, token) = register_and_login(&ctx).await;

    ctx.server
        .post("/auth/logout")
        .authorization_bearer(&token)
        .await
        .assert_status(StatusCode::OK);

    let response = ctx.server.get("/auth/me").authorization_bearer(&token).await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_twice_still_succeeds() {
    let ctx = TestContext::new().await;
    let (_, token) = register_and_login(&ctx).await;

    ctx.server
        .post("/auth/logout")
        .authorization_bearer(&token)
        .await
        .assert_status(StatusCode::OK);

    ctx.server
        .post("/auth/logout")
        .authorization_bearer(&token)
        .await
        .assert_status(StatusCode::OK);
}

#[tokio::test]
async fn logout_without_token_still_succeeds() {
    let ctx = TestContext::new().await;

    let response = ctx.server.post("/auth/logout").await;
    response.assert_status(StatusCode::OK);
}

#[tokio::test]
async fn logout_only_revokes_the_presented_token() {
    let ctx = TestContext::new().await;
    let (email, token1) = register_and_login(&ctx).await;

    let login = ctx
        .server
        .post("/auth/login")
        .json(&json!({
            "email": &email,
            "password": test_password()
        }))
        .await;
    let body: serde_json::Value = login.json();
    let token2 = body["token"].as_str().unwrap().to_string();

    ctx.server
        .post("/auth/logout")
        .authorization_bearer(&token1)
        .await
        .assert_status(StatusCode::OK);

    ctx.server
        .get("/auth/me")
        .authorization_bearer(&token1)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    ctx.server
        .get("/auth/me")
        .authorization_bearer(&token2)
        .await
        .assert_status(StatusCode::OK);
}

/// Token store that fails every call, standing in for an unreachable
/// database.
struct UnavailableTokenStore;

#[async_trait]
impl TokenStore for UnavailableTokenStore {
    async fn create(&self, _token: &AccessToken) -> StoreResult<()> {
        Err(AuthError::Database(sqlx::Error::PoolTimedOut))
    }

    async fn find_by_hash(&self, _token_hash: &str) -> StoreResult<Option<AccessToken>> {
        Err(AuthError::Database(sqlx::Error::PoolTimedOut))
    }

    async fn touch(&self, _token_id: &str, _at: DateTime<Utc>) -> StoreResult<()> {
        Err(AuthError::Database(sqlx::Error::PoolTimedOut))
    }

    async fn revoke(&self, _token_hash: &str) -> StoreResult<()> {
        Err(AuthError::Database(sqlx::Error::PoolTimedOut))
    }
}

#[tokio::test]
async fn store_failure_during_authentication_is_a_server_error() {
    let app = auth_api::create_app(
        Arc::new(InMemoryUserStore::new()),
        Arc::new(UnavailableTokenStore),
        AuthSettings::default(),
    )
    .await;
    let server = TestServer::new(app).expect("Failed to create test server");

    // A broken store must not read as a revoked token
    let response = server
        .get("/auth/me")
        .authorization_bearer("deadbeefdeadbeefdeadbeefdeadbeef")
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);

    let body: serde_json::Value = response.json();
    assert_eq!(body["error"], "Internal server error");
}

#[tokio::test]
async fn expired_token_is_rejected() {
    let ctx = TestContext::with_settings(AuthSettings {
        token_ttl: Some(Duration::zero()),
        ..AuthSettings::default()
    })
    .await;
    let (_, token) = register_and_login(&ctx).await;

    let response = ctx.server.get("/auth/me").authorization_bearer(&token).await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}
