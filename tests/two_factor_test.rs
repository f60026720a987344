mod common;

use axum::http::StatusCode;
use serde_json::json;

use auth_api::modules::auth::service::AuthSettings;
use auth_api::services::totp;
use common::{test_email, test_password, TestContext};

/// Register a fresh user and log in, returning (email, bearer token).
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

async fn setup_secret(ctx: &TestContext, token: &str) -> String {
    let response = ctx
        .server
        .post("/auth/2fa/setup")
        .authorization_bearer(token)
        .await;
    response.assert_status(StatusCode::OK);

    let body: serde_json::Value = response.json();
    body["secret"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn setup_returns_secret_and_otpauth_url() {
    let ctx = TestContext::new().await;
    let (email, token) = register_and_login(&ctx).await;

    let response = ctx
        .server
        .post("/auth/2fa/setup")
        .authorization_bearer(&token)
        .await;

    response.assert_status(StatusCode::OK);

    let body: serde_json::Value = response.json();
    let secret = body["secret"].as_str().unwrap();
    let url = body["otpauth_url"].as_str().unwrap();

    // 20 random bytes encode to 32 base32 characters
    assert_eq!(secret.len(), 32);
    assert!(url.starts_with("otpauth://totp/"));
    assert!(url.contains(secret));
    // Account label is percent-encoded in the URI
    assert!(url.contains(&email.replace('@', "%40")));
    assert!(!url.contains(' '));
}

#[tokio::test]
async fn setup_without_token_is_rejected() {
    let ctx = TestContext::new().await;

    let response = ctx.server.post("/auth/2fa/setup").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn repeated_setup_returns_the_same_secret() {
    let ctx = TestContext::new().await;
    let (_, token) = register_and_login(&ctx).await;

    let first = setup_secret(&ctx, &token).await;
    let second = setup_secret(&ctx, &token).await;

    assert_eq!(first, second);
}

#[tokio::test]
async fn confirm_with_valid_code_enables_two_factor() {
    let ctx = TestContext::new().await;
    let (_, token) = register_and_login(&ctx).await;
    let secret = setup_secret(&ctx, &token).await;

    let code = totp::current_code(&secret).unwrap();
    let response = ctx
        .server
        .post("/auth/2fa/confirm")
        .authorization_bearer(&token)
        .json(&json!({ "code": code }))
        .await;

    response.assert_status(StatusCode::OK);

    let body: serde_json::Value = response.json();
    assert_eq!(body["two_factor_enabled"], true);

    let me = ctx.server.get("/auth/me").authorization_bearer(&token).await;
    let me_body: serde_json::Value = me.json();
    assert_eq!(me_body["two_factor_enabled"], true);
}

#[tokio::test]
async fn confirm_with_wrong_code_is_a_validation_error() {
    let ctx = TestContext::new().await;
    let (_, token) = register_and_login(&ctx).await;
    let secret = setup_secret(&ctx, &token).await;

    let good = totp::current_code(&secret).unwrap();
    let bad = if good == "000000" { "000001" } else { "000000" };

    let response = ctx
        .server
        .post("/auth/2fa/confirm")
        .authorization_bearer(&token)
        .json(&json!({ "code": bad }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);

    // Still disabled
    let me = ctx.server.get("/auth/me").authorization_bearer(&token).await;
    let me_body: serde_json::Value = me.json();
    assert_eq!(me_body["two_factor_enabled"], false);
}

#[tokio::test]
async fn confirm_with_malformed_code_is_a_validation_error() {
    let ctx = TestContext::new().await;
    let (_, token) = register_and_login(&ctx).await;
    setup_secret(&ctx, &token).await;

    for code in ["12345", "1234567", "12345a", "  123456"] {
        let response = ctx
            .server
            .post("/auth/2fa/confirm")
            .authorization_bearer(&token)
            .json(&json!({ "code": code }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn confirm_without_prior_setup_is_rejected() {
    let ctx = TestContext::new().await;
    let (_, token) = register_and_login(&ctx).await;

    let response = ctx
        .server
        .post("/auth/2fa/confirm")
        .authorization_bearer(&token)
        .json(&json!({ "code": "123456" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn disable_with_valid_code_turns_two_factor_off() {
    let ctx = TestContext::new().await;
    let (_, token) = register_and_login(&ctx).await;
    let secret = setup_secret(&ctx, &token).await;

    let code = totp::current_code(&secret).unwrap();
    ctx.server
        .post("/auth/2fa/confirm")
        .authorization_bearer(&token)
        .json(&json!({ "code": code }))
        .await
        .assert_status(StatusCode::OK);

    let code = totp::current_code(&secret).unwrap();
    let response = ctx
        .server
        .post("/auth/2fa/disable")
        .authorization_bearer(&token)
        .json(&json!({ "code": code }))
        .await;

    response.assert_status(StatusCode::OK);

    let me = ctx.server.get("/auth/me").authorization_bearer(&token).await;
    let me_body: serde_json::Value = me.json();
    assert_eq!(me_body["two_factor_enabled"], false);

    // Default policy keeps the secret, so the next setup re-issues it
    let again = setup_secret(&ctx, &token).await;
    assert_eq!(again, secret);
}

#[tokio::test]
async fn disable_with_wrong_code_keeps_two_factor_on() {
    let ctx = TestContext::new().await;
    let (_, token) = register_and_login(&ctx).await;
    let secret = setup_secret(&ctx, &token).await;

    let code = totp::current_code(&secret).unwrap();
    ctx.server
        .post("/auth/2fa/confirm")
        .authorization_bearer(&token)
        .json(&json!({ "code": code }))
        .await
        .assert_status(StatusCode::OK);

    let good = totp::current_code(&secret).unwrap();
    let bad = if good == "000000" { "000001" } else { "000000" };

    let response = ctx
        .server
        .post("/auth/2fa/disable")
        .authorization_bearer(&token)
        .json(&json!({ "code": bad }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);

    let me = ctx.server.get("/auth/me").authorization_bearer(&token).await;
    let me_body: serde_json::Value = me.json();
    assert_eq!(me_body["two_factor_enabled"], true);
}

#[tokio::test]
async fn disable_when_already_disabled_succeeds() {
    let ctx = TestContext::new().await;
    let (_, token) = register_and_login(&ctx).await;

    let response = ctx
        .server
        .post("/auth/2fa/disable")
        .authorization_bearer(&token)
        .json(&json!({ "code": "123456" }))
        .await;

    response.assert_status(StatusCode::OK);
}

#[tokio::test]
async fn disable_wipes_secret_when_retention_is_off() {
    let ctx = TestContext::with_settings(AuthSettings {
        retain_secret_on_disable: false,
        ..AuthSettings::default()
    })
    .await;
    let (_, token) = register_and_login(&ctx).await;
    let secret = setup_secret(&ctx, &token).await;

    let code = totp::current_code(&secret).unwrap();
    ctx.server
        .post("/auth/2fa/confirm")
        .authorization_bearer(&token)
        .json(&json!({ "code": code }))
        .await
        .assert_status(StatusCode::OK);

    let code = totp::current_code(&secret).unwrap();
    ctx.server
        .post("/auth/2fa/disable")
        .authorization_bearer(&token)
        .json(&json!({ "code": code }))
        .await
        .assert_status(StatusCode::OK);

    let again = setup_secret(&ctx, &token).await;
    assert_ne!(again, secret);
}
