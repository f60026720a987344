use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use validator::Validate;

use crate::AppState;

use super::extractor::CurrentUser;
use super::interface::AuthError;
use super::schema::{
    ErrorResponse, LoginPendingResponse, LoginRequest, LoginResponse, LogoutResponse,
    RegisterRequest, RegisterResponse, TwoFactorCodeRequest, TwoFactorSetupResponse,
    TwoFactorStatusResponse, UserResponse,
};
use super::service::LoginOutcome;

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Server-side failures are logged with detail and answered without it.
fn map_error(err: AuthError) -> ApiError {
    let status = err.status_code();

    if status.is_server_error() {
        tracing::error!(error = %err, "auth request failed");
    }

    (status, Json(ErrorResponse::new(err.public_message())))
}

/// In enrollment endpoints the caller is already authenticated, so a bad
/// code is a validation problem (400), not an authentication failure (401).
fn map_enrollment_error(err: AuthError) -> ApiError {
    match err {
        AuthError::InvalidTwoFactorCode => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(err.public_message())),
        ),
        other => map_error(other),
    }
}

/// Client address as reported by the reverse proxy. Resolving the real peer
/// is the transport's job; the core just records what it is handed.
fn client_ip(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers.get("x-forwarded-for")?.to_str().ok()?;
    let first = forwarded.split(',').next()?.trim();

    if first.is_empty() {
        None
    } else {
        Some(first.to_string())
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    if let Err(e) = req.validate() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(e.to_string())),
        ));
    }

    if req.password != req.password_confirm {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("Passwords do not match")),
        ));
    }

    if req.password.len() < 8 {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("Password must be at least 8 characters")),
        ));
    }

    let user = state
        .auth
        .register(&req.email, &req.password)
        .await
        .map_err(map_error)?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user: UserResponse::from(&user),
        }),
    ))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let ip = client_ip(&headers);

    let outcome = state
        .auth
        .login(&req.email, &req.password, req.code.as_deref(), ip.as_deref())
        .await
        .map_err(map_error)?;

    match outcome {
        LoginOutcome::Complete { token, user } => Ok((
            StatusCode::OK,
            Json(LoginResponse {
                token,
                token_type: "Bearer",
                user: UserResponse::from(&user),
            }),
        )
            .into_response()),
        // 409 tells the client to resubmit credentials together with a code.
        // Not a failure; no login metadata is recorded.
        LoginOutcome::ChallengeRequired => {
            Ok((StatusCode::CONFLICT, Json(LoginPendingResponse::new())).into_response())
        }
    }
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<LogoutResponse>, ApiError> {
    // Revocation is idempotent: a missing or unknown token still logs out.
    if let Some(token) = bearer_token(&headers) {
        state.auth.logout(token).await.map_err(map_error)?;
    }

    Ok(Json(LogoutResponse {
        message: "Logged out",
    }))
}

pub async fn me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse::from(&user))
}

pub async fn two_factor_setup(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<TwoFactorSetupResponse>, ApiError> {
    let setup = state
        .auth
        .setup_two_factor(&user)
        .await
        .map_err(map_error)?;

    Ok(Json(TwoFactorSetupResponse {
        secret: setup.secret,
        otpauth_url: setup.otpauth_url,
    }))
}

pub async fn two_factor_confirm(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<TwoFactorCodeRequest>,
) -> Result<Json<TwoFactorStatusResponse>, ApiError> {
    state
        .auth
        .confirm_two_factor(&user, &req.code)
        .await
        .map_err(map_enrollment_error)?;

    Ok(Json(TwoFactorStatusResponse {
        message: "Two-factor enabled",
        two_factor_enabled: true,
    }))
}

pub async fn two_factor_disable(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<TwoFactorCodeRequest>,
) -> Result<Json<TwoFactorStatusResponse>, ApiError> {
    state
        .auth
        .disable_two_factor(&user, &req.code)
        .await
        .map_err(map_enrollment_error)?;

    Ok(Json(TwoFactorStatusResponse {
        message: "Two-factor disabled",
        two_factor_enabled: false,
    }))
}
