use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, StatusCode},
    Json,
};

use crate::AppState;

use super::model::User;
use super::schema::ErrorResponse;

/// Extractor for handlers behind bearer authentication.
///
/// Pulls the token from the `Authorization` header, resolves it through the
/// token store (which also enforces passive expiry and stamps
/// `last_used_at`), and hands the handler the owning user. Missing, unknown,
/// expired, and revoked tokens all reject with the same 401. Store failures
/// are not authentication failures and keep their 500.
pub struct CurrentUser(pub User);

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(unauthenticated)?;

        let user = state.auth.authenticate(token).await.map_err(|err| {
            let status = err.status_code();
            if status.is_server_error() {
                tracing::error!(error = %err, "token authentication failed");
                (status, Json(ErrorResponse::new(err.public_message())))
            } else {
                unauthenticated()
            }
        })?;

        Ok(CurrentUser(user))
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

fn unauthenticated() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse::new("Unauthenticated")),
    )
}
