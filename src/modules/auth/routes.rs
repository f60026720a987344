use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::AppState;

use super::controller;

pub fn auth_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(controller::register))
        .route("/login", post(controller::login))
        .route("/logout", post(controller::logout))
        .route("/me", get(controller::me))
        .route("/2fa/setup", post(controller::two_factor_setup))
        .route("/2fa/confirm", post(controller::two_factor_confirm))
        .route("/2fa/disable", post(controller::two_factor_disable))
}
