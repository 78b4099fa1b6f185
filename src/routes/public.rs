use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints that issue or clear credentials, plus the health check. Their paths are on the
/// gateway's public list (or on no list at all, for `/health`), so no token is required.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness check for load balancers.
        .route("/health", get(|| async { "ok" }))
        // POST /api/auth/login
        // Verifies the password and returns a token in the body and in the auth cookie.
        .route("/api/auth/login", post(handlers::login))
        // POST /api/auth/logout
        .route("/api/auth/logout", post(handlers::logout))
        // POST /api/auth/register
        // Self-service sign-up; always creates a CLIENT account.
        .route("/api/auth/register", post(handlers::register))
}
