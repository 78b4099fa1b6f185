use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Authenticated Router Module
///
/// Handlers here sit under `/api/private`, which the gateway classifies as protected. They take
/// the `AuthUser` extractor to read the identity the gateway attached.
pub fn authenticated_routes() -> Router<AppState> {
    Router::new()
        // GET /api/private/me
        // PUT /api/private/me
        // Changes the caller's own password.
        .route(
            "/api/private/me",
            get(handlers::get_me).put(handlers::change_password),
        )
}
