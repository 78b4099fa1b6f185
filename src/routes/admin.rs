use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, patch},
};

/// Admin Router Module
///
/// Nested under `/api/private/admin`. The first access rule restricts that prefix to ADMIN,
/// so the handlers do not repeat the role check.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /api/private/admin/users
        // POST /api/private/admin/users
        // Creates an account with an explicit role.
        .route(
            "/users",
            get(handlers::list_users).post(handlers::create_user),
        )
        // PATCH /api/private/admin/users/{user_id}
        .route("/users/{user_id}", patch(handlers::update_user))
}
