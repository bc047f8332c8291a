use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Admin Router Module
///
/// Privileged-only endpoints, nested under `/admin`. `create_router` wraps this group
/// in `require_admin` and then `require_session`, so the verifier always runs first and
/// the handlers never re-check the role themselves.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/stats
        // Totals of users, plans, purchases, completions, and revenue.
        .route("/stats", get(handlers::get_admin_stats))
        // GET /admin/users
        .route("/users", get(handlers::get_admin_users))
        // GET /admin/purchases
        .route("/purchases", get(handlers::get_admin_purchases))
}
