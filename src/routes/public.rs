use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a session: health, the account flows that mint or
/// clear the credential, and the read-only catalogue.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for the load balancer.
        .route("/health", get(|| async { "ok" }))
        // POST /auth/register, /auth/login
        // Both answer with a Set-Cookie carrying a fresh two-hour credential.
        .route("/auth/register", post(handlers::register_user))
        .route("/auth/login", post(handlers::login))
        // POST /auth/logout
        // Clears the cookie only. There is no server-side session to destroy.
        .route("/auth/logout", post(handlers::logout))
        // GET /plans, /plans/{id}
        .route("/plans", get(handlers::list_plans))
        .route("/plans/{id}", get(handlers::get_plan))
        // GET /plans/{id}/reviews
        .route("/plans/{id}/reviews", get(handlers::get_reviews))
}
