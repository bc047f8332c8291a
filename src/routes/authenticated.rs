use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Authenticated Router Module
///
/// Every handler here extracts an `IdentityClaim`, which only exists once
/// `require_session` has run; `create_router` layers it over this whole group.
/// Plan-scoped mutations additionally pass the entitlement check inside the handler.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me, /me/purchases
        .route("/me", get(handlers::get_me))
        .route("/me/purchases", get(handlers::get_my_purchases))
        // POST /plans
        // Creator-only. The creator flag is checked against the store in the handler.
        .route("/plans", post(handlers::create_plan))
        // POST /plans/{id}/purchase
        // Payment completion. Unique per (user, plan): a repeat is a 409.
        .route("/plans/{id}/purchase", post(handlers::purchase_plan))
        // POST/GET /plans/{id}/completions
        // Entitlement-gated progress tracking.
        .route(
            "/plans/{id}/completions",
            post(handlers::record_completion).get(handlers::get_completions),
        )
        // POST /plans/{id}/reviews
        // Entitlement-gated, one review per buyer.
        .route("/plans/{id}/reviews", post(handlers::post_review))
        // POST /upload/presigned
        // Ten-minute upload URL for a plan cover image.
        .route("/upload/presigned", post(handlers::get_presigned_url))
}
