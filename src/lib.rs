use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    middleware,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod entitlement;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod storage;

// Route groups by access level (public, authenticated, admin).
pub mod routes;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use auth::{IdentityClaim, TokenIssuer};
pub use config::AppConfig;
pub use error::AppError;
pub use repository::{PostgresRepository, Repository, RepositoryState};
pub use storage::{MockStorageService, S3StorageClient, StorageState};

/// ApiDoc
///
/// OpenAPI document assembled from the `#[utoipa::path]` handlers and `ToSchema`
/// models, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::register_user, handlers::login, handlers::logout, handlers::get_me,
        handlers::list_plans, handlers::get_plan, handlers::create_plan,
        handlers::purchase_plan, handlers::get_my_purchases, handlers::record_completion,
        handlers::get_completions, handlers::get_reviews, handlers::post_review,
        handlers::get_presigned_url, handlers::get_admin_stats, handlers::get_admin_users,
        handlers::get_admin_purchases
    ),
    components(
        schemas(
            models::User, models::Plan, models::Purchase, models::Completion, models::Review,
            models::RegisterRequest, models::LoginRequest, models::CreatePlanRequest,
            models::PurchaseRequest, models::CompletionRequest, models::CreateReviewRequest,
            models::PresignedUrlRequest, models::PresignedUrlResponse,
            models::AdminDashboardStats, models::UserProfile, error::ErrorBody,
        )
    ),
    tags(
        (name = "trainwithx", description = "TrainWithX marketplace API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Everything a request may touch, built once in `main` and cloned per request.
/// Nothing in it is mutated after startup.
#[derive(Clone)]
pub struct AppState {
    /// Persistence (Postgres in production, in-memory fakes in tests).
    pub repo: RepositoryState,
    /// Object storage for plan cover images.
    pub storage: StorageState,
    /// The loaded configuration.
    pub config: AppConfig,
    /// Signs and verifies session credentials with `config.jwt_secret`.
    pub tokens: TokenIssuer,
}

impl AppState {
    /// Builds the state, deriving the token issuer from the configured secret.
    pub fn new(repo: RepositoryState, storage: StorageState, config: AppConfig) -> Self {
        let tokens = TokenIssuer::new(&config.jwt_secret);
        Self {
            repo,
            storage,
            config,
            tokens,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for TokenIssuer {
    fn from_ref(app_state: &AppState) -> TokenIssuer {
        app_state.tokens.clone()
    }
}

/// create_router
///
/// Assembles the route groups, their access-control layers, and the observability
/// stack.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    // Layers added later wrap earlier ones, so `require_session` is the outer layer and
    // runs before the role gate.
    let admin_router = admin::admin_routes()
        .route_layer(middleware::from_fn(auth::require_admin))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_session,
        ));

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth::require_session,
            )),
        )
        .nest("/admin", admin_router)
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span for every request, tagged with the `x-request-id` set by `SetRequestIdLayer`
/// so all log lines of one request correlate.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
