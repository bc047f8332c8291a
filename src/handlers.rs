use crate::{
    AppState,
    auth::{self, IdentityClaim, password},
    entitlement,
    error::{AppError, ErrorBody},
    models::{
        AdminDashboardStats, Completion, CompletionRequest, CreatePlanRequest,
        CreateReviewRequest, LoginRequest, NewPurchase, NewReview, NewUser, Plan,
        PresignedUrlRequest, PresignedUrlResponse, Purchase, PurchaseRequest, RegisterRequest,
        Review, UserProfile,
    },
    repository::RepositoryError,
    storage::{ALLOWED_IMAGE_TYPES, cover_object_key},
};
use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};

const MIN_PASSWORD_LEN: usize = 8;
const DAYS_PER_WEEK: i32 = 7;

/// Answer for both unknown email and wrong password, so login cannot be used to probe
/// which accounts exist.
const BAD_CREDENTIALS: &str = "invalid email or password";

async fn load_plan(state: &AppState, plan_id: i64) -> Result<Plan, AppError> {
    state
        .repo
        .get_plan(plan_id)
        .await?
        .ok_or(AppError::NotFound("plan not found"))
}

// --- Accounts ---

/// register_user
///
/// [Public Route] Creates an account and signs the caller in. The response carries the
/// `access_token` cookie alongside the new profile.
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = UserProfile),
        (status = 400, description = "Invalid input", body = ErrorBody),
        (status = 409, description = "Email taken", body = ErrorBody)
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = payload.email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(AppError::BadRequest("a valid email is required".to_string()));
    }
    if payload.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    let display_name = payload.display_name.trim().to_string();
    if display_name.is_empty() {
        return Err(AppError::BadRequest("display name is required".to_string()));
    }

    let new_user = NewUser {
        email,
        password_hash: password::hash_password(&payload.password)?,
        display_name,
    };

    let user = match state.repo.create_user(new_user).await {
        Ok(user) => user,
        Err(RepositoryError::Conflict) => {
            return Err(AppError::Conflict("email already registered"));
        }
        Err(e) => return Err(e.into()),
    };

    let token = state.tokens.issue(user.id, user.is_admin)?;
    tracing::info!(user_id = user.id, "user registered");

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, auth::session_cookie(&token))],
        Json(UserProfile::from(user)),
    ))
}

/// login
///
/// [Public Route] Verifies the password and issues a two-hour session credential.
/// The privileged flag in the credential mirrors the account's admin flag.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = UserProfile),
        (status = 401, description = "Bad credentials", body = ErrorBody)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = payload.email.trim().to_lowercase();
    let user = state
        .repo
        .get_user_by_email(&email)
        .await?
        .ok_or(AppError::Unauthorized(BAD_CREDENTIALS))?;

    if !password::verify_password(&payload.password, &user.password_hash)? {
        tracing::debug!(user_id = user.id, "login rejected: wrong password");
        return Err(AppError::Unauthorized(BAD_CREDENTIALS));
    }

    let token = state.tokens.issue(user.id, user.is_admin)?;
    tracing::info!(user_id = user.id, "user logged in");

    Ok((
        [(header::SET_COOKIE, auth::session_cookie(&token))],
        Json(UserProfile::from(user)),
    ))
}

/// logout
///
/// [Public Route] Tells the browser to drop the cookie. The credential itself stays
/// valid until it expires.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Cookie cleared"))
)]
pub async fn logout() -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, auth::clear_session_cookie())],
    )
}

/// get_me
///
/// [Authenticated Route] Profile of the credential's subject.
#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "Profile", body = UserProfile),
        (status = 401, description = "No session", body = ErrorBody)
    )
)]
pub async fn get_me(
    identity: IdentityClaim,
    State(state): State<AppState>,
) -> Result<Json<UserProfile>, AppError> {
    let user = state
        .repo
        .get_user(identity.subject_id)
        .await?
        .ok_or(AppError::NotFound("user not found"))?;
    Ok(Json(user.into()))
}

// --- Plans ---

/// list_plans
///
/// [Public Route] The plan catalogue, newest first.
#[utoipa::path(
    get,
    path = "/plans",
    responses((status = 200, description = "Plans", body = [Plan]))
)]
pub async fn list_plans(State(state): State<AppState>) -> Result<Json<Vec<Plan>>, AppError> {
    Ok(Json(state.repo.list_plans().await?))
}

/// get_plan
///
/// [Public Route]
#[utoipa::path(
    get,
    path = "/plans/{id}",
    params(("id" = i64, Path, description = "Plan ID")),
    responses(
        (status = 200, description = "Found", body = Plan),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn get_plan(
    State(state): State<AppState>,
    Path(plan_id): Path<i64>,
) -> Result<Json<Plan>, AppError> {
    Ok(Json(load_plan(&state, plan_id).await?))
}

/// create_plan
///
/// [Authenticated Route] Publishes a plan. The creator flag is read from the store on
/// every call, so it is not part of the session credential.
#[utoipa::path(
    post,
    path = "/plans",
    request_body = CreatePlanRequest,
    responses(
        (status = 201, description = "Created", body = Plan),
        (status = 400, description = "Invalid input", body = ErrorBody),
        (status = 403, description = "Not a creator", body = ErrorBody)
    )
)]
pub async fn create_plan(
    identity: IdentityClaim,
    State(state): State<AppState>,
    Json(payload): Json<CreatePlanRequest>,
) -> Result<(StatusCode, Json<Plan>), AppError> {
    let user = state
        .repo
        .get_user(identity.subject_id)
        .await?
        .ok_or(AppError::NotFound("user not found"))?;
    if !user.is_creator {
        return Err(AppError::Forbidden("creator account required"));
    }

    if payload.title.trim().is_empty() {
        return Err(AppError::BadRequest("title is required".to_string()));
    }
    if payload.price_cents < 0 {
        return Err(AppError::BadRequest("price cannot be negative".to_string()));
    }
    if payload.weeks < 1 {
        return Err(AppError::BadRequest("a plan needs at least one week".to_string()));
    }

    let plan = state.repo.create_plan(user.id, payload).await?;
    tracing::info!(plan_id = plan.id, creator_id = user.id, "plan created");
    Ok((StatusCode::CREATED, Json(plan)))
}

// --- Purchases ---

/// purchase_plan
///
/// [Authenticated Route] Payment-completion handler. Records the purchase at the plan's
/// current price once checkout has succeeded. The (user, plan) key is unique, so a
/// second completion for the same plan is a 409.
#[utoipa::path(
    post,
    path = "/plans/{id}/purchase",
    params(("id" = i64, Path, description = "Plan ID")),
    request_body = PurchaseRequest,
    responses(
        (status = 201, description = "Purchased", body = Purchase),
        (status = 404, description = "Unknown plan", body = ErrorBody),
        (status = 409, description = "Already purchased", body = ErrorBody)
    )
)]
pub async fn purchase_plan(
    identity: IdentityClaim,
    State(state): State<AppState>,
    Path(plan_id): Path<i64>,
    Json(payload): Json<PurchaseRequest>,
) -> Result<(StatusCode, Json<Purchase>), AppError> {
    let external_order_id = payload.external_order_id.trim().to_string();
    if external_order_id.is_empty() {
        return Err(AppError::BadRequest("external_order_id is required".to_string()));
    }

    let plan = load_plan(&state, plan_id).await?;
    let purchase = NewPurchase {
        user_id: identity.subject_id,
        plan_id: plan.id,
        amount: plan.price_cents,
        external_order_id,
    };

    match state.repo.create_purchase(purchase).await {
        Ok(purchase) => {
            tracing::info!(
                user_id = purchase.user_id,
                plan_id = purchase.plan_id,
                amount = purchase.amount,
                "purchase recorded"
            );
            Ok((StatusCode::CREATED, Json(purchase)))
        }
        Err(RepositoryError::Conflict) => Err(AppError::Conflict("plan already purchased")),
        Err(e) => Err(e.into()),
    }
}

/// get_my_purchases
///
/// [Authenticated Route]
#[utoipa::path(
    get,
    path = "/me/purchases",
    responses((status = 200, description = "My purchases", body = [Purchase]))
)]
pub async fn get_my_purchases(
    identity: IdentityClaim,
    State(state): State<AppState>,
) -> Result<Json<Vec<Purchase>>, AppError> {
    Ok(Json(
        state
            .repo
            .list_purchases_for_user(identity.subject_id)
            .await?,
    ))
}

// --- Completions ---

/// record_completion
///
/// [Authenticated Route] Marks one training day as done. Week must lie within the
/// plan, day within 1..=7. Requires a purchase; a repeated day is a 409.
#[utoipa::path(
    post,
    path = "/plans/{id}/completions",
    params(("id" = i64, Path, description = "Plan ID")),
    request_body = CompletionRequest,
    responses(
        (status = 201, description = "Recorded", body = Completion),
        (status = 401, description = "Plan not owned", body = ErrorBody),
        (status = 409, description = "Already completed", body = ErrorBody)
    )
)]
pub async fn record_completion(
    identity: IdentityClaim,
    State(state): State<AppState>,
    Path(plan_id): Path<i64>,
    Json(payload): Json<CompletionRequest>,
) -> Result<(StatusCode, Json<Completion>), AppError> {
    let plan = load_plan(&state, plan_id).await?;
    if !(1..=plan.weeks).contains(&payload.week_id) {
        return Err(AppError::BadRequest(format!(
            "week_id must be between 1 and {}",
            plan.weeks
        )));
    }
    if !(1..=DAYS_PER_WEEK).contains(&payload.day_id) {
        return Err(AppError::BadRequest(format!(
            "day_id must be between 1 and {DAYS_PER_WEEK}"
        )));
    }

    let completion = entitlement::record_completion(
        state.repo.as_ref(),
        identity.subject_id,
        plan.id,
        payload.week_id,
        payload.day_id,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(completion)))
}

/// get_completions
///
/// [Authenticated Route] The caller's progress through a plan they own.
#[utoipa::path(
    get,
    path = "/plans/{id}/completions",
    params(("id" = i64, Path, description = "Plan ID")),
    responses(
        (status = 200, description = "Completions", body = [Completion]),
        (status = 401, description = "Plan not owned", body = ErrorBody)
    )
)]
pub async fn get_completions(
    identity: IdentityClaim,
    State(state): State<AppState>,
    Path(plan_id): Path<i64>,
) -> Result<Json<Vec<Completion>>, AppError> {
    entitlement::ensure_purchased(state.repo.as_ref(), identity.subject_id, plan_id).await?;
    Ok(Json(
        state
            .repo
            .list_completions(identity.subject_id, plan_id)
            .await?,
    ))
}

// --- Reviews ---

/// get_reviews
///
/// [Public Route]
#[utoipa::path(
    get,
    path = "/plans/{id}/reviews",
    params(("id" = i64, Path, description = "Plan ID")),
    responses(
        (status = 200, description = "Reviews", body = [Review]),
        (status = 404, description = "Unknown plan", body = ErrorBody)
    )
)]
pub async fn get_reviews(
    State(state): State<AppState>,
    Path(plan_id): Path<i64>,
) -> Result<Json<Vec<Review>>, AppError> {
    let plan = load_plan(&state, plan_id).await?;
    Ok(Json(state.repo.list_reviews(plan.id).await?))
}

/// post_review
///
/// [Authenticated Route] Only buyers may review, once per plan.
#[utoipa::path(
    post,
    path = "/plans/{id}/reviews",
    params(("id" = i64, Path, description = "Plan ID")),
    request_body = CreateReviewRequest,
    responses(
        (status = 201, description = "Created", body = Review),
        (status = 401, description = "Plan not owned", body = ErrorBody),
        (status = 409, description = "Already reviewed", body = ErrorBody)
    )
)]
pub async fn post_review(
    identity: IdentityClaim,
    State(state): State<AppState>,
    Path(plan_id): Path<i64>,
    Json(payload): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<Review>), AppError> {
    let plan = load_plan(&state, plan_id).await?;
    entitlement::ensure_purchased(state.repo.as_ref(), identity.subject_id, plan.id).await?;

    if !(1..=5).contains(&payload.rating) {
        return Err(AppError::BadRequest("rating must be between 1 and 5".to_string()));
    }
    let body = payload.body.trim().to_string();
    if body.is_empty() {
        return Err(AppError::BadRequest("review body is required".to_string()));
    }

    let review = NewReview {
        user_id: identity.subject_id,
        plan_id: plan.id,
        rating: payload.rating,
        body,
    };

    match state.repo.create_review(review).await {
        Ok(review) => Ok((StatusCode::CREATED, Json(review))),
        Err(RepositoryError::Conflict) => Err(AppError::Conflict("plan already reviewed")),
        Err(e) => Err(e.into()),
    }
}

// --- Media ---

/// get_presigned_url
///
/// [Authenticated Route] Short-lived upload URL for a plan cover image. The object key
/// is generated server-side; only the extension of the client's filename survives.
#[utoipa::path(
    post,
    path = "/upload/presigned",
    request_body = PresignedUrlRequest,
    responses(
        (status = 200, description = "URL", body = PresignedUrlResponse),
        (status = 400, description = "Unsupported type", body = ErrorBody)
    )
)]
pub async fn get_presigned_url(
    identity: IdentityClaim,
    State(state): State<AppState>,
    Json(payload): Json<PresignedUrlRequest>,
) -> Result<Json<PresignedUrlResponse>, AppError> {
    if !ALLOWED_IMAGE_TYPES.contains(&payload.file_type.as_str()) {
        return Err(AppError::BadRequest(format!(
            "unsupported file type {}",
            payload.file_type
        )));
    }

    let resource_key = cover_object_key(&payload.filename);
    let upload_url = state
        .storage
        .presign_upload(&resource_key, &payload.file_type)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    tracing::debug!(user_id = identity.subject_id, %resource_key, "cover upload presigned");
    Ok(Json(PresignedUrlResponse {
        upload_url,
        resource_key,
    }))
}

// --- Admin ---

/// get_admin_stats
///
/// [Admin Route] Dashboard counters. Reached only through the verifier and role gate.
#[utoipa::path(
    get,
    path = "/admin/stats",
    responses(
        (status = 200, description = "Stats", body = AdminDashboardStats),
        (status = 403, description = "Not an admin", body = ErrorBody)
    )
)]
pub async fn get_admin_stats(
    State(state): State<AppState>,
) -> Result<Json<AdminDashboardStats>, AppError> {
    Ok(Json(state.repo.get_stats().await?))
}

/// get_admin_users
///
/// [Admin Route]
#[utoipa::path(
    get,
    path = "/admin/users",
    responses((status = 200, description = "All users", body = [UserProfile]))
)]
pub async fn get_admin_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<UserProfile>>, AppError> {
    let users = state.repo.list_users().await?;
    Ok(Json(users.into_iter().map(UserProfile::from).collect()))
}

/// get_admin_purchases
///
/// [Admin Route]
#[utoipa::path(
    get,
    path = "/admin/purchases",
    responses((status = 200, description = "All purchases", body = [Purchase]))
)]
pub async fn get_admin_purchases(
    State(state): State<AppState>,
) -> Result<Json<Vec<Purchase>>, AppError> {
    Ok(Json(state.repo.list_purchases().await?))
}
