mod common;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{Duration, Utc};
use common::{FakeRepository, test_state, test_state_with_storage};
use std::sync::Arc;
use trainwithx_api::{
    AppError, IdentityClaim, MockStorageService, handlers,
    models::{
        CompletionRequest, CreatePlanRequest, CreateReviewRequest, LoginRequest,
        PresignedUrlRequest, PurchaseRequest, RegisterRequest, UserProfile,
    },
    repository::Repository,
};

// --- Test Utilities ---

fn identity(subject_id: i64) -> IdentityClaim {
    let now = Utc::now();
    IdentityClaim {
        subject_id,
        is_privileged: false,
        issued_at: now,
        expires_at: now + Duration::hours(2),
    }
}

fn register_payload(email: &str) -> RegisterRequest {
    RegisterRequest {
        email: email.to_string(),
        password: "correct horse battery".to_string(),
        display_name: "Runner".to_string(),
    }
}

fn plan_payload() -> CreatePlanRequest {
    CreatePlanRequest {
        title: "Couch to 5k".to_string(),
        description: "Nine weeks of running".to_string(),
        price_cents: 1999,
        weeks: 9,
        cover_image_key: Some("covers/abc.jpg".to_string()),
    }
}

fn set_cookie(response: &axum::response::Response) -> String {
    response
        .headers()
        .get(axum::http::header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

// --- Accounts ---

#[tokio::test]
async fn test_register_sets_cookie_and_hashes_password() {
    let repo = Arc::new(FakeRepository::new());
    let state = test_state(repo.clone());

    let response = handlers::register_user(
        State(state.clone()),
        Json(register_payload(" Runner@Example.com ")),
    )
    .await
    .unwrap()
    .into_response();

    assert_eq!(response.status(), StatusCode::CREATED);
    let cookie = set_cookie(&response);
    assert!(cookie.starts_with("access_token="));

    let token = cookie
        .trim_start_matches("access_token=")
        .split(';')
        .next()
        .unwrap();
    let claim = state.tokens.verify(token).unwrap();
    assert!(!claim.is_privileged);

    let stored = repo
        .get_user_by_email("runner@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.id, claim.subject_id);
    assert!(stored.password_hash.starts_with("$argon2id$"));
}

#[tokio::test]
async fn test_register_duplicate_email_conflicts() {
    let state = test_state(Arc::new(FakeRepository::new()));

    handlers::register_user(State(state.clone()), Json(register_payload("a@example.com")))
        .await
        .unwrap();
    let second =
        handlers::register_user(State(state), Json(register_payload("A@example.com"))).await;

    match second {
        Err(err) => assert_eq!(err.status(), StatusCode::CONFLICT),
        Ok(_) => panic!("duplicate registration should fail"),
    }
}

#[tokio::test]
async fn test_register_validates_input() {
    let state = test_state(Arc::new(FakeRepository::new()));

    let mut short = register_payload("a@example.com");
    short.password = "short".to_string();
    let no_at = register_payload("not-an-email");

    for payload in [short, no_at] {
        match handlers::register_user(State(state.clone()), Json(payload)).await {
            Err(AppError::BadRequest(_)) => {}
            Err(other) => panic!("expected BadRequest, got {other:?}"),
            Ok(_) => panic!("expected BadRequest"),
        }
    }
}

#[tokio::test]
async fn test_login_success_and_failures() {
    let state = test_state(Arc::new(FakeRepository::new()));
    handlers::register_user(State(state.clone()), Json(register_payload("b@example.com")))
        .await
        .unwrap();

    let ok = handlers::login(
        State(state.clone()),
        Json(LoginRequest {
            email: "b@example.com".to_string(),
            password: "correct horse battery".to_string(),
        }),
    )
    .await
    .unwrap()
    .into_response();
    assert_eq!(ok.status(), StatusCode::OK);
    assert!(set_cookie(&ok).contains("HttpOnly"));

    let wrong_password = handlers::login(
        State(state.clone()),
        Json(LoginRequest {
            email: "b@example.com".to_string(),
            password: "incorrect".to_string(),
        }),
    )
    .await;
    let unknown_email = handlers::login(
        State(state),
        Json(LoginRequest {
            email: "nobody@example.com".to_string(),
            password: "correct horse battery".to_string(),
        }),
    )
    .await;

    for result in [wrong_password, unknown_email] {
        match result {
            Err(AppError::Unauthorized(message)) => {
                assert_eq!(message, "invalid email or password")
            }
            Err(other) => panic!("expected Unauthorized, got {other:?}"),
            Ok(_) => panic!("expected Unauthorized"),
        }
    }
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let response = handlers::logout().await.into_response();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(set_cookie(&response).contains("Max-Age=0"));
}

#[tokio::test]
async fn test_get_me_unknown_subject_is_not_found() {
    let state = test_state(Arc::new(FakeRepository::new()));

    let result = handlers::get_me(identity(99), State(state)).await;

    assert_eq!(result.unwrap_err().status(), StatusCode::NOT_FOUND);
}

// --- Plans ---

#[tokio::test]
async fn test_create_plan_requires_creator() {
    let repo = Arc::new(FakeRepository::new());
    repo.insert_user(1, "user@example.com", false, false);
    let state = test_state(repo);

    let result = handlers::create_plan(identity(1), State(state), Json(plan_payload())).await;

    assert_eq!(result.unwrap_err().status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_create_plan_as_creator() {
    let repo = Arc::new(FakeRepository::new());
    repo.insert_user(1, "coach@example.com", false, true);
    let state = test_state(repo);

    let (status, Json(plan)) =
        handlers::create_plan(identity(1), State(state), Json(plan_payload()))
            .await
            .unwrap();

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(plan.creator_id, 1);
    assert_eq!(plan.cover_image.as_deref(), Some("covers/abc.jpg"));
}

#[tokio::test]
async fn test_create_plan_validation() {
    let repo = Arc::new(FakeRepository::new());
    repo.insert_user(1, "coach@example.com", false, true);
    let state = test_state(repo);

    let mut no_weeks = plan_payload();
    no_weeks.weeks = 0;
    let mut negative = plan_payload();
    negative.price_cents = -1;
    let mut untitled = plan_payload();
    untitled.title = "   ".to_string();

    for payload in [no_weeks, negative, untitled] {
        let result = handlers::create_plan(identity(1), State(state.clone()), Json(payload)).await;
        assert_eq!(result.unwrap_err().status(), StatusCode::BAD_REQUEST);
    }
}

// --- Purchases ---

#[tokio::test]
async fn test_purchase_charges_plan_price_and_rejects_repeat() {
    let repo = Arc::new(FakeRepository::new());
    repo.insert_plan(7, 1, 4900, 4);
    let state = test_state(repo);
    let order = || {
        Json(PurchaseRequest {
            external_order_id: "cs_test_1".to_string(),
        })
    };

    let (status, Json(purchase)) =
        handlers::purchase_plan(identity(42), State(state.clone()), Path(7), order())
            .await
            .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(purchase.amount, 4900);

    let again = handlers::purchase_plan(identity(42), State(state.clone()), Path(7), order()).await;
    assert_eq!(again.unwrap_err().status(), StatusCode::CONFLICT);

    let Json(mine) = handlers::get_my_purchases(identity(42), State(state))
        .await
        .unwrap();
    assert_eq!(mine.len(), 1);
}

#[tokio::test]
async fn test_purchase_unknown_plan_is_not_found() {
    let state = test_state(Arc::new(FakeRepository::new()));

    let result = handlers::purchase_plan(
        identity(42),
        State(state),
        Path(404),
        Json(PurchaseRequest {
            external_order_id: "cs_test_1".to_string(),
        }),
    )
    .await;

    assert_eq!(result.unwrap_err().status(), StatusCode::NOT_FOUND);
}

// --- Completions ---

#[tokio::test]
async fn test_completion_bounds_are_checked() {
    let repo = Arc::new(FakeRepository::new());
    repo.insert_plan(7, 1, 0, 2);
    let state = test_state(repo);

    for (week_id, day_id) in [(0, 1), (3, 1), (1, 0), (1, 8)] {
        let result = handlers::record_completion(
            identity(42),
            State(state.clone()),
            Path(7),
            Json(CompletionRequest { week_id, day_id }),
        )
        .await;
        assert_eq!(
            result.unwrap_err().status(),
            StatusCode::BAD_REQUEST,
            "week {week_id} day {day_id}"
        );
    }
}

#[tokio::test]
async fn test_completions_listing_requires_purchase() {
    let repo = Arc::new(FakeRepository::new());
    repo.insert_plan(7, 1, 0, 2);
    let state = test_state(repo);

    let result = handlers::get_completions(identity(42), State(state), Path(7)).await;

    assert_eq!(result.unwrap_err().status(), StatusCode::UNAUTHORIZED);
}

// --- Reviews ---

#[tokio::test]
async fn test_review_requires_purchase_and_is_unique() {
    let repo = Arc::new(FakeRepository::new());
    repo.insert_plan(7, 1, 1000, 4);
    let state = test_state(repo.clone());
    let review = || {
        Json(CreateReviewRequest {
            rating: 5,
            body: "Great plan".to_string(),
        })
    };

    let unowned = handlers::post_review(identity(42), State(state.clone()), Path(7), review()).await;
    assert_eq!(unowned.unwrap_err().status(), StatusCode::UNAUTHORIZED);

    handlers::purchase_plan(
        identity(42),
        State(state.clone()),
        Path(7),
        Json(PurchaseRequest {
            external_order_id: "cs_test_r".to_string(),
        }),
    )
    .await
    .unwrap();

    let (status, _) = handlers::post_review(identity(42), State(state.clone()), Path(7), review())
        .await
        .unwrap();
    assert_eq!(status, StatusCode::CREATED);

    let again = handlers::post_review(identity(42), State(state.clone()), Path(7), review()).await;
    assert_eq!(again.unwrap_err().status(), StatusCode::CONFLICT);

    let Json(reviews) = handlers::get_reviews(State(state), Path(7)).await.unwrap();
    assert_eq!(reviews.len(), 1);
}

#[tokio::test]
async fn test_review_rating_out_of_range() {
    let repo = Arc::new(FakeRepository::new());
    repo.insert_plan(7, 1, 1000, 4);
    let state = test_state(repo);
    handlers::purchase_plan(
        identity(42),
        State(state.clone()),
        Path(7),
        Json(PurchaseRequest {
            external_order_id: "cs_test_r".to_string(),
        }),
    )
    .await
    .unwrap();

    let result = handlers::post_review(
        identity(42),
        State(state),
        Path(7),
        Json(CreateReviewRequest {
            rating: 6,
            body: "Too good".to_string(),
        }),
    )
    .await;

    assert_eq!(result.unwrap_err().status(), StatusCode::BAD_REQUEST);
}

// --- Media ---

#[tokio::test]
async fn test_presigned_url_for_cover_image() {
    let state = test_state(Arc::new(FakeRepository::new()));

    let Json(body) = handlers::get_presigned_url(
        identity(1),
        State(state),
        Json(PresignedUrlRequest {
            filename: "../../My Cover.PNG".to_string(),
            file_type: "image/png".to_string(),
        }),
    )
    .await
    .unwrap();

    assert!(body.resource_key.starts_with("covers/"));
    assert!(body.resource_key.ends_with(".png"));
    assert!(!body.resource_key.contains(".."));
    assert!(body.upload_url.contains(&body.resource_key));
}

#[tokio::test]
async fn test_presigned_url_rejects_non_images() {
    let state = test_state(Arc::new(FakeRepository::new()));

    let result = handlers::get_presigned_url(
        identity(1),
        State(state),
        Json(PresignedUrlRequest {
            filename: "report.pdf".to_string(),
            file_type: "application/pdf".to_string(),
        }),
    )
    .await;

    assert_eq!(result.unwrap_err().status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_presigned_url_storage_failure_is_generic_500() {
    let state = test_state_with_storage(
        Arc::new(FakeRepository::new()),
        MockStorageService::new_failing(),
    );

    let err = handlers::get_presigned_url(
        identity(1),
        State(state),
        Json(PresignedUrlRequest {
            filename: "cover.jpg".to_string(),
            file_type: "image/jpeg".to_string(),
        }),
    )
    .await
    .unwrap_err();

    let response = err.into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "internal server error");
}

// --- Admin ---

#[tokio::test]
async fn test_admin_stats_and_listings() {
    let repo = Arc::new(FakeRepository::new());
    repo.insert_user(1, "coach@example.com", false, true);
    repo.insert_user(2, "buyer@example.com", false, false);
    repo.insert_plan(10, 1, 3000, 4);
    let state = test_state(repo);

    handlers::purchase_plan(
        identity(2),
        State(state.clone()),
        Path(10),
        Json(PurchaseRequest {
            external_order_id: "cs_test_admin".to_string(),
        }),
    )
    .await
    .unwrap();

    let Json(stats) = handlers::get_admin_stats(State(state.clone())).await.unwrap();
    assert_eq!(stats.total_users, 2);
    assert_eq!(stats.total_plans, 1);
    assert_eq!(stats.total_purchases, 1);
    assert_eq!(stats.revenue_cents, 3000);

    let Json(users): Json<Vec<UserProfile>> =
        handlers::get_admin_users(State(state.clone())).await.unwrap();
    assert_eq!(users.len(), 2);

    let Json(purchases) = handlers::get_admin_purchases(State(state)).await.unwrap();
    assert_eq!(purchases[0].external_order_id, "cs_test_admin");
}
