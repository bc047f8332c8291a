use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// An account row from the `users` table. `is_admin` becomes the privileged flag of
/// the session credential; `is_creator` is re-read from the store whenever a plan is
/// published.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    pub id: i64,
    pub email: String,
    // Argon2id PHC string. Never serialized to clients.
    #[serde(skip_serializing, default)]
    #[ts(skip)]
    #[schema(ignore)]
    pub password_hash: String,
    pub display_name: String,
    pub is_admin: bool,
    pub is_creator: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Plan
///
/// A training plan offered by a creator. `weeks` bounds the week identifiers that
/// completions may reference.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Plan {
    pub id: i64,
    pub creator_id: i64,
    pub title: String,
    pub description: String,
    pub price_cents: i64,
    pub weeks: i32,
    // S3 key of the cover image, if one was uploaded.
    pub cover_image: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Purchase
///
/// Proof of entitlement. At most one per (user_id, plan_id); immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Purchase {
    pub user_id: i64,
    pub plan_id: i64,
    pub amount: i64,
    // Order reference handed back by the billing provider.
    pub external_order_id: String,
    #[ts(type = "string")]
    pub purchased_at: DateTime<Utc>,
}

/// Completion
///
/// A single finished training day. At most one per (user_id, plan_id, week_id, day_id).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Completion {
    pub user_id: i64,
    pub plan_id: i64,
    pub week_id: i32,
    pub day_id: i32,
    #[ts(type = "string")]
    pub completed_at: DateTime<Utc>,
}

/// Review
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Review {
    pub id: i64,
    pub user_id: i64,
    pub plan_id: i64,
    pub rating: i16,
    pub body: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

// --- Insert Payloads (Repository Inputs) ---

/// NewUser
///
/// Everything the repository needs to create an account. The password has already
/// been hashed by the handler.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub display_name: String,
}

#[derive(Debug, Clone)]
pub struct NewPurchase {
    pub user_id: i64,
    pub plan_id: i64,
    pub amount: i64,
    pub external_order_id: String,
}

#[derive(Debug, Clone)]
pub struct NewReview {
    pub user_id: i64,
    pub plan_id: i64,
    pub rating: i16,
    pub body: String,
}

// --- Request Payloads (Input Schemas) ---

/// RegisterRequest
///
/// Input payload for `POST /auth/register`. The password is hashed immediately and
/// never logged.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RegisterRequest {
    #[schema(example = "athlete@example.com")]
    pub email: String,
    pub password: String,
    pub display_name: String,
}

/// LoginRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// CreatePlanRequest
///
/// Input payload for `POST /plans`. `cover_image_key` is the resource key returned by
/// the presigned upload flow.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreatePlanRequest {
    pub title: String,
    pub description: String,
    pub price_cents: i64,
    pub weeks: i32,
    pub cover_image_key: Option<String>,
}

/// PurchaseRequest
///
/// Sent by the checkout completion flow once the billing provider confirms payment.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PurchaseRequest {
    #[schema(example = "cs_test_a1b2c3")]
    pub external_order_id: String,
}

/// CompletionRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CompletionRequest {
    pub week_id: i32,
    pub day_id: i32,
}

/// CreateReviewRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateReviewRequest {
    pub rating: i16,
    pub body: String,
}

/// PresignedUrlRequest
///
/// Input payload for requesting a short-lived cover image upload URL.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct PresignedUrlRequest {
    /// The original filename, used to derive the object key extension.
    #[schema(example = "cover.jpg")]
    pub filename: String,
    /// The MIME type the upload is constrained to.
    #[schema(example = "image/jpeg")]
    pub file_type: String,
}

/// PresignedUrlResponse
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct PresignedUrlResponse {
    /// The time-limited URL for the PUT request.
    pub upload_url: String,
    /// The object key to pass back as `cover_image_key` when creating the plan.
    pub resource_key: String,
}

// --- Dashboard & Profile Schemas (Output) ---

/// AdminDashboardStats
///
/// Output schema for `GET /admin/stats`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct AdminDashboardStats {
    pub total_users: i64,
    pub total_plans: i64,
    pub total_purchases: i64,
    pub total_completions: i64,
    /// Sum of all purchase amounts, in cents.
    pub revenue_cents: i64,
}

/// UserProfile
///
/// Output schema for `GET /me` and the register/login responses.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserProfile {
    pub id: i64,
    pub email: String,
    pub display_name: String,
    pub is_admin: bool,
    pub is_creator: bool,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            display_name: user.display_name,
            is_admin: user.is_admin,
            is_creator: user.is_creator,
        }
    }
}
