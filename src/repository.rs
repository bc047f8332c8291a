use crate::models::{
    AdminDashboardStats, Completion, CreatePlanRequest, NewPurchase, NewReview, NewUser, Plan,
    Purchase, Review, User,
};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;

/// RepositoryError
///
/// Persistence failures. A uniqueness violation is its own variant so callers can turn
/// "first writer wins" into a domain-specific Conflict.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("unique constraint violated")]
    Conflict,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Maps a unique-violation from Postgres onto `RepositoryError::Conflict`.
fn map_insert_error(err: sqlx::Error) -> RepositoryError {
    match err {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            RepositoryError::Conflict
        }
        other => RepositoryError::Database(other),
    }
}

/// Repository Trait
///
/// The persistence contract the handlers and the entitlement layer depend on. Tests
/// substitute an in-memory implementation that enforces the same uniqueness keys.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Accounts ---
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError>;
    async fn get_user(&self, id: i64) -> Result<Option<User>, RepositoryError>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;
    async fn list_users(&self) -> Result<Vec<User>, RepositoryError>;

    // --- Plans ---
    async fn create_plan(
        &self,
        creator_id: i64,
        req: CreatePlanRequest,
    ) -> Result<Plan, RepositoryError>;
    async fn get_plan(&self, id: i64) -> Result<Option<Plan>, RepositoryError>;
    async fn list_plans(&self) -> Result<Vec<Plan>, RepositoryError>;

    // --- Purchases (unique per user/plan) ---
    async fn create_purchase(&self, purchase: NewPurchase) -> Result<Purchase, RepositoryError>;
    async fn get_purchase(
        &self,
        user_id: i64,
        plan_id: i64,
    ) -> Result<Option<Purchase>, RepositoryError>;
    async fn list_purchases_for_user(&self, user_id: i64)
    -> Result<Vec<Purchase>, RepositoryError>;
    async fn list_purchases(&self) -> Result<Vec<Purchase>, RepositoryError>;

    // --- Completions (unique per user/plan/week/day) ---
    async fn create_completion(
        &self,
        user_id: i64,
        plan_id: i64,
        week_id: i32,
        day_id: i32,
    ) -> Result<Completion, RepositoryError>;
    async fn list_completions(
        &self,
        user_id: i64,
        plan_id: i64,
    ) -> Result<Vec<Completion>, RepositoryError>;

    // --- Reviews (unique per user/plan) ---
    async fn create_review(&self, review: NewReview) -> Result<Review, RepositoryError>;
    async fn list_reviews(&self, plan_id: i64) -> Result<Vec<Review>, RepositoryError>;

    // --- Admin ---
    async fn get_stats(&self) -> Result<AdminDashboardStats, RepositoryError>;
}

/// RepositoryState
///
/// The shared handle to the persistence layer stored in `AppState`.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// `Repository` backed by PostgreSQL. Uniqueness is enforced by the primary keys and
/// unique constraints declared in `migrations/`.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str =
    "id, email, password_hash, display_name, is_admin, is_creator, created_at";
const PLAN_COLUMNS: &str =
    "id, creator_id, title, description, price_cents, weeks, cover_image, created_at";

#[async_trait]
impl Repository for PostgresRepository {
    /// create_user
    ///
    /// New accounts are never admins or creators; those flags are granted out of band.
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (email, password_hash, display_name) VALUES ($1, $2, $3) RETURNING {USER_COLUMNS}"
        ))
        .bind(user.email)
        .bind(user.password_hash)
        .bind(user.display_name)
        .fetch_one(&self.pool)
        .await
        .map_err(map_insert_error)
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// get_user_by_email
    ///
    /// Emails are stored lower-cased by the register handler, so this is an exact match.
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn list_users(&self) -> Result<Vec<User>, RepositoryError> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn create_plan(
        &self,
        creator_id: i64,
        req: CreatePlanRequest,
    ) -> Result<Plan, RepositoryError> {
        sqlx::query_as::<_, Plan>(&format!(
            r#"INSERT INTO plans (creator_id, title, description, price_cents, weeks, cover_image)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING {PLAN_COLUMNS}"#
        ))
        .bind(creator_id)
        .bind(req.title)
        .bind(req.description)
        .bind(req.price_cents)
        .bind(req.weeks)
        .bind(req.cover_image_key)
        .fetch_one(&self.pool)
        .await
        .map_err(map_insert_error)
    }

    async fn get_plan(&self, id: i64) -> Result<Option<Plan>, RepositoryError> {
        let plan = sqlx::query_as::<_, Plan>(&format!(
            "SELECT {PLAN_COLUMNS} FROM plans WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(plan)
    }

    async fn list_plans(&self) -> Result<Vec<Plan>, RepositoryError> {
        let plans = sqlx::query_as::<_, Plan>(&format!(
            "SELECT {PLAN_COLUMNS} FROM plans ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(plans)
    }

    /// create_purchase
    ///
    /// A plain INSERT: the (user_id, plan_id) primary key arbitrates concurrent
    /// payment completions and the loser surfaces as `Conflict`.
    async fn create_purchase(&self, purchase: NewPurchase) -> Result<Purchase, RepositoryError> {
        sqlx::query_as::<_, Purchase>(
            r#"INSERT INTO purchases (user_id, plan_id, amount, external_order_id)
               VALUES ($1, $2, $3, $4)
               RETURNING user_id, plan_id, amount, external_order_id, purchased_at"#,
        )
        .bind(purchase.user_id)
        .bind(purchase.plan_id)
        .bind(purchase.amount)
        .bind(purchase.external_order_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_insert_error)
    }

    async fn get_purchase(
        &self,
        user_id: i64,
        plan_id: i64,
    ) -> Result<Option<Purchase>, RepositoryError> {
        let purchase = sqlx::query_as::<_, Purchase>(
            r#"SELECT user_id, plan_id, amount, external_order_id, purchased_at
               FROM purchases
               WHERE user_id = $1 AND plan_id = $2"#,
        )
        .bind(user_id)
        .bind(plan_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(purchase)
    }

    async fn list_purchases_for_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<Purchase>, RepositoryError> {
        let purchases = sqlx::query_as::<_, Purchase>(
            r#"SELECT user_id, plan_id, amount, external_order_id, purchased_at
               FROM purchases
               WHERE user_id = $1
               ORDER BY purchased_at DESC"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(purchases)
    }

    async fn list_purchases(&self) -> Result<Vec<Purchase>, RepositoryError> {
        let purchases = sqlx::query_as::<_, Purchase>(
            r#"SELECT user_id, plan_id, amount, external_order_id, purchased_at
               FROM purchases
               ORDER BY purchased_at DESC"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(purchases)
    }

    /// create_completion
    ///
    /// No `ON CONFLICT` clause on purpose: a repeated day must fail, not merge.
    async fn create_completion(
        &self,
        user_id: i64,
        plan_id: i64,
        week_id: i32,
        day_id: i32,
    ) -> Result<Completion, RepositoryError> {
        sqlx::query_as::<_, Completion>(
            r#"INSERT INTO completions (user_id, plan_id, week_id, day_id)
               VALUES ($1, $2, $3, $4)
               RETURNING user_id, plan_id, week_id, day_id, completed_at"#,
        )
        .bind(user_id)
        .bind(plan_id)
        .bind(week_id)
        .bind(day_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_insert_error)
    }

    async fn list_completions(
        &self,
        user_id: i64,
        plan_id: i64,
    ) -> Result<Vec<Completion>, RepositoryError> {
        let completions = sqlx::query_as::<_, Completion>(
            r#"SELECT user_id, plan_id, week_id, day_id, completed_at
               FROM completions
               WHERE user_id = $1 AND plan_id = $2
               ORDER BY week_id, day_id"#,
        )
        .bind(user_id)
        .bind(plan_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(completions)
    }

    async fn create_review(&self, review: NewReview) -> Result<Review, RepositoryError> {
        sqlx::query_as::<_, Review>(
            r#"INSERT INTO reviews (user_id, plan_id, rating, body)
               VALUES ($1, $2, $3, $4)
               RETURNING id, user_id, plan_id, rating, body, created_at"#,
        )
        .bind(review.user_id)
        .bind(review.plan_id)
        .bind(review.rating)
        .bind(review.body)
        .fetch_one(&self.pool)
        .await
        .map_err(map_insert_error)
    }

    async fn list_reviews(&self, plan_id: i64) -> Result<Vec<Review>, RepositoryError> {
        let reviews = sqlx::query_as::<_, Review>(
            r#"SELECT id, user_id, plan_id, rating, body, created_at
               FROM reviews
               WHERE plan_id = $1
               ORDER BY created_at DESC"#,
        )
        .bind(plan_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(reviews)
    }

    /// get_stats
    ///
    /// All dashboard counters in one round trip.
    async fn get_stats(&self) -> Result<AdminDashboardStats, RepositoryError> {
        let (total_users, total_plans, total_purchases, total_completions, revenue_cents) =
            sqlx::query_as::<_, (i64, i64, i64, i64, i64)>(
                r#"SELECT
                     (SELECT COUNT(*) FROM users),
                     (SELECT COUNT(*) FROM plans),
                     (SELECT COUNT(*) FROM purchases),
                     (SELECT COUNT(*) FROM completions),
                     (SELECT COALESCE(SUM(amount), 0)::BIGINT FROM purchases)"#,
            )
            .fetch_one(&self.pool)
            .await?;

        Ok(AdminDashboardStats {
            total_users,
            total_plans,
            total_purchases,
            total_completions,
            revenue_cents,
        })
    }
}
