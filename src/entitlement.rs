//! Purchase-entitlement guard and the completion recorder built on it.
//!
//! Both functions take the repository as a parameter so they can be exercised against
//! an in-memory store without an HTTP layer.

use crate::{
    error::AppError,
    models::{Completion, Purchase},
    repository::{Repository, RepositoryError},
};

pub const NOT_OWNED: &str = "user does not own this plan";
pub const ALREADY_COMPLETED: &str = "already marked as completed";

/// ensure_purchased
///
/// Point-in-time lookup of the purchase for `(user_id, plan_id)`. Must be awaited
/// before any mutation that assumes ownership of the plan. Nothing is locked: a
/// purchase written after this check returns is simply seen by the next one.
pub async fn ensure_purchased(
    repo: &dyn Repository,
    user_id: i64,
    plan_id: i64,
) -> Result<Purchase, AppError> {
    match repo.get_purchase(user_id, plan_id).await? {
        Some(purchase) => Ok(purchase),
        None => {
            tracing::debug!(user_id, plan_id, "entitlement check failed");
            Err(AppError::Unauthorized(NOT_OWNED))
        }
    }
}

/// record_completion
///
/// Checks entitlement, then inserts the completion. A repeat of the same
/// `(user, plan, week, day)` is rejected with `Conflict` and the stored record is left
/// untouched.
pub async fn record_completion(
    repo: &dyn Repository,
    user_id: i64,
    plan_id: i64,
    week_id: i32,
    day_id: i32,
) -> Result<Completion, AppError> {
    ensure_purchased(repo, user_id, plan_id).await?;

    match repo
        .create_completion(user_id, plan_id, week_id, day_id)
        .await
    {
        Ok(completion) => {
            tracing::info!(user_id, plan_id, week_id, day_id, "completion recorded");
            Ok(completion)
        }
        Err(RepositoryError::Conflict) => Err(AppError::Conflict(ALREADY_COMPLETED)),
        Err(e) => Err(e.into()),
    }
}
