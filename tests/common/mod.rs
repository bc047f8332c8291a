#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Arc, Mutex};
use trainwithx_api::{
    AppConfig, AppState, MockStorageService,
    models::{
        AdminDashboardStats, Completion, CreatePlanRequest, NewPurchase, NewReview, NewUser, Plan,
        Purchase, Review, User,
    },
    repository::{Repository, RepositoryError},
};

// --- In-Memory Repository ---

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    plans: Vec<Plan>,
    purchases: Vec<Purchase>,
    completions: Vec<Completion>,
    reviews: Vec<Review>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// FakeRepository
///
/// Enforces the same uniqueness keys as the Postgres schema, so "first writer wins"
/// can be tested without a database.
#[derive(Default)]
pub struct FakeRepository {
    tables: Mutex<Tables>,
}

impl FakeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a user with explicit flags, bypassing the register flow.
    pub fn insert_user(&self, id: i64, email: &str, is_admin: bool, is_creator: bool) -> User {
        let user = User {
            id,
            email: email.to_string(),
            password_hash: String::new(),
            display_name: email.split('@').next().unwrap_or_default().to_string(),
            is_admin,
            is_creator,
            created_at: Utc::now(),
        };
        let mut tables = self.tables.lock().unwrap();
        tables.next_id = tables.next_id.max(id);
        tables.users.push(user.clone());
        user
    }

    pub fn insert_plan(&self, id: i64, creator_id: i64, price_cents: i64, weeks: i32) -> Plan {
        let plan = Plan {
            id,
            creator_id,
            title: format!("Plan {id}"),
            description: String::new(),
            price_cents,
            weeks,
            cover_image: None,
            created_at: Utc::now(),
        };
        let mut tables = self.tables.lock().unwrap();
        tables.next_id = tables.next_id.max(id);
        tables.plans.push(plan.clone());
        plan
    }

    pub fn completion_count(&self) -> usize {
        self.tables.lock().unwrap().completions.len()
    }
}

#[async_trait]
impl Repository for FakeRepository {
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut tables = self.tables.lock().unwrap();
        if tables.users.iter().any(|u| u.email == user.email) {
            return Err(RepositoryError::Conflict);
        }
        let created = User {
            id: tables.next_id(),
            email: user.email,
            password_hash: user.password_hash,
            display_name: user.display_name,
            is_admin: false,
            is_creator: false,
            created_at: Utc::now(),
        };
        tables.users.push(created.clone());
        Ok(created)
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>, RepositoryError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, RepositoryError> {
        Ok(self.tables.lock().unwrap().users.clone())
    }

    async fn create_plan(
        &self,
        creator_id: i64,
        req: CreatePlanRequest,
    ) -> Result<Plan, RepositoryError> {
        let mut tables = self.tables.lock().unwrap();
        let plan = Plan {
            id: tables.next_id(),
            creator_id,
            title: req.title,
            description: req.description,
            price_cents: req.price_cents,
            weeks: req.weeks,
            cover_image: req.cover_image_key,
            created_at: Utc::now(),
        };
        tables.plans.push(plan.clone());
        Ok(plan)
    }

    async fn get_plan(&self, id: i64) -> Result<Option<Plan>, RepositoryError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.plans.iter().find(|p| p.id == id).cloned())
    }

    async fn list_plans(&self) -> Result<Vec<Plan>, RepositoryError> {
        Ok(self.tables.lock().unwrap().plans.clone())
    }

    async fn create_purchase(&self, purchase: NewPurchase) -> Result<Purchase, RepositoryError> {
        let mut tables = self.tables.lock().unwrap();
        if tables
            .purchases
            .iter()
            .any(|p| p.user_id == purchase.user_id && p.plan_id == purchase.plan_id)
        {
            return Err(RepositoryError::Conflict);
        }
        let created = Purchase {
            user_id: purchase.user_id,
            plan_id: purchase.plan_id,
            amount: purchase.amount,
            external_order_id: purchase.external_order_id,
            purchased_at: Utc::now(),
        };
        tables.purchases.push(created.clone());
        Ok(created)
    }

    async fn get_purchase(
        &self,
        user_id: i64,
        plan_id: i64,
    ) -> Result<Option<Purchase>, RepositoryError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .purchases
            .iter()
            .find(|p| p.user_id == user_id && p.plan_id == plan_id)
            .cloned())
    }

    async fn list_purchases_for_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<Purchase>, RepositoryError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .purchases
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_purchases(&self) -> Result<Vec<Purchase>, RepositoryError> {
        Ok(self.tables.lock().unwrap().purchases.clone())
    }

    async fn create_completion(
        &self,
        user_id: i64,
        plan_id: i64,
        week_id: i32,
        day_id: i32,
    ) -> Result<Completion, RepositoryError> {
        let mut tables = self.tables.lock().unwrap();
        if tables.completions.iter().any(|c| {
            c.user_id == user_id && c.plan_id == plan_id && c.week_id == week_id && c.day_id == day_id
        }) {
            return Err(RepositoryError::Conflict);
        }
        let created = Completion {
            user_id,
            plan_id,
            week_id,
            day_id,
            completed_at: Utc::now(),
        };
        tables.completions.push(created.clone());
        Ok(created)
    }

    async fn list_completions(
        &self,
        user_id: i64,
        plan_id: i64,
    ) -> Result<Vec<Completion>, RepositoryError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .completions
            .iter()
            .filter(|c| c.user_id == user_id && c.plan_id == plan_id)
            .cloned()
            .collect())
    }

    async fn create_review(&self, review: NewReview) -> Result<Review, RepositoryError> {
        let mut tables = self.tables.lock().unwrap();
        if tables
            .reviews
            .iter()
            .any(|r| r.user_id == review.user_id && r.plan_id == review.plan_id)
        {
            return Err(RepositoryError::Conflict);
        }
        let created = Review {
            id: tables.next_id(),
            user_id: review.user_id,
            plan_id: review.plan_id,
            rating: review.rating,
            body: review.body,
            created_at: Utc::now(),
        };
        tables.reviews.push(created.clone());
        Ok(created)
    }

    async fn list_reviews(&self, plan_id: i64) -> Result<Vec<Review>, RepositoryError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .reviews
            .iter()
            .filter(|r| r.plan_id == plan_id)
            .cloned()
            .collect())
    }

    async fn get_stats(&self) -> Result<AdminDashboardStats, RepositoryError> {
        let tables = self.tables.lock().unwrap();
        Ok(AdminDashboardStats {
            total_users: tables.users.len() as i64,
            total_plans: tables.plans.len() as i64,
            total_purchases: tables.purchases.len() as i64,
            total_completions: tables.completions.len() as i64,
            revenue_cents: tables.purchases.iter().map(|p| p.amount).sum(),
        })
    }
}

// --- State Helpers ---

pub const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";

pub fn test_config() -> AppConfig {
    AppConfig {
        jwt_secret: TEST_JWT_SECRET.to_string(),
        ..AppConfig::default()
    }
}

pub fn test_state(repo: Arc<FakeRepository>) -> AppState {
    AppState::new(repo, Arc::new(MockStorageService::new()), test_config())
}

pub fn test_state_with_storage(repo: Arc<FakeRepository>, storage: MockStorageService) -> AppState {
    AppState::new(repo, Arc::new(storage), test_config())
}

/// `Cookie` header value carrying `token` as the session credential.
pub fn cookie_header(token: &str) -> String {
    format!("access_token={token}")
}
