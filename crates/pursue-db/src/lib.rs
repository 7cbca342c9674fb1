//! Pursue DB - Persistence layer
//!
//! SQLx-based PostgreSQL repositories plus an in-memory implementation of
//! the same traits for tests and local runs.
//!
//! # Example
//!
//! ```rust,ignore
//! use pursue_db::{create_pool, run_migrations, Repositories};
//!
//! let pool = create_pool("postgres://localhost/pursue").await?;
//! run_migrations(&pool).await?;
//! let repos = Repositories::postgres(pool);
//!
//! let user = repos.users.find_by_id(user_id).await?;
//! ```

use std::sync::Arc;

pub mod error;
pub mod memory;
pub mod models;
pub mod pg;
pub mod pool;
pub mod repo;

pub use error::{DbError, DbResult};
pub use memory::MemoryStore;
pub use models::*;
pub use pool::{create_pool, create_pool_with_options, run_migrations, DbPool, PoolOptions};
pub use repo::*;

use pg::{
    PgActivityRepository, PgGoalRepository, PgGroupRepository, PgHealthCheck,
    PgMembershipRepository, PgProgressRepository, PgShareCardRepository,
    PgSubscriptionRepository, PgUserRepository,
};

/// All repositories bundled together
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub groups: Arc<dyn GroupRepository>,
    pub memberships: Arc<dyn MembershipRepository>,
    pub goals: Arc<dyn GoalRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub activities: Arc<dyn ActivityRepository>,
    pub share_cards: Arc<dyn ShareCardRepository>,
    pub health: Arc<dyn HealthCheck>,
}

impl Repositories {
    /// Create all repositories from a database pool
    pub fn postgres(pool: DbPool) -> Self {
        Self {
            users: Arc::new(PgUserRepository::new(pool.clone())),
            subscriptions: Arc::new(PgSubscriptionRepository::new(pool.clone())),
            groups: Arc::new(PgGroupRepository::new(pool.clone())),
            memberships: Arc::new(PgMembershipRepository::new(pool.clone())),
            goals: Arc::new(PgGoalRepository::new(pool.clone())),
            progress: Arc::new(PgProgressRepository::new(pool.clone())),
            activities: Arc::new(PgActivityRepository::new(pool.clone())),
            share_cards: Arc::new(PgShareCardRepository::new(pool.clone())),
            health: Arc::new(PgHealthCheck::new(pool)),
        }
    }

    /// Back every repository with one shared in-memory store
    pub fn in_memory(store: MemoryStore) -> Self {
        Self {
            users: Arc::new(store.clone()),
            subscriptions: Arc::new(store.clone()),
            groups: Arc::new(store.clone()),
            memberships: Arc::new(store.clone()),
            goals: Arc::new(store.clone()),
            progress: Arc::new(store.clone()),
            activities: Arc::new(store.clone()),
            share_cards: Arc::new(store.clone()),
            health: Arc::new(store),
        }
    }
}

impl std::fmt::Debug for Repositories {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repositories").finish_non_exhaustive()
    }
}
