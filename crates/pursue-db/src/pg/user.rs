//! PostgreSQL user repository implementation

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbResult;
use crate::models::UserRow;
use crate::repo::{CreateUser, SubscriptionState, UserRepository};

/// PostgreSQL user repository
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<UserRow>> {
        let user = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, display_name, current_subscription_tier, subscription_status,
                   group_limit, downgrade_kept_group_id, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn create(&self, user: CreateUser) -> DbResult<UserRow> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, display_name)
            VALUES ($1, $2)
            RETURNING id, display_name, current_subscription_tier, subscription_status,
                      group_limit, downgrade_kept_group_id, created_at, updated_at
            "#,
        )
        .bind(user.id)
        .bind(&user.display_name)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn update_subscription_state(
        &self,
        id: Uuid,
        expected: &SubscriptionState,
        new: &SubscriptionState,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET current_subscription_tier = $2,
                subscription_status = $3,
                group_limit = $4,
                downgrade_kept_group_id = $5,
                updated_at = NOW()
            WHERE id = $1
              AND current_subscription_tier = $6
              AND subscription_status = $7
              AND group_limit = $8
              AND downgrade_kept_group_id IS NOT DISTINCT FROM $9
            "#,
        )
        .bind(id)
        .bind(&new.tier)
        .bind(&new.status)
        .bind(new.group_limit)
        .bind(new.kept_group_id)
        .bind(&expected.tier)
        .bind(&expected.status)
        .bind(expected.group_limit)
        .bind(expected.kept_group_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
