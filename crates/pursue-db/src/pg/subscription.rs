//! PostgreSQL subscription repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbResult;
use crate::models::SubscriptionRow;
use crate::repo::{CreateSubscription, SubscriptionRepository};

/// PostgreSQL subscription repository
#[derive(Clone)]
pub struct PgSubscriptionRepository {
    pool: PgPool,
}

impl PgSubscriptionRepository {
    /// Create a new subscription repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionRepository for PgSubscriptionRepository {
    async fn find_current_by_user_id(&self, user_id: Uuid) -> DbResult<Option<SubscriptionRow>> {
        let sub = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            SELECT id, user_id, tier, status, platform, product_id, expires_at,
                   auto_renew, created_at, updated_at
            FROM subscriptions
            WHERE user_id = $1 AND status <> 'expired'
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sub)
    }

    async fn create_replacing(&self, sub: CreateSubscription) -> DbResult<SubscriptionRow> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE subscriptions
            SET status = 'expired', auto_renew = FALSE, updated_at = NOW()
            WHERE user_id = $1 AND status <> 'expired'
            "#,
        )
        .bind(sub.user_id)
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            INSERT INTO subscriptions (id, user_id, tier, platform, product_id, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, tier, status, platform, product_id, expires_at,
                      auto_renew, created_at, updated_at
            "#,
        )
        .bind(sub.id)
        .bind(sub.user_id)
        .bind(&sub.tier)
        .bind(&sub.platform)
        .bind(&sub.product_id)
        .bind(sub.expires_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row)
    }

    async fn cancel(&self, id: Uuid) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE subscriptions
            SET status = 'cancelled', auto_renew = FALSE, updated_at = NOW()
            WHERE id = $1 AND status = 'active'
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn expire_lapsed(&self, now: DateTime<Utc>) -> DbResult<Vec<Uuid>> {
        let mut user_ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE subscriptions
            SET status = 'expired', auto_renew = FALSE, updated_at = NOW()
            WHERE status <> 'expired' AND expires_at <= $1
            RETURNING user_id
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        user_ids.sort_unstable();
        user_ids.dedup();
        Ok(user_ids)
    }

    async fn expire_lapsed_for_user(&self, user_id: Uuid, now: DateTime<Utc>) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions
            SET status = 'expired', auto_renew = FALSE, updated_at = NOW()
            WHERE user_id = $1 AND status <> 'expired' AND expires_at <= $2
            "#,
        )
        .bind(user_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
