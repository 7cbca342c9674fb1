//! PostgreSQL activity and reaction repository implementation

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbResult;
use crate::models::{ActivityRow, ReactionRow};
use crate::repo::{ActivityRepository, CreateActivity};

/// PostgreSQL activity repository
#[derive(Clone)]
pub struct PgActivityRepository {
    pool: PgPool,
}

impl PgActivityRepository {
    /// Create a new activity repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActivityRepository for PgActivityRepository {
    async fn create(&self, activity: CreateActivity) -> DbResult<ActivityRow> {
        let row = sqlx::query_as::<_, ActivityRow>(
            r#"
            INSERT INTO activities (id, group_id, user_id, kind, payload)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, group_id, user_id, kind, payload, created_at
            "#,
        )
        .bind(activity.id)
        .bind(activity.group_id)
        .bind(activity.user_id)
        .bind(&activity.kind)
        .bind(&activity.payload)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<ActivityRow>> {
        let row = sqlx::query_as::<_, ActivityRow>(
            "SELECT id, group_id, user_id, kind, payload, created_at FROM activities WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn list_for_group(&self, group_id: Uuid, limit: i64) -> DbResult<Vec<ActivityRow>> {
        let rows = sqlx::query_as::<_, ActivityRow>(
            r#"
            SELECT id, group_id, user_id, kind, payload, created_at
            FROM activities
            WHERE group_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(group_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn upsert_reaction(
        &self,
        activity_id: Uuid,
        user_id: Uuid,
        emoji: &str,
    ) -> DbResult<bool> {
        let previous = sqlx::query_scalar::<_, Option<String>>(
            r#"
            WITH prev AS (
                SELECT emoji FROM reactions WHERE activity_id = $1 AND user_id = $2
            )
            INSERT INTO reactions (activity_id, user_id, emoji)
            VALUES ($1, $2, $3)
            ON CONFLICT (activity_id, user_id) DO UPDATE SET emoji = EXCLUDED.emoji
            RETURNING (SELECT emoji FROM prev)
            "#,
        )
        .bind(activity_id)
        .bind(user_id)
        .bind(emoji)
        .fetch_one(&self.pool)
        .await?;

        Ok(previous.is_some_and(|p| p != emoji))
    }

    async fn delete_reaction(&self, activity_id: Uuid, user_id: Uuid) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM reactions WHERE activity_id = $1 AND user_id = $2")
            .bind(activity_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_reactions(&self, activity_id: Uuid) -> DbResult<Vec<ReactionRow>> {
        let rows = sqlx::query_as::<_, ReactionRow>(
            r#"
            SELECT activity_id, user_id, emoji, created_at
            FROM reactions
            WHERE activity_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(activity_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
