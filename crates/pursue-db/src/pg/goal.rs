//! PostgreSQL goal repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::models::GoalRow;
use crate::repo::{CreateGoal, GoalRepository, UpdateGoal};

/// PostgreSQL goal repository
#[derive(Clone)]
pub struct PgGoalRepository {
    pool: PgPool,
}

impl PgGoalRepository {
    /// Create a new goal repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GoalRepository for PgGoalRepository {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<GoalRow>> {
        let goal = sqlx::query_as::<_, GoalRow>(
            r#"
            SELECT id, group_id, title, description, cadence, metric_type, target_value,
                   unit, active_days, created_by, created_at, archived_at
            FROM goals
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(goal)
    }

    async fn create(&self, goal: CreateGoal) -> DbResult<GoalRow> {
        let row = sqlx::query_as::<_, GoalRow>(
            r#"
            INSERT INTO goals (id, group_id, title, description, cadence, metric_type,
                               target_value, unit, active_days, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, group_id, title, description, cadence, metric_type, target_value,
                      unit, active_days, created_by, created_at, archived_at
            "#,
        )
        .bind(goal.id)
        .bind(goal.group_id)
        .bind(&goal.title)
        .bind(&goal.description)
        .bind(&goal.cadence)
        .bind(&goal.metric_type)
        .bind(goal.target_value)
        .bind(&goal.unit)
        .bind(&goal.active_days)
        .bind(goal.created_by)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn update(&self, id: Uuid, update: UpdateGoal) -> DbResult<GoalRow> {
        sqlx::query_as::<_, GoalRow>(
            r#"
            UPDATE goals
            SET title = $2, description = $3, target_value = $4, unit = $5, active_days = $6
            WHERE id = $1
            RETURNING id, group_id, title, description, cadence, metric_type, target_value,
                      unit, active_days, created_by, created_at, archived_at
            "#,
        )
        .bind(id)
        .bind(&update.title)
        .bind(&update.description)
        .bind(update.target_value)
        .bind(&update.unit)
        .bind(&update.active_days)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DbError::NotFound)
    }

    async fn archive(&self, id: Uuid, at: DateTime<Utc>) -> DbResult<()> {
        sqlx::query("UPDATE goals SET archived_at = $2 WHERE id = $1 AND archived_at IS NULL")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn list_for_group(&self, group_id: Uuid) -> DbResult<Vec<GoalRow>> {
        let goals = sqlx::query_as::<_, GoalRow>(
            r#"
            SELECT id, group_id, title, description, cadence, metric_type, target_value,
                   unit, active_days, created_by, created_at, archived_at
            FROM goals
            WHERE group_id = $1 AND archived_at IS NULL
            ORDER BY created_at
            "#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(goals)
    }
}
