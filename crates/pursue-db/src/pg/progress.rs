//! PostgreSQL progress repository implementation

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbResult;
use crate::models::{DailyParticipationRow, ProgressEntryRow};
use crate::repo::{CreateProgressEntry, ProgressRepository};

/// PostgreSQL progress repository
#[derive(Clone)]
pub struct PgProgressRepository {
    pool: PgPool,
}

impl PgProgressRepository {
    /// Create a new progress repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProgressRepository for PgProgressRepository {
    async fn create(&self, entry: CreateProgressEntry) -> DbResult<ProgressEntryRow> {
        let row = sqlx::query_as::<_, ProgressEntryRow>(
            r#"
            INSERT INTO progress_entries (id, goal_id, user_id, value, note, entry_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, goal_id, user_id, value, note, entry_date, created_at
            "#,
        )
        .bind(entry.id)
        .bind(entry.goal_id)
        .bind(entry.user_id)
        .bind(entry.value)
        .bind(&entry.note)
        .bind(entry.entry_date)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn daily_participation(
        &self,
        group_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DbResult<Vec<DailyParticipationRow>> {
        let rows = sqlx::query_as::<_, DailyParticipationRow>(
            r#"
            SELECT p.entry_date, COUNT(DISTINCT p.user_id) AS loggers
            FROM progress_entries p
            JOIN goals g ON g.id = p.goal_id
            WHERE g.group_id = $1 AND p.entry_date BETWEEN $2 AND $3
            GROUP BY p.entry_date
            ORDER BY p.entry_date
            "#,
        )
        .bind(group_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn count_for_group(
        &self,
        group_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DbResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM progress_entries p
            JOIN goals g ON g.id = p.goal_id
            WHERE g.group_id = $1 AND p.entry_date BETWEEN $2 AND $3
            "#,
        )
        .bind(group_id)
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn count_distinct_loggers(
        &self,
        group_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DbResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(DISTINCT p.user_id)
            FROM progress_entries p
            JOIN goals g ON g.id = p.goal_id
            WHERE g.group_id = $1 AND p.entry_date BETWEEN $2 AND $3
            "#,
        )
        .bind(group_id)
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn count_for_member(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DbResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM progress_entries p
            JOIN goals g ON g.id = p.goal_id
            WHERE g.group_id = $1 AND p.user_id = $2 AND p.entry_date BETWEEN $3 AND $4
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}
