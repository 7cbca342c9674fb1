//! PostgreSQL group repository implementation

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{count_active_regular, lock_user, GROUP_COLUMNS};
use crate::error::{DbError, DbResult};
use crate::models::GroupRow;
use crate::repo::{CreateGroup, CreateGroupOutcome, GroupRepository};

/// PostgreSQL group repository
#[derive(Clone)]
pub struct PgGroupRepository {
    pool: PgPool,
}

impl PgGroupRepository {
    /// Create a new group repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GroupRepository for PgGroupRepository {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<GroupRow>> {
        let sql = format!("SELECT {GROUP_COLUMNS} FROM groups g WHERE g.id = $1");
        let group = sqlx::query_as::<_, GroupRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(group)
    }

    async fn find_by_invite_code(&self, code: &str) -> DbResult<Option<GroupRow>> {
        let sql = format!("SELECT {GROUP_COLUMNS} FROM groups g WHERE g.invite_code = $1");
        let group = sqlx::query_as::<_, GroupRow>(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        Ok(group)
    }

    async fn public_name_taken(&self, name: &str) -> DbResult<bool> {
        let taken = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM groups
                WHERE visibility = 'public' AND LOWER(name) = LOWER($1)
            )
            "#,
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(taken)
    }

    async fn create_with_creator(
        &self,
        group: CreateGroup,
        max_regular_groups: Option<i64>,
    ) -> DbResult<CreateGroupOutcome> {
        let mut tx = self.pool.begin().await?;

        if let Some(max) = max_regular_groups {
            lock_user(&mut *tx, group.creator_id).await?;
            let current_count = count_active_regular(&mut *tx, group.creator_id).await?;
            if current_count >= max {
                return Ok(CreateGroupOutcome::LimitReached { current_count });
            }
        }

        let (start, end, status, template) = match &group.challenge {
            Some(c) => (
                Some(c.start_date),
                Some(c.end_date),
                Some(c.status.as_str()),
                c.template_id.as_deref(),
            ),
            None => (None, None, None, None),
        };

        let row = sqlx::query_as::<_, GroupRow>(
            r#"
            INSERT INTO groups (id, name, description, creator_id, visibility, invite_code,
                                is_challenge, challenge_start_date, challenge_end_date,
                                challenge_status, challenge_template_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id, name, description, creator_id, visibility, invite_code, is_challenge,
                      challenge_start_date, challenge_end_date, challenge_status,
                      challenge_template_id, created_at
            "#,
        )
        .bind(group.id)
        .bind(&group.name)
        .bind(&group.description)
        .bind(group.creator_id)
        .bind(&group.visibility)
        .bind(&group.invite_code)
        .bind(group.challenge.is_some())
        .bind(start)
        .bind(end)
        .bind(status)
        .bind(template)
        .fetch_one(&mut *tx)
        .await
        .map_err(DbError::from_insert)?;

        sqlx::query(
            r#"
            INSERT INTO memberships (group_id, user_id, role, status)
            VALUES ($1, $2, 'creator', 'active')
            "#,
        )
        .bind(row.id)
        .bind(group.creator_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(CreateGroupOutcome::Created(row))
    }

    async fn list_open_challenges(&self) -> DbResult<Vec<GroupRow>> {
        let sql = format!(
            "SELECT {GROUP_COLUMNS} FROM groups g \
             WHERE g.is_challenge AND g.challenge_status IN ('upcoming', 'active') \
             ORDER BY g.challenge_start_date"
        );
        let groups = sqlx::query_as::<_, GroupRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(groups)
    }

    async fn list_challenges_for_user(&self, user_id: Uuid) -> DbResult<Vec<GroupRow>> {
        let sql = format!(
            "SELECT {GROUP_COLUMNS} FROM groups g \
             JOIN memberships m ON m.group_id = g.id \
             WHERE m.user_id = $1 AND m.status = 'active' AND g.is_challenge \
             ORDER BY g.challenge_start_date DESC"
        );
        let groups = sqlx::query_as::<_, GroupRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(groups)
    }

    async fn transition_challenge(&self, id: Uuid, from: &str, to: &str) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE groups SET challenge_status = $3
            WHERE id = $1 AND is_challenge AND challenge_status = $2
            "#,
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn cancel_challenge(&self, id: Uuid) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE groups SET challenge_status = 'cancelled'
            WHERE id = $1 AND is_challenge AND challenge_status IN ('upcoming', 'active')
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_with_active_members(&self) -> DbResult<Vec<GroupRow>> {
        let sql = format!(
            "SELECT {GROUP_COLUMNS} FROM groups g \
             WHERE EXISTS (SELECT 1 FROM memberships m \
                           WHERE m.group_id = g.id AND m.status = 'active') \
             ORDER BY g.created_at"
        );
        let groups = sqlx::query_as::<_, GroupRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(groups)
    }
}
