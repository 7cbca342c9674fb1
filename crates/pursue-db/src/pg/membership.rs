//! PostgreSQL membership repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::{count_active_regular, lock_user, GROUP_COLUMNS, MEMBERSHIP_COLUMNS};
use crate::error::DbResult;
use crate::models::{MemberGroupRow, MemberTierRow, MembershipRow};
use crate::repo::{
    ActivateOutcome, CreateMembership, JoinOutcome, MembershipRepository, ResolveOutcome,
};

/// PostgreSQL membership repository
#[derive(Clone)]
pub struct PgMembershipRepository {
    pool: PgPool,
}

impl PgMembershipRepository {
    /// Create a new membership repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn find_for_update(
    conn: &mut PgConnection,
    group_id: Uuid,
    user_id: Uuid,
) -> DbResult<Option<MembershipRow>> {
    let sql = format!(
        "SELECT {MEMBERSHIP_COLUMNS} FROM memberships m \
         WHERE m.group_id = $1 AND m.user_id = $2 FOR UPDATE"
    );
    let row = sqlx::query_as::<_, MembershipRow>(&sql)
        .bind(group_id)
        .bind(user_id)
        .fetch_optional(conn)
        .await?;

    Ok(row)
}

async fn member_groups(conn: &mut PgConnection, user_id: Uuid) -> DbResult<Vec<MemberGroupRow>> {
    let sql = format!(
        "SELECT {GROUP_COLUMNS}, m.role, m.status, m.read_only, m.joined_at \
         FROM memberships m JOIN groups g ON g.id = m.group_id \
         WHERE m.user_id = $1 \
         ORDER BY m.joined_at"
    );
    let rows = sqlx::query_as::<_, MemberGroupRow>(&sql)
        .bind(user_id)
        .fetch_all(conn)
        .await?;

    Ok(rows)
}

#[async_trait]
impl MembershipRepository for PgMembershipRepository {
    async fn find(&self, group_id: Uuid, user_id: Uuid) -> DbResult<Option<MembershipRow>> {
        let sql = format!(
            "SELECT {MEMBERSHIP_COLUMNS} FROM memberships m \
             WHERE m.group_id = $1 AND m.user_id = $2"
        );
        let row = sqlx::query_as::<_, MembershipRow>(&sql)
            .bind(group_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn list_for_user(&self, user_id: Uuid) -> DbResult<Vec<MemberGroupRow>> {
        let mut conn = self.pool.acquire().await?;
        member_groups(&mut conn, user_id).await
    }

    async fn list_for_group(&self, group_id: Uuid) -> DbResult<Vec<MembershipRow>> {
        let sql = format!(
            "SELECT {MEMBERSHIP_COLUMNS} FROM memberships m \
             WHERE m.group_id = $1 ORDER BY m.joined_at"
        );
        let rows = sqlx::query_as::<_, MembershipRow>(&sql)
            .bind(group_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn list_active_members(&self, group_id: Uuid) -> DbResult<Vec<MemberTierRow>> {
        let rows = sqlx::query_as::<_, MemberTierRow>(
            r#"
            SELECT u.id AS user_id, u.display_name, u.current_subscription_tier
            FROM memberships m
            JOIN users u ON u.id = m.user_id
            WHERE m.group_id = $1 AND m.status = 'active'
            ORDER BY m.joined_at
            "#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn count_active_regular(&self, user_id: Uuid) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        count_active_regular(&mut conn, user_id).await
    }

    async fn join_within_limit(
        &self,
        membership: CreateMembership,
        max_regular_groups: Option<i64>,
    ) -> DbResult<JoinOutcome> {
        let mut tx = self.pool.begin().await?;

        if max_regular_groups.is_some() {
            lock_user(&mut *tx, membership.user_id).await?;
        }

        if let Some(existing) =
            find_for_update(&mut *tx, membership.group_id, membership.user_id).await?
        {
            return Ok(JoinOutcome::AlreadyMember(existing));
        }

        if let Some(max) = max_regular_groups {
            let current_count = count_active_regular(&mut *tx, membership.user_id).await?;
            if current_count >= max {
                return Ok(JoinOutcome::LimitReached { current_count });
            }
        }

        let sql = format!(
            "INSERT INTO memberships AS m (group_id, user_id, role, status) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (group_id, user_id) DO NOTHING \
             RETURNING {MEMBERSHIP_COLUMNS}"
        );
        let inserted = sqlx::query_as::<_, MembershipRow>(&sql)
            .bind(membership.group_id)
            .bind(membership.user_id)
            .bind(&membership.role)
            .bind(&membership.status)
            .fetch_optional(&mut *tx)
            .await?;

        let outcome = match inserted {
            Some(row) => JoinOutcome::Joined(row),
            None => {
                // Lost a race with a concurrent join of the same pair
                tracing::debug!(
                    group_id = %membership.group_id,
                    user_id = %membership.user_id,
                    "membership insert lost to a concurrent join"
                );
                let existing = find_for_update(&mut *tx, membership.group_id, membership.user_id)
                    .await?
                    .ok_or(crate::DbError::NotFound)?;
                JoinOutcome::AlreadyMember(existing)
            }
        };

        tx.commit().await?;
        Ok(outcome)
    }

    async fn activate_within_limit(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        max_regular_groups: Option<i64>,
    ) -> DbResult<ActivateOutcome> {
        let mut tx = self.pool.begin().await?;

        if max_regular_groups.is_some() {
            lock_user(&mut *tx, user_id).await?;
        }

        let Some(existing) = find_for_update(&mut *tx, group_id, user_id).await? else {
            return Ok(ActivateOutcome::NotFound);
        };
        if existing.is_active() {
            return Ok(ActivateOutcome::AlreadyActive(existing));
        }

        if let Some(max) = max_regular_groups {
            let current_count = count_active_regular(&mut *tx, user_id).await?;
            if current_count >= max {
                return Ok(ActivateOutcome::LimitReached { current_count });
            }
        }

        let sql = format!(
            "UPDATE memberships AS m SET status = 'active' \
             WHERE m.group_id = $1 AND m.user_id = $2 \
             RETURNING {MEMBERSHIP_COLUMNS}"
        );
        let row = sqlx::query_as::<_, MembershipRow>(&sql)
            .bind(group_id)
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(ActivateOutcome::Activated(row))
    }

    async fn delete(&self, group_id: Uuid, user_id: Uuid) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM memberships WHERE group_id = $1 AND user_id = $2")
            .bind(group_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn clear_read_only(&self, user_id: Uuid) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE memberships SET read_only = FALSE, read_only_since = NULL
            WHERE user_id = $1 AND read_only
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn resolve_over_limit(
        &self,
        user_id: Uuid,
        keep_group_id: Uuid,
        now: DateTime<Utc>,
    ) -> DbResult<ResolveOutcome> {
        let mut tx = self.pool.begin().await?;

        let status = lock_user(&mut *tx, user_id).await?;
        if status != "over_limit" {
            return Ok(ResolveOutcome::NotOverLimit);
        }

        let regular: Vec<MemberGroupRow> = member_groups(&mut *tx, user_id)
            .await?
            .into_iter()
            .filter(MemberGroupRow::counts_toward_limit)
            .collect();

        let Some(kept) = regular.iter().find(|m| m.group.id == keep_group_id).cloned() else {
            return Ok(ResolveOutcome::InvalidSelection);
        };

        sqlx::query(
            r#"
            UPDATE memberships SET read_only = FALSE, read_only_since = NULL
            WHERE group_id = $1 AND user_id = $2
            "#,
        )
        .bind(keep_group_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE memberships AS m
            SET read_only = TRUE, read_only_since = COALESCE(m.read_only_since, $3)
            FROM groups g
            WHERE g.id = m.group_id
              AND m.user_id = $1
              AND m.group_id <> $2
              AND m.status = 'active'
              AND NOT g.is_challenge
            "#,
        )
        .bind(user_id)
        .bind(keep_group_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE users
            SET subscription_status = 'active', downgrade_kept_group_id = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(keep_group_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let read_only = regular
            .into_iter()
            .filter(|m| m.group.id != keep_group_id)
            .map(|m| m.group)
            .collect();

        Ok(ResolveOutcome::Resolved {
            kept: kept.group,
            read_only,
        })
    }
}
